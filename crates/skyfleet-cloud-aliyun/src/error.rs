//! Alibaba Cloud client error types

use skyfleet_cloud::{Provider, QuoteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AliyunError {
    #[error("Alibaba Cloud credentials are not configured (ALICLOUD_ACCESS_KEY / ALICLOUD_SECRET_KEY)")]
    MissingCredentials,

    #[error("API error {code}: {message} (RequestId: {request_id})")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    #[error("No price returned for {0}")]
    NoPrice(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AliyunError>;

impl AliyunError {
    /// Map onto the quote error taxonomy
    pub fn to_quote_error(&self) -> QuoteError {
        match self {
            AliyunError::MissingCredentials => QuoteError::AuthMissing(Provider::Aliyun),
            AliyunError::NoPrice(pair) => QuoteError::NotFound(pair.clone()),
            AliyunError::Api { code, .. } => classify_code(code, self.to_string()),
            AliyunError::Http(_) | AliyunError::Json(_) => QuoteError::Transient(self.to_string()),
        }
    }
}

fn classify_code(code: &str, message: String) -> QuoteError {
    const AUTH: &[&str] = &[
        "InvalidAccessKeyId",
        "InvalidAccessKeySecret",
        "SignatureDoesNotMatch",
        "IncompleteSignature",
        "Forbidden",
    ];
    const TRANSIENT: &[&str] = &["Throttling", "ServiceUnavailable", "InternalError", "UnknownError"];

    if AUTH.iter().any(|c| code.starts_with(c)) {
        QuoteError::AuthMissing(Provider::Aliyun)
    } else if TRANSIENT.iter().any(|c| code.starts_with(c)) {
        QuoteError::Transient(message)
    } else if code.contains("NotFound")
        || code.contains("NotSupported")
        || code.starts_with("Invalid")
    {
        QuoteError::NotFound(message)
    } else {
        QuoteError::Transient(message)
    }
}
