//! Tencent Cloud provider error types

use skyfleet_cloud::{Provider, QuoteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TencentError {
    #[error("tccli not found. Please install: pip install tccli")]
    TccliNotFound,

    #[error("Tencent Cloud credentials are not configured (TENCENTCLOUD_SECRET_ID / TENCENTCLOUD_SECRET_KEY)")]
    MissingCredentials,

    #[error("tccli command failed: {0}")]
    CommandFailed(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TencentError>;

impl TencentError {
    pub fn to_quote_error(&self) -> QuoteError {
        match self {
            TencentError::TccliNotFound => QuoteError::Unsupported(self.to_string()),
            TencentError::MissingCredentials => QuoteError::AuthMissing(Provider::Tencent),
            TencentError::CommandFailed(stderr) if stderr.contains("AuthFailure") => {
                QuoteError::AuthMissing(Provider::Tencent)
            }
            TencentError::CommandFailed(stderr)
                if stderr.contains("InvalidParameterValue") || stderr.contains("InvalidRegion") =>
            {
                QuoteError::NotFound(stderr.clone())
            }
            _ => QuoteError::Transient(self.to_string()),
        }
    }
}
