//! ECS RPC-style API client
//!
//! Requests are signed with the RPC signature scheme: parameters are sorted
//! and percent-encoded (RFC 3986), the canonical query is wrapped as
//! `GET&%2F&<encoded query>` and signed with HMAC-SHA1 keyed by
//! `AccessKeySecret + "&"`.

use crate::error::{AliyunError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use ring::hmac;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use skyfleet_cloud::CredentialSet;
use std::collections::BTreeMap;
use std::time::Duration;

pub const ECS_ENDPOINT: &str = "https://ecs.aliyuncs.com";
pub const ECS_API_VERSION: &str = "2014-05-26";

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// RFC 3986 encoding as required by the signature scheme
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Canonical query string and its signature
pub fn sign_query(params: &BTreeMap<String, String>, access_key_secret: &str) -> (String, String) {
    let canonical = params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let string_to_sign = format!("GET&{}&{}", percent_encode("/"), percent_encode(&canonical));

    let key = hmac::Key::new(
        hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
        format!("{}&", access_key_secret).as_bytes(),
    );
    let tag = hmac::sign(&key, string_to_sign.as_bytes());
    (canonical, STANDARD.encode(tag.as_ref()))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "RequestId", default)]
    request_id: String,
}

/// Signed ECS API client
#[derive(Debug, Clone)]
pub struct EcsClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EcsClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: ECS_ENDPOINT.to_string(),
        })
    }

    /// Point at a different endpoint (regional endpoint or a test server)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn common_params(action: &str, credentials: &CredentialSet) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Action".to_string(), action.to_string()),
            ("Version".to_string(), ECS_API_VERSION.to_string()),
            ("Format".to_string(), "JSON".to_string()),
            ("AccessKeyId".to_string(), credentials.access_key.clone()),
            ("SignatureMethod".to_string(), "HMAC-SHA1".to_string()),
            ("SignatureVersion".to_string(), "1.0".to_string()),
            ("SignatureNonce".to_string(), uuid::Uuid::new_v4().to_string()),
            (
                "Timestamp".to_string(),
                Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
        ])
    }

    /// Call `action` and decode its JSON response
    pub async fn call<T: DeserializeOwned>(
        &self,
        credentials: &CredentialSet,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut query = Self::common_params(action, credentials);
        for (k, v) in params {
            query.insert(k.to_string(), v.to_string());
        }
        let (canonical, signature) = sign_query(&query, &credentials.secret_key);
        let url = format!(
            "{}/?{}&Signature={}",
            self.endpoint,
            canonical,
            percent_encode(&signature)
        );

        tracing::debug!(action = %action, endpoint = %self.endpoint, "Calling ECS API");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if let Ok(ApiErrorBody {
            code: Some(code),
            message,
            request_id,
        }) = serde_json::from_str::<ApiErrorBody>(&body)
        {
            return Err(AliyunError::Api {
                code,
                message,
                request_id,
            });
        }
        if !status.is_success() {
            return Err(AliyunError::Api {
                code: format!("Http{}", status.as_u16()),
                message: body,
                request_id: String::new(),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Region ids visible to this account
    pub async fn describe_regions(&self, credentials: &CredentialSet) -> Result<Vec<String>> {
        let response: DescribeRegionsResponse =
            self.call(credentials, "DescribeRegions", &[]).await?;
        Ok(response
            .regions
            .region
            .into_iter()
            .map(|r| r.region_id)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct DescribeRegionsResponse {
    #[serde(rename = "Regions")]
    regions: RegionList,
}

#[derive(Debug, Deserialize)]
struct RegionList {
    #[serde(rename = "Region", default)]
    region: Vec<RegionInfo>,
}

#[derive(Debug, Deserialize)]
struct RegionInfo {
    #[serde(rename = "RegionId")]
    region_id: String,
}
