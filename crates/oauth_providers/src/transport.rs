//! HTTP transport seam
//!
//! The adapter never talks to the network directly. Requests are handed to an
//! `HttpTransport`, which returns the raw status, reason phrase, content type
//! and body. `ReqwestTransport` is the production implementation;
//! `crate::mock::MockTransport` replays canned responses in tests.

use crate::models::{OAuthError, QueryParams};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Outgoing API request; VK methods are all called with GET
#[derive(Clone)]
pub struct ApiRequest {
    pub url: String,
    /// Token the request is made on behalf of; VK expects it in the query,
    /// so transports do not need to attach it again
    pub access_token: Option<String>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            access_token,
        }
    }
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("url", &redact_url(&self.url))
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Undecoded transport response
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Standard reason phrase for `status` (empty for unregistered codes);
    /// a custom phrase sent by the server is not preserved
    pub reason: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// `application/json` response with the given status
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            reason: reason_phrase(status).to_string(),
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: body.to_string().into_bytes(),
        }
    }

    /// Primary media type of the `Content-Type` header, parameters stripped
    pub fn media_type(&self) -> &str {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or_default()
    }

    /// Decode the body as JSON, falling back to a JSON string of the raw text
    pub fn decode_body(&self) -> Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform exactly one request/response round trip
    ///
    /// Non-2xx statuses are NOT errors at this level; only failures to obtain
    /// a response at all are.
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, OAuthError>;
}

/// Serialize parameters in order, RFC 3986 encoded, absent values omitted
pub fn build_query_string(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout_seconds: u64) -> Result<Self, OAuthError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| OAuthError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, timeout_seconds))
    }

    pub fn with_client(client: Client, timeout_seconds: u64) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, OAuthError> {
        debug!(url = %redact_url(&request.url), "Sending provider request");

        let response = self
            .client
            .get(&request.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| OAuthError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| OAuthError::Transport(e.without_url().to_string()))?
            .to_vec();

        debug!(status = status.as_u16(), "Provider responded");

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body,
        })
    }
}

/// Canonical reason phrase for a status code, empty when unknown
pub(crate) fn reason_phrase(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
}

/// URL safe for logs: the `access_token` query value is masked
pub(crate) fn redact_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return raw.split('?').next().unwrap_or_default().to_string();
    };

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "access_token" {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    if !pairs.is_empty() {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_query_string_order_and_encoding() {
        let params = QueryParams::new()
            .with("fields", "first_name,last_name")
            .with_opt("access_token", None)
            .with("q", "a b/c~")
            .with("v", "5.52");

        assert_eq!(
            build_query_string(&params),
            "fields=first_name%2Clast_name&q=a%20b%2Fc~&v=5.52"
        );
    }

    #[test]
    fn test_build_query_string_empty() {
        assert_eq!(build_query_string(&QueryParams::new()), "");
    }

    #[test]
    fn test_media_type_strips_parameters() {
        let response = RawResponse {
            status: 200,
            reason: "OK".to_string(),
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: vec![],
        };
        assert_eq!(response.media_type(), "application/json");

        let response = RawResponse {
            content_type: None,
            ..response
        };
        assert_eq!(response.media_type(), "");
    }

    #[test]
    fn test_decode_body_falls_back_to_text() {
        let response = RawResponse {
            status: 502,
            reason: "Bad Gateway".to_string(),
            content_type: Some("text/html".to_string()),
            body: b"<html>oops</html>".to_vec(),
        };
        assert_eq!(response.decode_body(), json!("<html>oops</html>"));

        let response = RawResponse::json(200, &json!({"response": []}));
        assert_eq!(response.decode_body(), json!({"response": []}));
        assert_eq!(response.reason, "OK");
    }

    #[test]
    fn test_reason_is_empty_for_unregistered_status() {
        let response = RawResponse::json(599, &json!({}));
        assert_eq!(response.reason, "");
        assert_eq!(RawResponse::json(404, &json!({})).reason, "Not Found");
    }

    #[test]
    fn test_redact_url_masks_token() {
        let redacted =
            redact_url("https://api.vk.com/method/users.get?fields=id&access_token=secret&v=5.52");

        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("access_token=***") || redacted.contains("access_token=%2A%2A%2A"));
        assert!(redacted.contains("v=5.52"));
    }

    #[test]
    fn test_api_request_debug_hides_token() {
        let request = ApiRequest::get(
            "https://api.vk.com/method/users.get?access_token=secret",
            Some("secret".to_string()),
        );
        assert!(!format!("{:?}", request).contains("secret"));
    }
}
