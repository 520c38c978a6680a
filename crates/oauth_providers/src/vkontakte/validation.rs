//! Response classification for VK endpoints
//!
//! Checks run in a fixed order: HTTP status, then media type, then the
//! in-body `error` object. A response is accepted only when all three pass.

use crate::models::{non_empty, ProviderError};
use crate::transport::RawResponse;
use serde_json::Value;
use tracing::warn;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Accept or reject a decoded provider response
pub fn validate_response(response: &RawResponse, body: &Value) -> Result<(), ProviderError> {
    let status = response.status;

    let error = non_empty(body.get("error"));
    let error_code = error
        .and_then(|e| non_empty(e.get("error_code")))
        .and_then(Value::as_i64);
    let description = non_empty(body.get("error_description")).and_then(Value::as_str);
    let error_message = error
        .and_then(|e| non_empty(e.get("error_msg")))
        .and_then(Value::as_str)
        .or(description)
        // OAuth endpoints report `{"error": "invalid_client"}` without a message
        .or_else(|| error.and_then(Value::as_str));

    let status_code = i64::from(status);
    let reject = |code: i64, message: &str| {
        let err = ProviderError {
            message: message.to_string(),
            code,
            status,
            payload: body.clone(),
        };
        warn!(
            status = err.status,
            code = err.code,
            message = %err.message,
            "Provider response rejected"
        );
        err
    };

    if status > 399 {
        return Err(reject(
            error_code.unwrap_or(status_code),
            error_message.unwrap_or(&response.reason),
        ));
    }

    // Not JSON: whatever the body claims, the HTTP status is the code
    if !response.media_type().eq_ignore_ascii_case(JSON_MEDIA_TYPE) {
        return Err(reject(
            status_code,
            error_message.unwrap_or(&response.reason),
        ));
    }

    if error.is_some() {
        return Err(reject(
            error_code.unwrap_or(status_code),
            error_message.unwrap_or(&response.reason),
        ));
    }

    Ok(())
}
