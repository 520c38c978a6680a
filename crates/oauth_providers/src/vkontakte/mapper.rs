//! Mapping of VK response bodies into `UserRecord`s

use crate::models::{parse_id, AccessToken, OAuthError, UserRecord};
use serde_json::{Map, Value};

/// Map a `users.get` resource-owner response for the authenticated user
///
/// The body is `{"response": [ {...} ]}`; only the first element is used.
/// `id` and `email` always come from the token side values, which the token
/// exchange reports reliably, and are absent when the token lacks them.
pub fn to_user_record(body: Value, token: &AccessToken) -> Result<UserRecord, OAuthError> {
    let attributes = match take_response(body)? {
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(attributes)) => attributes,
            Some(_) => {
                return Err(OAuthError::InvalidResponse(
                    "resource owner entry is not an object".to_string(),
                ))
            }
            None => {
                return Err(OAuthError::InvalidResponse(
                    "resource owner response is empty".to_string(),
                ))
            }
        },
        _ => {
            return Err(OAuthError::InvalidResponse(
                "resource owner response is not a list".to_string(),
            ))
        }
    };

    let mut record = UserRecord::from_attributes(attributes);
    record.email = token.email().map(str::to_string);
    record.id = token.user_id();

    Ok(record)
}

/// Map a list response into records, one per element
///
/// Accepts both `{"response": {"items": [...]}}` and `{"response": [...]}`.
/// Elements may be full user objects or bare ids.
pub fn to_user_records(body: Value) -> Result<Vec<UserRecord>, OAuthError> {
    let items = match take_response(body)? {
        Value::Object(mut response) => match response.remove("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => {
                return Err(OAuthError::InvalidResponse(
                    "response object has no items".to_string(),
                ))
            }
            Some(_) => {
                return Err(OAuthError::InvalidResponse(
                    "response items is not a list".to_string(),
                ))
            }
        },
        Value::Array(items) => items,
        _ => {
            return Err(OAuthError::InvalidResponse(
                "response is neither a list nor an object".to_string(),
            ))
        }
    };

    items.into_iter().map(to_list_entry).collect()
}

fn to_list_entry(item: Value) -> Result<UserRecord, OAuthError> {
    match item {
        Value::Object(attributes) => Ok(UserRecord::from_attributes(attributes)),
        Value::Number(_) | Value::String(_) => Ok(UserRecord {
            id: parse_id(&item),
            email: None,
            fields: Map::new(),
        }),
        other => Err(OAuthError::InvalidResponse(format!(
            "unexpected user entry: {other}"
        ))),
    }
}

fn take_response(body: Value) -> Result<Value, OAuthError> {
    match body {
        Value::Object(mut root) => root
            .remove("response")
            .ok_or_else(|| OAuthError::InvalidResponse("missing response key".to_string())),
        _ => Err(OAuthError::InvalidResponse(
            "response body is not a JSON object".to_string(),
        )),
    }
}
