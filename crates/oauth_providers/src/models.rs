use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Numeric identifier of a user on the provider side
pub type UserId = i64;

// ==================== Errors ====================

/// Rejection reported by the provider or its transport
///
/// Carries the raw decoded payload so callers can decide on retry/backoff.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} (code {code}, HTTP {status})")]
pub struct ProviderError {
    pub message: String,
    /// Provider error code when the body carries one, the HTTP status otherwise
    pub code: i64,
    /// HTTP status of the rejected response
    pub status: u16,
    pub payload: Value,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    /// A required identifying parameter was missing; raised before any network call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider accepted the request but the body has an unexpected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// ==================== Access token ====================

/// Access token plus the side values returned during the code exchange
///
/// VK returns `user_id` and `email` next to `access_token`; they are kept in
/// `values` untouched.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    token: String,
    expires_in: Option<u64>,
    #[serde(default)]
    values: Map<String, Value>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_in: None,
            values: Map::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Build a token from a decoded token-endpoint body
    pub fn from_response(body: Value) -> Result<Self, OAuthError> {
        let Value::Object(mut values) = body else {
            return Err(OAuthError::InvalidResponse(
                "token response is not a JSON object".to_string(),
            ));
        };

        let token = match values.remove("access_token") {
            Some(Value::String(token)) if !token.is_empty() => token,
            _ => {
                return Err(OAuthError::InvalidResponse(
                    "token response has no access_token".to_string(),
                ))
            }
        };

        // 0 means a non-expiring token (offline scope)
        let expires_in = values
            .remove("expires_in")
            .and_then(|v| v.as_u64())
            .filter(|secs| *secs > 0);

        Ok(Self {
            token,
            expires_in,
            values,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Side value by name, treating empty values as absent
    pub fn value(&self, key: &str) -> Option<&Value> {
        non_empty(self.values.get(key))
    }

    /// Resource owner id reported by the token exchange
    pub fn user_id(&self) -> Option<UserId> {
        self.value("user_id").and_then(parse_id)
    }

    /// Resource owner email reported by the token exchange
    pub fn email(&self) -> Option<&str> {
        self.value("email").and_then(Value::as_str)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[redacted]")
            .field("expires_in", &self.expires_in)
            .field("values", &self.values)
            .finish()
    }
}

// ==================== User record ====================

/// Normalized profile of a single user
///
/// `fields` holds every returned attribute except `id` and `email`, passed
/// through without validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Option<UserId>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl UserRecord {
    /// Split a raw attribute map into id, email and pass-through fields
    ///
    /// A non-empty `id` or `email` that does not fit its typed slot stays in
    /// `fields` unchanged.
    pub fn from_attributes(mut attributes: Map<String, Value>) -> Self {
        let id = match attributes.remove("id") {
            Some(raw) => match parse_id(&raw) {
                Some(id) => Some(id),
                None => {
                    if !is_empty_value(&raw) {
                        attributes.insert("id".to_string(), raw);
                    }
                    None
                }
            },
            None => None,
        };

        let email = match attributes.remove("email") {
            Some(raw) if is_empty_value(&raw) => None,
            Some(Value::String(email)) => Some(email),
            Some(raw) => {
                attributes.insert("email".to_string(), raw);
                None
            }
            None => None,
        };

        Self {
            id,
            email,
            fields: attributes,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.get_str("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.get_str("last_name")
    }

    pub fn nickname(&self) -> Option<&str> {
        self.get_str("nickname")
    }

    pub fn screen_name(&self) -> Option<&str> {
        self.get_str("screen_name")
    }

    pub fn domain(&self) -> Option<&str> {
        self.get_str("domain")
    }

    pub fn photo_max(&self) -> Option<&str> {
        self.get_str("photo_max")
    }

    pub fn bdate(&self) -> Option<&str> {
        self.get_str("bdate")
    }

    /// 1 = female, 2 = male, 0 = unspecified
    pub fn sex(&self) -> Option<i64> {
        self.fields.get("sex").and_then(Value::as_i64)
    }

    /// All attributes; `id` and `email` are null when neither the typed slot
    /// nor `fields` holds a value
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.fields.clone();
        match self.id {
            Some(id) => {
                map.insert("id".to_string(), Value::from(id));
            }
            None => {
                map.entry("id").or_insert(Value::Null);
            }
        }
        match &self.email {
            Some(email) => {
                map.insert("email".to_string(), Value::String(email.clone()));
            }
            None => {
                map.entry("email").or_insert(Value::Null);
            }
        }
        map
    }
}

// ==================== Query parameters ====================

/// Ordered query parameters with last-merge-wins overrides
///
/// An entry whose value is `None` keeps its position but is left out of the
/// serialized query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(IndexMap<String, Option<String>>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Some(value.into()));
    }

    /// Mark a key as absent so a merge drops any default for it
    pub fn unset(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), None);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// Apply `overrides` on top of `self`
    ///
    /// Existing keys keep their position and take the override value; new
    /// keys are appended in the order they appear in `overrides`.
    pub fn merge(mut self, overrides: &QueryParams) -> Self {
        for (key, value) in &overrides.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// Present entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

// ==================== Value helpers ====================

/// Emptiness as the provider's API clients understand it: null, false, 0,
/// "", "0" and empty collections
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

pub(crate) fn non_empty(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !is_empty_value(v))
}

/// Identifiers arrive either as numbers or as numeric strings
pub(crate) fn parse_id(value: &Value) -> Option<UserId> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id != 0)
}
