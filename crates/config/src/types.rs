use serde::Deserialize;
use std::{collections::HashMap, env};

use crate::ConfigError;

pub const DEFAULT_AUTH_BASE_URL: &str = "https://oauth.vk.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.vk.com/method";
pub const DEFAULT_API_VERSION: &str = "5.52";

/// Permissions requested during authorization
///
/// See <https://vk.com/dev/permissions>
pub const DEFAULT_SCOPES: &[&str] = &["email", "friends", "offline", "photos", "wall"];

/// Profile fields requested for every user record
///
/// See <https://vk.com/dev/fields>
pub const DEFAULT_USER_FIELDS: &[&str] = &[
    "about",
    "bdate",
    "can_post",
    "city",
    "contacts",
    "counters",
    "country",
    "domain",
    "first_name",
    "friend_status",
    "has_mobile",
    "has_photo",
    "home_town",
    "id",
    "is_friend",
    "last_name",
    "maiden_name",
    "nickname",
    "photo_max",
    "photo_max_orig",
    "screen_name",
    "sex",
    "timezone",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: VkConfig,
    pub client: Option<OAuthClientConfig>,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            provider: VkConfig::from_lookup(&lookup),
            client: OAuthClientConfig::from_lookup(&lookup)?,
            logging: LoggingConfig::from_lookup(&lookup),
        })
    }
}

/// Provider endpoints and request defaults
///
/// Process-wide defaults; callers may clone and override per provider instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VkConfig {
    pub auth_base_url: String,
    pub api_base_url: String,
    pub api_version: String,
    /// Ordered; joined in this order when building requests
    pub scopes: Vec<String>,
    /// Ordered; joined in this order when building requests
    pub user_fields: Vec<String>,
}

impl VkConfig {
    /// Read `VK_*` overrides, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            auth_base_url: lookup("VK_AUTH_BASE_URL").unwrap_or(defaults.auth_base_url),
            api_base_url: lookup("VK_API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_version: lookup("VK_API_VERSION").unwrap_or(defaults.api_version),
            scopes: lookup("VK_SCOPES")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.scopes),
            user_fields: lookup("VK_USER_FIELDS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.user_fields),
        }
    }
}

impl Default for VkConfig {
    fn default() -> Self {
        Self {
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            user_fields: DEFAULT_USER_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// OAuth client registration for the authorization flow
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthClientConfig {
    /// Returns `None` when none of the variables are set, and an error when
    /// only some of them are.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match (
            lookup("VK_CLIENT_ID"),
            lookup("VK_CLIENT_SECRET"),
            lookup("VK_REDIRECT_URI"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(Some(Self {
                client_id,
                client_secret,
                redirect_uri,
            })),
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::EnvError(
                "VK_CLIENT_ID, VK_CLIENT_SECRET and VK_REDIRECT_URI must be set together"
                    .to_string(),
            )),
        }
    }
}

/// Logging Configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl LoggingConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut modules = HashMap::new();

        // Load module-specific log levels
        if let Some(level) = lookup("LOG_MODULE_OAUTH_PROVIDERS") {
            modules.insert("oauth_providers".to_string(), level);
        }
        if let Some(level) = lookup("LOG_MODULE_LOOKUP") {
            modules.insert("lookup".to_string(), level);
        }

        Self {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            modules,
        }
    }

    /// Filter directive string for `tracing_subscriber::EnvFilter`
    pub fn filter_directive(&self) -> String {
        let mut filter = self.level.clone();

        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();
        for (module, level) in modules {
            filter.push_str(&format!(",{}={}", module, level));
        }

        filter
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut modules = HashMap::new();
        modules.insert("oauth_providers".to_string(), "debug".to_string());

        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_vk_config_defaults() {
        let config = VkConfig::default();

        assert_eq!(config.auth_base_url, "https://oauth.vk.com");
        assert_eq!(config.api_base_url, "https://api.vk.com/method");
        assert_eq!(config.api_version, "5.52");
        assert_eq!(
            config.scopes,
            vec!["email", "friends", "offline", "photos", "wall"]
        );
        assert_eq!(config.user_fields.first().unwrap(), "about");
        assert_eq!(config.user_fields.last().unwrap(), "timezone");
        assert_eq!(config.user_fields.len(), 23);
    }

    #[test]
    fn test_vk_config_from_lookup_overrides() {
        let config = VkConfig::from_lookup(vars(&[
            ("VK_API_VERSION", "5.199"),
            ("VK_SCOPES", "email, wall ,,friends"),
            ("VK_USER_FIELDS", "first_name,last_name"),
        ]));

        assert_eq!(config.api_version, "5.199");
        assert_eq!(config.scopes, vec!["email", "wall", "friends"]);
        assert_eq!(config.user_fields, vec!["first_name", "last_name"]);
        assert_eq!(config.auth_base_url, DEFAULT_AUTH_BASE_URL);
    }

    #[test]
    fn test_client_config_all_or_nothing() {
        assert!(OAuthClientConfig::from_lookup(vars(&[]))
            .unwrap()
            .is_none());

        let client = OAuthClientConfig::from_lookup(vars(&[
            ("VK_CLIENT_ID", "1"),
            ("VK_CLIENT_SECRET", "secret"),
            ("VK_REDIRECT_URI", "https://example.com/cb"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(client.client_id, "1");

        let partial = OAuthClientConfig::from_lookup(vars(&[("VK_CLIENT_ID", "1")]));
        assert!(matches!(partial, Err(ConfigError::EnvError(_))));
    }

    #[test]
    fn test_logging_filter_directive() {
        let config = LoggingConfig::from_lookup(vars(&[
            ("LOG_LEVEL", "warn"),
            ("LOG_MODULE_OAUTH_PROVIDERS", "trace"),
            ("LOG_MODULE_LOOKUP", "debug"),
        ]));

        assert_eq!(config.format, "pretty");
        assert_eq!(
            config.filter_directive(),
            "warn,lookup=debug,oauth_providers=trace"
        );
    }
}
