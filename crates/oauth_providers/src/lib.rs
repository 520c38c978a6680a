//! OAuth2 identity provider adapters
//!
//! This crate authenticates users against third-party social networks and
//! reads their profile data. Each provider implements the narrow
//! `OAuth2Provider` capability; the generic `OAuthFlow` driver composes a
//! provider with an `oauth2` client and an `HttpTransport`.
//!
//! # Architecture
//!
//! ```text
//! OAuthFlow<P: OAuth2Provider>
//!     ├── oauth2 client (authorization URL, scopes, CSRF state)
//!     ├── HttpTransport (ReqwestTransport | MockTransport)
//!     └── provider:
//!         └── VkontakteProvider (+ users_get / friends_get)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use oauth_providers::{AccessToken, QueryParams, ReqwestTransport, VkontakteProvider};
//! use std::sync::Arc;
//!
//! async fn example(token: AccessToken) -> Result<(), oauth_providers::OAuthError> {
//!     let transport = Arc::new(ReqwestTransport::new(30)?);
//!     let provider = VkontakteProvider::new(config::VkConfig::default(), transport);
//!
//!     let me = provider.users_get(&[], Some(&token), &QueryParams::new()).await?;
//!     let friends = provider.friends_get(me[0].id, Some(&token), &QueryParams::new()).await?;
//!     println!("{} friends", friends.len());
//!     Ok(())
//! }
//! ```

pub mod flow;
pub mod mock;
pub mod models;
pub mod transport;
pub mod vkontakte;

use serde_json::Value;

// Re-export commonly used types for convenience
pub use flow::{AuthorizationRequest, OAuthFlow};
pub use mock::MockTransport;
pub use models::{AccessToken, OAuthError, ProviderError, QueryParams, UserId, UserRecord};
pub use transport::{build_query_string, ApiRequest, HttpTransport, RawResponse, ReqwestTransport};
pub use vkontakte::VkontakteProvider;

/// Capabilities a provider contributes to the OAuth2 flow
///
/// Implementations are pure: they build URLs, classify responses and map
/// bodies, while the flow driver owns all network traffic.
pub trait OAuth2Provider: Send + Sync {
    /// Short provider identifier used in logs
    fn name(&self) -> &'static str;

    /// Base authorization endpoint, without query parameters
    fn authorization_url(&self) -> String;

    /// Token exchange endpoint
    fn token_url(&self) -> String;

    /// Full URL returning the authenticated resource owner's profile
    fn resource_owner_url(&self, token: &AccessToken) -> Result<String, OAuthError>;

    /// Scopes requested when the caller does not supply any
    fn default_scopes(&self) -> Vec<String>;

    /// Separator used to join scopes into a single `scope` parameter
    fn scope_separator(&self) -> &'static str {
        ","
    }

    /// Accept or reject a response before it is mapped
    fn validate_response(&self, response: &RawResponse, body: &Value) -> Result<(), ProviderError>;

    /// Build the resource owner record from a validated body
    fn map_resource_owner(&self, body: Value, token: &AccessToken) -> Result<UserRecord, OAuthError>;
}
