//! VK (vk.com) identity provider
//!
//! Builds the OAuth endpoints, classifies responses and maps user data for
//! VK's RPC-style API (`https://api.vk.com/method/<name>?...&v=<version>`).
//!
//! Besides the `OAuth2Provider` capability used by `crate::flow::OAuthFlow`,
//! the provider exposes two API calls layered on the same token:
//! `users_get` and `friends_get`.

pub mod mapper;
pub mod validation;

use crate::models::{AccessToken, OAuthError, ProviderError, QueryParams, UserId, UserRecord};
use crate::transport::{build_query_string, ApiRequest, HttpTransport, RawResponse};
use crate::OAuth2Provider;
use config::VkConfig;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub use mapper::{to_user_record, to_user_records};
pub use validation::validate_response;

/// VK provider adapter
///
/// Stateless between calls: `scopes` and `user_fields` may be adjusted before
/// use, everything else is fixed at construction.
pub struct VkontakteProvider {
    auth_base_url: String,
    api_base_url: String,
    api_version: String,
    /// Permissions requested during authorization, in order
    pub scopes: Vec<String>,
    /// Profile fields requested for every user, in order
    pub user_fields: Vec<String>,
    transport: Arc<dyn HttpTransport>,
}

impl VkontakteProvider {
    pub fn new(config: VkConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            auth_base_url: config.auth_base_url.trim_end_matches('/').to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version,
            scopes: config.scopes,
            user_fields: config.user_fields,
            transport,
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn fields_param(&self) -> String {
        self.user_fields.join(",")
    }

    fn method_url(&self, method: &str, params: &QueryParams) -> String {
        format!(
            "{}/{}?{}",
            self.api_base_url,
            method,
            build_query_string(params)
        )
    }

    /// Default parameters shared by every user-returning API call
    fn default_params(&self, token: Option<&AccessToken>) -> QueryParams {
        QueryParams::new()
            .with("fields", self.fields_param())
            .with_opt("access_token", token.map(|t| t.token().to_string()))
            .with("v", self.api_version.clone())
    }

    /// Look up users by id
    ///
    /// With no ids the provider resolves the token's owner, so either `ids`
    /// or `token` is required. `params` are merged last and override the
    /// defaults (`user_ids`, `fields`, `access_token`, `v`).
    pub async fn users_get(
        &self,
        ids: &[UserId],
        token: Option<&AccessToken>,
        params: &QueryParams,
    ) -> Result<Vec<UserRecord>, OAuthError> {
        if ids.is_empty() && token.is_none() {
            return Err(OAuthError::InvalidArgument(
                "either user ids or an access token is required".to_string(),
            ));
        }

        let user_ids = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let defaults = QueryParams::new()
            .with("user_ids", user_ids)
            .merge(&self.default_params(token));

        let body = self
            .call("users.get", &defaults.merge(params), token)
            .await?;
        to_user_records(body)
    }

    /// List the friends of a user
    ///
    /// Without `user_id` the provider lists the token owner's friends, so
    /// either `user_id` or `token` is required.
    pub async fn friends_get(
        &self,
        user_id: Option<UserId>,
        token: Option<&AccessToken>,
        params: &QueryParams,
    ) -> Result<Vec<UserRecord>, OAuthError> {
        if user_id.is_none() && token.is_none() {
            return Err(OAuthError::InvalidArgument(
                "either a user id or an access token is required".to_string(),
            ));
        }

        let defaults = QueryParams::new()
            .with_opt("user_id", user_id.map(|id| id.to_string()))
            .merge(&self.default_params(token));

        let body = self
            .call("friends.get", &defaults.merge(params), token)
            .await?;
        to_user_records(body)
    }

    /// One GET round trip against an API method, validated
    async fn call(
        &self,
        method: &str,
        params: &QueryParams,
        token: Option<&AccessToken>,
    ) -> Result<Value, OAuthError> {
        debug!(method, "Calling VK API method");

        let url = self.method_url(method, params);
        let request = ApiRequest::get(url, token.map(|t| t.token().to_string()));
        let response = self.transport.send(request).await?;

        let body = response.decode_body();
        self.validate_response(&response, &body)?;

        Ok(body)
    }
}

impl OAuth2Provider for VkontakteProvider {
    fn name(&self) -> &'static str {
        "vkontakte"
    }

    fn authorization_url(&self) -> String {
        format!("{}/authorize", self.auth_base_url)
    }

    fn token_url(&self) -> String {
        format!("{}/access_token", self.auth_base_url)
    }

    fn resource_owner_url(&self, token: &AccessToken) -> Result<String, OAuthError> {
        if token.token().is_empty() {
            return Err(OAuthError::InvalidArgument(
                "access token must not be empty".to_string(),
            ));
        }

        Ok(self.method_url("users.get", &self.default_params(Some(token))))
    }

    fn default_scopes(&self) -> Vec<String> {
        self.scopes.clone()
    }

    fn validate_response(&self, response: &RawResponse, body: &Value) -> Result<(), ProviderError> {
        validate_response(response, body)
    }

    fn map_resource_owner(&self, body: Value, token: &AccessToken) -> Result<UserRecord, OAuthError> {
        to_user_record(body, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn provider() -> VkontakteProvider {
        VkontakteProvider::new(VkConfig::default(), Arc::new(MockTransport::new()))
    }

    // ==================== Endpoint Tests ====================

    #[test]
    fn test_authorization_and_token_urls() {
        let provider = provider();

        assert_eq!(provider.authorization_url(), "https://oauth.vk.com/authorize");
        assert_eq!(provider.token_url(), "https://oauth.vk.com/access_token");
    }

    #[test]
    fn test_base_url_trailing_slash_is_ignored() {
        let config = VkConfig {
            auth_base_url: "https://oauth.example.test/".to_string(),
            ..VkConfig::default()
        };
        let provider = VkontakteProvider::new(config, Arc::new(MockTransport::new()));

        assert_eq!(
            provider.authorization_url(),
            "https://oauth.example.test/authorize"
        );
    }

    #[test]
    fn test_resource_owner_url() {
        let mut provider = provider();
        provider.user_fields = vec!["first_name".to_string(), "last_name".to_string()];

        let url = provider
            .resource_owner_url(&AccessToken::new("tok123"))
            .unwrap();

        assert_eq!(
            url,
            "https://api.vk.com/method/users.get?fields=first_name%2Clast_name&access_token=tok123&v=5.52"
        );
    }

    #[test]
    fn test_resource_owner_url_preserves_field_order() {
        let mut provider = provider();
        provider.user_fields = vec!["sex".to_string(), "bdate".to_string(), "city".to_string()];

        let url = provider
            .resource_owner_url(&AccessToken::new("t"))
            .unwrap();

        assert!(url.contains("fields=sex%2Cbdate%2Ccity&"));
    }

    #[test]
    fn test_resource_owner_url_default_fields() {
        let url = provider()
            .resource_owner_url(&AccessToken::new("t"))
            .unwrap();

        assert!(url.starts_with("https://api.vk.com/method/users.get?fields=about%2Cbdate%2Ccan_post"));
        assert!(url.ends_with("timezone&access_token=t&v=5.52"));
    }

    #[test]
    fn test_resource_owner_url_rejects_empty_token() {
        let result = provider().resource_owner_url(&AccessToken::new(""));
        assert!(matches!(result, Err(OAuthError::InvalidArgument(_))));
    }

    #[test]
    fn test_default_scopes() {
        assert_eq!(
            provider().default_scopes(),
            vec!["email", "friends", "offline", "photos", "wall"]
        );
    }
}
