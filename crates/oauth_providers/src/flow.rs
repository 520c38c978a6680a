//! Generic OAuth2 flow driver
//!
//! Composes any `OAuth2Provider` with an `oauth2` client for the browser
//! redirect step and an `HttpTransport` for the resource-owner lookup.
//! Exchanging the authorization code is left to the `oauth2` client's owner;
//! the resulting body is turned into an `AccessToken` with
//! `AccessToken::from_response`.

use crate::models::{AccessToken, OAuthError, UserRecord};
use crate::transport::{ApiRequest, HttpTransport};
use crate::OAuth2Provider;
use config::OAuthClientConfig;
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenUrl,
};
use std::sync::Arc;
use tracing::{debug, info};

// Type alias for a fully configured OAuth client
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// Where to send the user, and the state to verify on callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

pub struct OAuthFlow<P> {
    provider: P,
    client: ConfiguredClient,
    transport: Arc<dyn HttpTransport>,
}

impl<P: OAuth2Provider> OAuthFlow<P> {
    pub fn new(
        provider: P,
        client_config: OAuthClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, OAuthError> {
        let auth_url = AuthUrl::new(provider.authorization_url()).map_err(|e| {
            OAuthError::ConfigError(format!("Invalid {} auth URL: {}", provider.name(), e))
        })?;

        let token_url = TokenUrl::new(provider.token_url()).map_err(|e| {
            OAuthError::ConfigError(format!("Invalid {} token URL: {}", provider.name(), e))
        })?;

        let client = BasicClient::new(ClientId::new(client_config.client_id))
            .set_client_secret(ClientSecret::new(client_config.client_secret))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(
                RedirectUrl::new(client_config.redirect_uri)
                    .map_err(|e| OAuthError::ConfigError(format!("Invalid redirect URL: {}", e)))?,
            );

        Ok(Self {
            provider,
            client,
            transport,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Authorization URL with the provider's default scopes and a random state
    pub fn authorization_request(&self) -> AuthorizationRequest {
        self.build_authorization_request(CsrfToken::new_random, &self.provider.default_scopes())
    }

    /// Authorization URL with a caller-chosen state value
    pub fn authorization_request_with_state(&self, state: String) -> AuthorizationRequest {
        self.build_authorization_request(
            move || CsrfToken::new(state),
            &self.provider.default_scopes(),
        )
    }

    /// Authorization URL requesting exactly `scopes`
    pub fn authorization_request_with_scopes(&self, scopes: &[String]) -> AuthorizationRequest {
        self.build_authorization_request(CsrfToken::new_random, scopes)
    }

    fn build_authorization_request<S>(&self, state_fn: S, scopes: &[String]) -> AuthorizationRequest
    where
        S: FnOnce() -> CsrfToken,
    {
        let mut request = self.client.authorize_url(state_fn);

        // Providers expect one `scope` parameter joined by their own separator
        if !scopes.is_empty() {
            request = request.add_scope(Scope::new(scopes.join(self.provider.scope_separator())));
        }

        let (url, csrf_state) = request.url();

        AuthorizationRequest {
            url: url.to_string(),
            state: csrf_state.secret().to_string(),
        }
    }

    /// Fetch and map the authenticated resource owner
    pub async fn resource_owner(&self, token: &AccessToken) -> Result<UserRecord, OAuthError> {
        let url = self.provider.resource_owner_url(token)?;

        debug!(provider = self.provider.name(), "Fetching resource owner");

        let response = self
            .transport
            .send(ApiRequest::get(url, Some(token.token().to_string())))
            .await?;

        let body = response.decode_body();
        self.provider.validate_response(&response, &body)?;

        let owner = self.provider.map_resource_owner(body, token)?;

        info!(
            provider = self.provider.name(),
            user_id = ?owner.id,
            "Resource owner authenticated"
        );
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::VkontakteProvider;
    use config::VkConfig;
    use std::collections::HashMap;

    fn client_config() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "5490057".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://example.com/auth/vk/callback".to_string(),
        }
    }

    fn flow() -> OAuthFlow<VkontakteProvider> {
        let transport: Arc<dyn HttpTransport> = Arc::new(MockTransport::new());
        let provider = VkontakteProvider::new(VkConfig::default(), transport.clone());
        OAuthFlow::new(provider, client_config(), transport).unwrap()
    }

    fn query_of(url: &str) -> HashMap<String, String> {
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect()
    }

    #[test]
    fn test_authorization_request_with_state() {
        let request = flow().authorization_request_with_state("xyz".to_string());

        assert!(request.url.starts_with("https://oauth.vk.com/authorize?"));
        assert_eq!(request.state, "xyz");

        let query = query_of(&request.url);
        assert_eq!(query["client_id"], "5490057");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["state"], "xyz");
        assert_eq!(query["redirect_uri"], "https://example.com/auth/vk/callback");
        assert_eq!(query["scope"], "email,friends,offline,photos,wall");
    }

    #[test]
    fn test_authorization_request_random_state() {
        let flow = flow();
        let first = flow.authorization_request();
        let second = flow.authorization_request();

        assert!(!first.state.is_empty());
        assert_ne!(first.state, second.state);
        assert_eq!(query_of(&first.url)["state"], first.state);
    }

    #[test]
    fn test_authorization_request_custom_scopes() {
        let request = flow().authorization_request_with_scopes(&["email".to_string()]);
        assert_eq!(query_of(&request.url)["scope"], "email");

        let request = flow().authorization_request_with_scopes(&[]);
        assert!(!query_of(&request.url).contains_key("scope"));
    }

    #[test]
    fn test_invalid_redirect_uri() {
        let transport: Arc<dyn HttpTransport> = Arc::new(MockTransport::new());
        let provider = VkontakteProvider::new(VkConfig::default(), transport.clone());
        let config = OAuthClientConfig {
            redirect_uri: "not a url".to_string(),
            ..client_config()
        };

        let result = OAuthFlow::new(provider, config, transport);
        assert!(matches!(result, Err(OAuthError::ConfigError(_))));
    }
}
