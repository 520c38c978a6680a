//! Mock implementation of HttpTransport for testing
//!
//! This module provides a transport that replays canned provider responses
//! and records every request, so adapter logic can be tested without network
//! access.

use crate::models::OAuthError;
use crate::transport::{reason_phrase, ApiRequest, HttpTransport, RawResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Request matcher for conditional responses
#[derive(Clone, Debug)]
pub enum RequestMatcher {
    /// Match any request
    Any,
    /// Match requests to an API method, e.g. `users.get`
    ApiMethod(String),
    /// Match requests whose URL contains the given text
    UrlContains(String),
}

impl RequestMatcher {
    /// Check if this matcher matches the given request
    pub fn matches(&self, request: &ApiRequest) -> bool {
        match self {
            Self::Any => true,
            Self::ApiMethod(method) => {
                let path = request.url.split('?').next().unwrap_or_default();
                path.rsplit('/').next() == Some(method.as_str())
            }
            Self::UrlContains(text) => request.url.contains(text.as_str()),
        }
    }
}

/// Template for generating responses
#[derive(Clone, Debug)]
pub enum ResponseTemplate {
    Response(RawResponse),
    /// Simulate a failure to obtain any response
    TransportError(String),
}

impl ResponseTemplate {
    /// JSON response with the given status
    pub fn json(status: u16, body: Value) -> Self {
        Self::Response(RawResponse::json(status, &body))
    }

    /// Response with an arbitrary content type and text body
    pub fn text(status: u16, content_type: &str, body: impl Into<String>) -> Self {
        Self::Response(RawResponse {
            status,
            reason: reason_phrase(status).to_string(),
            content_type: Some(content_type.to_string()),
            body: body.into().into_bytes(),
        })
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::TransportError(message.into())
    }
}

/// Configuration for a single expectation
struct MockExpectation {
    matcher: RequestMatcher,
    response: ResponseTemplate,
}

#[derive(Default)]
struct MockState {
    expectations: Vec<MockExpectation>,
    requests: Vec<ApiRequest>,
}

/// Builder for configuring a single expectation
pub struct MockExpectationBuilder {
    state: Arc<Mutex<MockState>>,
    matcher: RequestMatcher,
}

impl MockExpectationBuilder {
    /// Set the response for this expectation
    pub async fn respond_with(self, response: ResponseTemplate) {
        let mut state = self.state.lock().await;
        state.expectations.push(MockExpectation {
            matcher: self.matcher,
            response,
        });
    }
}

/// Transport that answers from registered expectations
///
/// Expectations are checked in registration order; the first match wins.
/// Requests matching nothing fail with a transport error.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conditional response for a specific matcher
    pub fn when(&self, matcher: RequestMatcher) -> MockExpectationBuilder {
        MockExpectationBuilder {
            state: self.state.clone(),
            matcher,
        }
    }

    /// Every request sent so far, in order
    pub async fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, OAuthError> {
        let mut state = self.state.lock().await;

        let template = state
            .expectations
            .iter()
            .find(|e| e.matcher.matches(&request))
            .map(|e| e.response.clone());

        state.requests.push(request);

        match template {
            Some(ResponseTemplate::Response(response)) => Ok(response),
            Some(ResponseTemplate::TransportError(message)) => Err(OAuthError::Transport(message)),
            None => Err(OAuthError::Transport(
                "no mock expectation matched the request".to_string(),
            )),
        }
    }
}
