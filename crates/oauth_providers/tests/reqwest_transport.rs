//! ReqwestTransport against a local HTTP mock server

use config::VkConfig;
use httpmock::prelude::*;
use oauth_providers::{
    AccessToken, ApiRequest, HttpTransport, OAuthError, QueryParams, ReqwestTransport,
    VkontakteProvider,
};
use serde_json::json;
use std::sync::Arc;

fn provider_for(server: &MockServer) -> VkontakteProvider {
    let config = VkConfig {
        api_base_url: server.url("/method"),
        user_fields: vec!["first_name".to_string(), "last_name".to_string()],
        ..VkConfig::default()
    };
    VkontakteProvider::new(config, Arc::new(ReqwestTransport::new(5).unwrap()))
}

#[tokio::test]
async fn test_transport_reports_status_and_content_type() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/method/users.get");
            then.status(503)
                .header("content-type", "text/html; charset=windows-1251")
                .body("<html>Service Unavailable</html>");
        })
        .await;

    let transport = ReqwestTransport::new(5).unwrap();
    let response = transport
        .send(ApiRequest::get(server.url("/method/users.get"), None))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status, 503);
    assert_eq!(response.reason, "Service Unavailable");
    assert_eq!(response.media_type(), "text/html");
    assert_eq!(response.body, b"<html>Service Unavailable</html>".to_vec());
}

#[tokio::test]
async fn test_users_get_over_http() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/method/users.get")
                .query_param("user_ids", "1,2")
                .query_param("fields", "first_name,last_name")
                .query_param("access_token", "tok")
                .query_param("v", "5.52");
            then.status(200)
                .header("content-type", "application/json; charset=utf-8")
                .json_body(json!({"response": [
                    {"id": 1, "first_name": "Pavel", "last_name": "Durov"},
                    {"id": 2, "first_name": "Alexandra", "last_name": "Vladimirova"}
                ]}));
        })
        .await;

    let provider = provider_for(&server);
    let token = AccessToken::new("tok");
    let users = provider
        .users_get(&[1, 2], Some(&token), &QueryParams::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(users.len(), 2);
    assert_eq!(users[1].first_name(), Some("Alexandra"));
}

#[tokio::test]
async fn test_friends_get_error_over_http() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/method/friends.get");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"error": {"error_code": 15, "error_msg": "Access denied"}}));
        })
        .await;

    let provider = provider_for(&server);
    let result = provider
        .friends_get(Some(1), None, &QueryParams::new())
        .await;

    match result {
        Err(OAuthError::Provider(err)) => {
            assert_eq!(err.code, 15);
            assert_eq!(err.message, "Access denied");
            assert_eq!(err.status, 200);
        }
        other => panic!("Expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let transport = ReqwestTransport::new(1).unwrap();

    let result = transport
        .send(ApiRequest::get("http://127.0.0.1:1/method/users.get", None))
        .await;

    assert!(matches!(result, Err(OAuthError::Transport(_))));
}
