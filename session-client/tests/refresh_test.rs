mod common;

use common::{
    next_matching, restored_session, restored_session_with, settings, stored, ACCESS_TOKEN,
    REFRESH_TOKEN,
};
use serde_json::{json, Value};
use session_client::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use session_client::{ApiError, ApiRequest, AuthStatus, SessionEvent};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_items_for_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2, 3]})))
        .mount(server)
        .await;
}

async fn mount_items_unauthorized(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bearer_token_is_injected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2, 3]})))
        .expect(1)
        .mount(&server)
        .await;

    let (session, _store) =
        restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;

    let body: Value = session.get("/items").await.unwrap();
    assert_eq!(body["items"], json!([1, 2, 3]));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    mount_items_for_token(&server, "access-2").await;
    mount_items_unauthorized(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": REFRESH_TOKEN})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (session, store) = restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;

    let body: Value = session.get("/items").await.unwrap();
    assert_eq!(body["items"], json!([1, 2, 3]));

    // No refresh token issued: the old one is kept
    assert_eq!(stored(&store, ACCESS_TOKEN_KEY).await.as_deref(), Some("access-2"));
    assert_eq!(stored(&store, REFRESH_TOKEN_KEY).await.as_deref(), Some(REFRESH_TOKEN));
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let server = MockServer::start().await;
    mount_items_for_token(&server, "access-2").await;
    mount_items_unauthorized(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (session, store) = restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;

    let _: Value = session.get("/items").await.unwrap();
    assert_eq!(stored(&store, REFRESH_TOKEN_KEY).await.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;
    mount_items_for_token(&server, "access-2").await;
    mount_items_unauthorized(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "access-2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (session, _store) =
        restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;

    let results = futures::future::join_all(
        (0..3).map(|_| session.get::<Value>("/items")),
    )
    .await;

    for result in results {
        let body = result.unwrap();
        assert_eq!(body["items"], json!([1, 2, 3]));
    }
    assert_eq!(session.state().await, AuthStatus::Authenticated);
}

#[tokio::test]
async fn test_failed_refresh_expires_every_waiting_request() {
    let server = MockServer::start().await;
    mount_items_unauthorized(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Refresh token revoked"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (session, store) = restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;
    let mut events = session.subscribe();

    let results = futures::future::join_all(
        (0..3).map(|_| session.get::<Value>("/items")),
    )
    .await;

    for result in results {
        assert!(matches!(result, Err(ApiError::SessionExpired)));
    }
    assert_eq!(session.state().await, AuthStatus::Unauthenticated);
    assert!(store.is_empty());

    let event = next_matching(&mut events, |e| matches!(e, SessionEvent::LoginRequired { .. })).await;
    assert!(matches!(event, SessionEvent::LoginRequired { .. }));
}

#[tokio::test]
async fn test_missing_refresh_token_expires_without_refresh_call() {
    let server = MockServer::start().await;
    mount_items_unauthorized(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let (session, store) = restored_session(&server, ACCESS_TOKEN, None, None).await;

    let err = session.get::<Value>("/items").await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(session.state().await, AuthStatus::Unauthenticated);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_replay_rejected_again_is_not_refreshed_twice() {
    let server = MockServer::start().await;
    mount_items_unauthorized(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (session, _store) =
        restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;

    let err = session.get::<Value>("/items").await.unwrap_err();
    match err {
        ApiError::Unauthorized(classified) => assert_eq!(classified.message, "Token expired"),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
    // The refreshed credential stays installed
    assert_eq!(session.state().await, AuthStatus::Authenticated);
}

#[tokio::test]
async fn test_request_marked_as_retried_never_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("x-session-retry", "1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_items_unauthorized(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _store) =
        restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;

    let err = session
        .execute(ApiRequest::get("/items").mark_retried())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
}

#[tokio::test]
async fn test_query_parameters_survive_the_replay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Bearer access-2"))
        .and(header("x-session-retry", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [4]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (session, _store) =
        restored_session(&server, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;

    let response = session
        .execute(ApiRequest::get("/items").query_param("page", "2"))
        .await
        .unwrap();
    let body: Value = response.json().unwrap();
    assert_eq!(body["items"], json!([4]));
}

#[tokio::test]
async fn test_unreachable_refresh_endpoint_expires_session() {
    let server = MockServer::start().await;
    mount_items_unauthorized(&server).await;

    // Answered after the client timeout, so the refresh fails at the transport level
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "access-2"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut client_settings = settings(&server);
    client_settings.timeout_secs = 1;
    let (session, store) =
        restored_session_with(client_settings, ACCESS_TOKEN, Some(REFRESH_TOKEN), None).await;
    let mut events = session.subscribe();

    let err = session.get::<Value>("/items").await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(session.state().await, AuthStatus::Unauthenticated);
    assert!(store.is_empty());

    let event = next_matching(&mut events, |e| matches!(e, SessionEvent::LoginRequired { .. })).await;
    assert_eq!(
        event,
        SessionEvent::LoginRequired {
            reason: "token refresh failed".to_string()
        }
    );
}
