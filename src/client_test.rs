use super::*;
use crate::session::{LOGIN_PATH, REFRESH_PATH};
use crate::store::{ACCESS_TOKEN_KEY, MemoryTokenStore, REFRESH_TOKEN_KEY, TokenStore};
use crate::transport::test_helpers::*;

const ALERTS_PATH: &str = "/api/campgrounds/alerts";

fn authorized(mock: MockTransport) -> (Arc<MockTransport>, Arc<MemoryTokenStore>, AuthorizedClient) {
    let mock = Arc::new(mock);
    let store = Arc::new(MemoryTokenStore::new());
    let session = Arc::new(SessionManager::new(mock.clone(), store.clone()));
    (mock, store, AuthorizedClient::new(session))
}

/// Alerts accept only `T2`; refresh with `R1` mints `T2`.
fn expiring_api(req: &ApiRequest) -> Result<ApiResponse, SessionError> {
    match (req.path.as_str(), req.bearer.as_deref()) {
        (LOGIN_PATH, _) => ok(token_pair("T1", "R1", "a@b.com")),
        (REFRESH_PATH, Some("R1")) => ok(serde_json::json!({ "access_token": "T2", "user": user_json(1, "a@b.com") })),
        (ALERTS_PATH, Some("T2")) => ok(serde_json::json!({ "alerts": [] })),
        _ => status(401, serde_json::json!({ "detail": "Invalid authentication credentials" })),
    }
}

#[tokio::test]
async fn attaches_persisted_access_token() {
    let (mock, store, client) = authorized(MockTransport::new(|_| ok(serde_json::json!({ "alerts": [] }))));
    store.save(ACCESS_TOKEN_KEY, "T1").unwrap();

    let body = client.get(ALERTS_PATH).await.unwrap();

    assert_eq!(body, serde_json::json!({ "alerts": [] }));
    assert_eq!(mock.requests()[0].bearer.as_deref(), Some("T1"));
}

#[tokio::test]
async fn unauthenticated_401_does_not_refresh() {
    let (mock, _store, client) = authorized(MockTransport::new(expiring_api));

    let err = client.get(ALERTS_PATH).await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { status: 401, .. }));
    assert!(mock.requests()[0].bearer.is_none());
    assert_eq!(mock.count(REFRESH_PATH), 0);
}

#[tokio::test]
async fn expired_token_triggers_single_refresh_and_propagates_401() {
    let (mock, store, client) = authorized(MockTransport::new(expiring_api));
    client.session().login("a@b.com", "secret").await.unwrap();

    let err = client.get(ALERTS_PATH).await.unwrap_err();

    assert!(
        matches!(err, SessionError::Rejected { status: 401, ref message } if message == "Invalid authentication credentials")
    );
    assert_eq!(mock.count(REFRESH_PATH), 1);
    assert_eq!(mock.count(ALERTS_PATH), 1);
    assert_eq!(client.session().get_auth_token().as_deref(), Some("T2"));
    assert_eq!(store.load(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
    assert!(client.session().is_authenticated());

    // The caller retries with the refreshed token.
    let body = client.get(ALERTS_PATH).await.unwrap();
    assert_eq!(body, serde_json::json!({ "alerts": [] }));
    assert_eq!(mock.requests().last().unwrap().bearer.as_deref(), Some("T2"));
    assert_eq!(mock.count(REFRESH_PATH), 1);
}

#[tokio::test]
async fn failed_refresh_logs_out_without_retrying() {
    let (mock, store, client) = authorized(MockTransport::new(|req| match req.path.as_str() {
        LOGIN_PATH => ok(token_pair("T1", "R1", "a@b.com")),
        _ => status(401, serde_json::Value::Null),
    }));
    client.session().login("a@b.com", "secret").await.unwrap();

    let err = client.get(ALERTS_PATH).await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { status: 401, .. }));
    assert_eq!(mock.count(REFRESH_PATH), 1);
    assert!(!client.session().is_authenticated());
    assert_eq!(store.load(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(store.load(REFRESH_TOKEN_KEY).unwrap(), None);

    // Cleared tokens are never sent again.
    let _ = client.get(ALERTS_PATH).await;
    assert!(mock.requests().last().unwrap().bearer.is_none());
    assert_eq!(mock.count(REFRESH_PATH), 1);
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let (mock, _store, client) = authorized(MockTransport::new(expiring_api));
    client.session().login("a@b.com", "secret").await.unwrap();

    let (a, b, c) = tokio::join!(client.get(ALERTS_PATH), client.get(ALERTS_PATH), client.get(ALERTS_PATH));

    assert!(a.is_err() && b.is_err() && c.is_err());
    assert_eq!(mock.count(ALERTS_PATH), 3);
    assert_eq!(mock.count(REFRESH_PATH), 1);
    assert_eq!(client.session().get_auth_token().as_deref(), Some("T2"));
}

#[tokio::test]
async fn concurrent_401s_after_failed_refresh_stay_logged_out() {
    let (mock, _store, client) = authorized(MockTransport::new(|req| match req.path.as_str() {
        LOGIN_PATH => ok(token_pair("T1", "R1", "a@b.com")),
        _ => status(401, serde_json::Value::Null),
    }));
    client.session().login("a@b.com", "secret").await.unwrap();

    let (a, b) = tokio::join!(client.get(ALERTS_PATH), client.get(ALERTS_PATH));

    assert!(a.is_err() && b.is_err());
    assert_eq!(mock.count(REFRESH_PATH), 1);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn non_401_errors_do_not_refresh() {
    let (mock, store, client) =
        authorized(MockTransport::new(|_| status(403, serde_json::json!({ "detail": "Not authorized to delete this alert" }))));
    store.save(ACCESS_TOKEN_KEY, "T1").unwrap();

    let err = client.call(Method::DELETE, "/api/campgrounds/alerts/42", None).await.unwrap_err();

    assert!(
        matches!(err, SessionError::Rejected { status: 403, ref message } if message == "Not authorized to delete this alert")
    );
    assert_eq!(mock.count(REFRESH_PATH), 0);
    assert_eq!(store.load(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("T1"));
}

#[tokio::test]
async fn error_without_message_reports_status() {
    let (_mock, _store, client) = authorized(MockTransport::new(|_| status(502, serde_json::Value::Null)));

    let err = client.get("/api/health").await.unwrap_err();
    assert!(matches!(err, SessionError::Rejected { status: 502, ref message } if message == "HTTP 502"));
}

#[tokio::test]
async fn explicit_bearer_is_not_overridden() {
    let (mock, store, client) = authorized(MockTransport::new(|_| ok(serde_json::Value::Null)));
    store.save(ACCESS_TOKEN_KEY, "T1").unwrap();

    let resp = client.send(ApiRequest::get("/api/other").with_bearer("custom")).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(mock.requests()[0].bearer.as_deref(), Some("custom"));
}

#[tokio::test]
async fn post_sends_json_body() {
    let (mock, store, client) = authorized(MockTransport::new(|_| ok(serde_json::json!({ "id": "alert-1" }))));
    store.save(ACCESS_TOKEN_KEY, "T1").unwrap();

    let body = serde_json::json!({ "start_date": "2025-07-01", "end_date": "2025-07-03" });
    client.post("/api/campgrounds/232447/alerts", body.clone()).await.unwrap();

    let sent = mock.requests();
    assert_eq!(sent[0].method, Method::POST);
    assert_eq!(sent[0].body, Some(body));
}

#[tokio::test]
async fn call_retrying_resends_after_successful_refresh() {
    let (mock, _store, client) = authorized(MockTransport::new(expiring_api));
    client.session().login("a@b.com", "secret").await.unwrap();

    let body = client.call_retrying(Method::GET, ALERTS_PATH, None).await.unwrap();

    assert_eq!(body, serde_json::json!({ "alerts": [] }));
    assert_eq!(mock.count(REFRESH_PATH), 1);
    let bearers: Vec<_> = mock
        .requests()
        .into_iter()
        .filter(|r| r.path == ALERTS_PATH)
        .map(|r| r.bearer)
        .collect();
    assert_eq!(bearers, vec![Some("T1".to_owned()), Some("T2".to_owned())]);
}

#[tokio::test]
async fn call_retrying_stops_after_failed_refresh() {
    let (mock, store, client) = authorized(MockTransport::new(|req| match req.path.as_str() {
        LOGIN_PATH => ok(token_pair("T1", "R1", "a@b.com")),
        _ => status(401, serde_json::Value::Null),
    }));
    client.session().login("a@b.com", "secret").await.unwrap();

    let err = client.call_retrying(Method::GET, ALERTS_PATH, None).await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { status: 401, .. }));
    assert_eq!(mock.count(ALERTS_PATH), 1);
    assert_eq!(mock.count(REFRESH_PATH), 1);
    assert_eq!(store.load(ACCESS_TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn call_retrying_without_session_sends_once() {
    let (mock, _store, client) = authorized(MockTransport::new(expiring_api));

    let err = client.call_retrying(Method::GET, ALERTS_PATH, None).await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { status: 401, .. }));
    assert_eq!(mock.count(ALERTS_PATH), 1);
    assert_eq!(mock.count(REFRESH_PATH), 0);
}
