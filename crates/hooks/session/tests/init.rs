use hooklift_kernel::prelude::*;
use hooklift_session::session_id;
use serde_json::json;

async fn load(settings: serde_json::Value) -> Result<Instance, BootstrapError> {
    Bootstrap::new()
        .config_source(StaticConfigSource::new(settings))
        .default_hooks([hooklift_session::hook()])
        .load()
        .await
}

#[tokio::test]
async fn load_reads_the_configured_header() {
    let instance = load(json!({ "hooks": { "session": { "header": "X-Token" } } })).await.unwrap();
    let handler = instance.registry.handler("session.load").unwrap();

    let mut request = Request::new("GET", "/").with_header("x-token", "abc");
    assert_eq!(handler(&mut request), Flow::Next);
    assert_eq!(session_id(&request), Some("abc"));

    let mut request = Request::new("GET", "/").with_header("x-session-id", "ignored");
    handler(&mut request);
    assert_eq!(session_id(&request), None);
}

#[tokio::test]
async fn require_rejects_requests_without_session() {
    let instance = load(json!({
        "routes": { "GET /me": ["session.load", "session.require"] }
    }))
    .await
    .unwrap();

    let anonymous = instance.routes.dispatch(&mut Request::new("GET", "/me"));
    assert_eq!(anonymous.status, 401);

    let mut request = Request::new("GET", "/me").with_header("X-Session-Id", "s-1");
    assert_eq!(instance.routes.dispatch(&mut request).status, 204);
}

#[tokio::test]
async fn blank_header_option_fails_initialization() {
    let err = load(json!({ "hooks": { "session": { "header": " " } } })).await.unwrap_err();
    assert!(matches!(err, BootstrapError::HookInit { .. }));
}
