use hooklift::prelude::*;
use serde_json::json;

fn builder(settings: serde_json::Value) -> Bootstrap {
    hooklift::bootstrap().config_source(StaticConfigSource::new(settings))
}

#[cfg(feature = "full")]
#[test]
fn full_build_registers_every_builtin() {
    let ids: Vec<String> = hooklift::default_hooks().iter().map(|h| h.id().to_owned()).collect();
    assert_eq!(ids, ["session", "policies", "cors"]);
    assert!(hooklift::hooks::ENABLED.iter().all(|id| hooklift::hooks::is_enabled(id)));
}

#[cfg(feature = "full")]
#[tokio::test]
async fn builtins_load_and_route_together() {
    let instance = builder(json!({
        "routes": {
            "GET /me": ["cors.headers", "session.load", "policies.authenticated"],
            "OPTIONS /me": ["cors.preflight"]
        }
    }))
    .load()
    .await
    .unwrap();

    assert_eq!(instance.registry.namespaces().collect::<Vec<_>>(), ["cors", "policies", "session"]);

    let anonymous = instance.routes.dispatch(&mut Request::new("GET", "/me"));
    assert_eq!(anonymous.status, 401);
    assert_eq!(anonymous.headers["access-control-allow-origin"], "*");

    let mut request = Request::new("GET", "/me").with_header("x-session-id", "s-1");
    assert_eq!(instance.routes.dispatch(&mut request).status, 204);
    assert_eq!(instance.routes.dispatch(&mut Request::new("OPTIONS", "/me")).status, 204);
}

#[cfg(feature = "full")]
#[tokio::test]
async fn allow_list_narrows_the_builtins() {
    let instance = builder(json!({ "load_hooks": ["cors"] })).load().await.unwrap();

    assert_eq!(instance.hooks.active_ids(), ["cors"]);
    assert!(!instance.hooks.is_active("session"));
}

#[tokio::test]
async fn disabled_loading_yields_an_empty_instance() {
    let instance = builder(json!({ "hooks": false })).load().await.unwrap();
    assert!(instance.registry.is_empty());
    assert!(instance.routes.is_empty());
}
