use hooklift::BootstrapError;
use hooklift::kernel::config::StaticConfigSource;
use hooklift_server::Server;
use serde_json::json;

#[tokio::test]
async fn build_loads_the_builtin_hooks() {
    let server = Server::builder()
        .config_source(StaticConfigSource::new(json!({ "load_hooks": ["session", "cors"] })))
        .build()
        .await
        .unwrap();

    assert_eq!(server.instance().hooks.active_ids(), ["cors", "session"]);
}

#[tokio::test]
async fn override_wins_over_the_source() {
    let server = Server::builder()
        .config_source(StaticConfigSource::new(json!({ "host": "localhost" })))
        .config_override(json!({ "host": "example.com", "hooks": false }))
        .build()
        .await
        .unwrap();

    let settings = &server.instance().settings;
    assert_eq!(settings.explicit_host.as_deref(), Some("example.com"));
    assert!(server.instance().registry.is_empty());
}

#[tokio::test]
async fn bootstrap_failure_keeps_its_kind() {
    let err = Server::builder()
        .config_source(StaticConfigSource::new(json!({ "load_hooks": "session" })))
        .build()
        .await
        .unwrap_err();

    let cause = err.downcast_ref::<BootstrapError>().unwrap();
    assert!(matches!(cause, BootstrapError::Config { .. }));
}
