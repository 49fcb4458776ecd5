use hooklift_kernel::prelude::*;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn counted(id: &str, calls: &Arc<AtomicUsize>) -> FnHook {
    let calls = Arc::clone(calls);
    FnHook::new(id, move |ctx| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let id = ctx.id().to_owned();
            Ok(Middleware::new().with("whoami", move |_req: &mut Request| {
                Flow::Respond(Response::ok(json!(id)))
            }))
        }
    })
}

fn bootstrap(settings: Value) -> Bootstrap {
    Bootstrap::new().config_source(StaticConfigSource::new(settings))
}

#[tokio::test(start_paused = true)]
async fn allow_list_leaves_other_hooks_uninitialized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));

    let instance = bootstrap(json!({ "load_hooks": ["a", "b"] }))
        .default_hook(counted("a", &calls))
        .default_hook(counted("b", &calls))
        .default_hook(counted("c", &skipped))
        .load()
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(skipped.load(Ordering::SeqCst), 0);
    assert_eq!(instance.hooks.active_ids(), ["a", "b"]);
    assert!(matches!(
        instance.hooks.get("c"),
        Some(HookState::Disabled { reason: DisableReason::NotAllowListed, definition: Some(_) })
    ));
    assert_eq!(instance.registry.namespaces().collect::<Vec<_>>(), ["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn malformed_allow_list_fails_before_any_hook_runs() {
    let calls = Arc::new(AtomicUsize::new(0));

    let err = bootstrap(json!({ "load_hooks": "a" }))
        .default_hook(counted("a", &calls))
        .load()
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Config { .. }));
    assert!(err.to_string().contains("\"a\""), "{err}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn load_waits_for_deferred_readiness() {
    let slow = FnHook::new("b", |ctx| async move {
        let ready = ctx.defer_readiness();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ready.signal();
        });
        Ok(Middleware::new().with("noop", |_req: &mut Request| Flow::Next))
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let started = Instant::now();
    let instance = bootstrap(json!({}))
        .default_hook(counted("a", &calls))
        .default_hook(slow)
        .load()
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(instance.registry.namespaces().collect::<Vec<_>>(), ["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn stalled_hook_trips_the_watchdog() {
    let stalled = FnHook::new("stalled", |ctx| async move {
        let _never_signaled = ctx.defer_readiness();
        Ok(Middleware::new())
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let started = Instant::now();
    let err = bootstrap(json!({ "readiness": { "poll_interval_ms": 25, "timeout_ms": 300 } }))
        .default_hook(counted("healthy", &calls))
        .default_hook(stalled)
        .load()
        .await
        .unwrap_err();

    assert!(err.is_readiness_timeout());
    assert_eq!(err.pending_hooks(), ["stalled"]);
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn initialize_that_never_returns_is_reported_as_pending() {
    let hung = FnHook::new("hung", |_ctx| async {
        std::future::pending::<()>().await;
        Ok(Middleware::new())
    });

    let err = bootstrap(json!({ "readiness": { "timeout_ms": 100 } }))
        .default_hook(hung)
        .load()
        .await
        .unwrap_err();

    assert_eq!(err.pending_hooks(), ["hung"]);
}

#[tokio::test(start_paused = true)]
async fn disabled_loading_skips_hooks_and_barrier() {
    let calls = Arc::new(AtomicUsize::new(0));
    let stalled = FnHook::new("stalled", |ctx| async move {
        let _never_signaled = ctx.defer_readiness();
        Ok(Middleware::new())
    });

    let instance = bootstrap(json!({ "hooks": false, "readiness": { "timeout_ms": 10 } }))
        .default_hook(counted("a", &calls))
        .default_hook(stalled)
        .load()
        .await
        .unwrap();

    assert!(instance.hooks.is_empty());
    assert!(instance.registry.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn host_override_is_recorded_as_explicit_host() {
    let instance = bootstrap(json!({ "host": "localhost" }))
        .config_override(json!({ "host": "example.com" }))
        .load()
        .await
        .unwrap();

    assert_eq!(instance.settings.host.as_deref(), Some("example.com"));
    assert_eq!(instance.settings.explicit_host.as_deref(), Some("example.com"));
}

#[tokio::test]
async fn first_failure_aborts_the_load_and_names_the_hook() {
    let broken = FnHook::new("broken", |_ctx| async { Err(HookError::failed("no database")) });
    let calls = Arc::new(AtomicUsize::new(0));

    let err = bootstrap(json!({}))
        .default_hook(counted("fine", &calls))
        .default_hook(broken)
        .load()
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::HookInit { .. }));
    let message = err.to_string();
    assert!(message.contains("hook `broken`"), "{message}");
    assert!(message.contains("no database"), "{message}");
}

#[tokio::test(start_paused = true)]
async fn dependent_hook_starts_after_its_dependency_is_ready() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&order);
    let session = FnHook::new("session", move |ctx| {
        let log = Arc::clone(&log);
        async move {
            let ready = ctx.defer_readiness();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                log.lock().push("session ready");
                ready.signal();
            });
            Ok(Middleware::new())
        }
    });

    let log = Arc::clone(&order);
    let policies = FnHook::new("policies", move |_ctx| {
        let log = Arc::clone(&log);
        async move {
            log.lock().push("policies initialize");
            Ok(Middleware::new())
        }
    })
    .after(&["session"]);

    bootstrap(json!({})).default_hook(policies).default_hook(session).load().await.unwrap();

    assert_eq!(*order.lock(), ["session ready", "policies initialize"]);
}

#[tokio::test]
async fn hooks_table_disables_and_configures() {
    let seen = Arc::new(Mutex::new(Value::Null));
    let sink = Arc::clone(&seen);
    let cors = FnHook::new("cors", move |ctx| {
        let sink = Arc::clone(&sink);
        async move {
            *sink.lock() = ctx.options().clone();
            Ok(Middleware::new())
        }
    });
    let calls = Arc::new(AtomicUsize::new(0));

    let instance = bootstrap(json!({
        "hooks": { "session": false, "cors": { "allow_origin": "*" } }
    }))
    .default_hook(counted("session", &calls))
    .default_hook(cors)
    .load()
    .await
    .unwrap();

    assert_eq!(instance.hooks.active_ids(), ["cors"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*seen.lock(), json!({ "allow_origin": "*" }));
}

#[tokio::test]
async fn override_replaces_default_and_builder_can_disable() {
    let defaults = Arc::new(AtomicUsize::new(0));
    let replacements = Arc::new(AtomicUsize::new(0));

    let instance = bootstrap(json!({}))
        .default_hook(counted("a", &defaults))
        .default_hook(counted("b", &defaults))
        .hook(counted("a", &replacements))
        .disable("b")
        .load()
        .await
        .unwrap();

    assert_eq!(defaults.load(Ordering::SeqCst), 0);
    assert_eq!(replacements.load(Ordering::SeqCst), 1);
    assert_eq!(instance.hooks.active_ids(), ["a"]);
}

#[tokio::test]
async fn routes_dispatch_through_the_registry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = FnHook::new("gate", |_ctx| async {
        Ok(Middleware::new()
            .with("tag", |req: &mut Request| {
                req.response_headers.insert("x-gate".to_owned(), "passed".to_owned());
                Flow::Next
            })
            .with("deny", |_req: &mut Request| Flow::Respond(Response::error(403, "denied"))))
    });

    let instance = bootstrap(json!({
        "routes": {
            "GET /me": ["gate.tag", "me.whoami"],
            "POST /admin": ["gate.deny", "me.whoami"],
            "GET /ping": ["gate.tag"]
        }
    }))
    .default_hook(gate)
    .default_hook(counted("me", &calls))
    .load()
    .await
    .unwrap();

    let response = instance.routes.dispatch(&mut Request::new("get", "/me"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!("me"));
    assert_eq!(response.headers.get("x-gate").map(String::as_str), Some("passed"));

    assert_eq!(instance.routes.dispatch(&mut Request::new("POST", "/admin")).status, 403);
    assert_eq!(instance.routes.dispatch(&mut Request::new("GET", "/ping")).status, 204);
    assert_eq!(instance.routes.dispatch(&mut Request::new("GET", "/nope")).status, 404);
}

#[tokio::test]
async fn route_to_unknown_handler_fails_the_load() {
    let err = bootstrap(json!({ "routes": { "GET /me": ["ghost.handler"] } }))
        .load()
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Routing { .. }));
    assert!(err.to_string().contains("ghost.handler"), "{err}");
}

#[tokio::test]
async fn lifecycle_signals_and_expose_follow_a_successful_load() {
    let calls = Arc::new(AtomicUsize::new(0));
    let exposed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&exposed);

    let builder = bootstrap(json!({})).default_hook(counted("a", &calls)).expose(
        move |instance: &Instance| {
            assert_eq!(instance.registry.len(), 1);
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );
    let events = builder.events();
    let mut hook_ready = events.subscribe::<HookReady>().unwrap();

    let instance = builder.load().await.unwrap();

    assert_eq!(exposed.load(Ordering::SeqCst), 1);
    assert_eq!(hook_ready.next_event().await.unwrap().id, "a");
    assert_eq!(events.latest::<HooksInitialized>().unwrap().hooks, ["a"]);
    assert_eq!(events.latest::<RegistryPopulated>().unwrap().namespaces, ["a"]);
    assert_eq!(instance.events.latest::<Ready>().unwrap().hooks, ["a"]);
}

#[tokio::test]
async fn failed_load_does_not_expose() {
    let exposed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&exposed);

    let result = bootstrap(json!({ "load_hooks": 7 }))
        .expose(move |_instance: &Instance| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .load()
        .await;

    assert!(result.is_err());
    assert_eq!(exposed.load(Ordering::SeqCst), 0);
}

async fn settle_alive_tasks(expected: usize) -> usize {
    let metrics = tokio::runtime::Handle::current().metrics();
    for _ in 0..16 {
        if metrics.num_alive_tasks() == expected {
            break;
        }
        tokio::task::yield_now().await;
    }
    metrics.num_alive_tasks()
}

#[tokio::test]
async fn failed_load_releases_hooks_waiting_on_dependencies() {
    let before = tokio::runtime::Handle::current().metrics().num_alive_tasks();

    for _ in 0..20 {
        let base = FnHook::new("base", |_ctx| async { Err(HookError::failed("base is down")) });
        let dependent =
            FnHook::new("dependent", |_ctx| async { Ok(Middleware::new()) }).after(&["base"]);

        let err = bootstrap(json!({}))
            .default_hook(base)
            .default_hook(dependent)
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::HookInit { .. }));
    }

    assert_eq!(settle_alive_tasks(before).await, before);
}

#[tokio::test(start_paused = true)]
async fn timed_out_load_releases_hooks_waiting_on_dependencies() {
    let before = tokio::runtime::Handle::current().metrics().num_alive_tasks();

    for _ in 0..5 {
        let stalled = FnHook::new("stalled", |ctx| async move {
            let _never_signaled = ctx.defer_readiness();
            Ok(Middleware::new())
        });
        let dependent =
            FnHook::new("dependent", |_ctx| async { Ok(Middleware::new()) }).after(&["stalled"]);

        let err = bootstrap(json!({ "readiness": { "timeout_ms": 50 } }))
            .default_hook(stalled)
            .default_hook(dependent)
            .load()
            .await
            .unwrap_err();
        assert_eq!(err.pending_hooks(), ["dependent", "stalled"]);
    }

    assert_eq!(settle_alive_tasks(before).await, before);
}

#[tokio::test(start_paused = true)]
async fn load_publishes_phase_milestones_in_order() {
    let initialized_at = Arc::new(Mutex::new(None));
    let exposed_at = Arc::new(Mutex::new(None));

    let stamp = Arc::clone(&initialized_at);
    let slow = FnHook::new("slow", move |ctx| {
        let stamp = Arc::clone(&stamp);
        async move {
            *stamp.lock() = Some(Instant::now());
            let ready = ctx.defer_readiness();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                ready.signal();
            });
            Ok(Middleware::new().with("noop", |_req: &mut Request| Flow::Next))
        }
    });

    let stamp = Arc::clone(&exposed_at);
    let builder = bootstrap(json!({ "routes": { "GET /": ["slow.noop"] } }))
        .default_hook(slow)
        .expose(move |instance: &Instance| {
            assert_eq!(instance.routes.len(), 1);
            assert!(instance.events.latest::<RegistryPopulated>().is_some());
            *stamp.lock() = Some(Instant::now());
        });

    let events = builder.events();
    let mut hooks_rx = events.watch::<HooksInitialized>().unwrap();
    let mut registry_rx = events.watch::<RegistryPopulated>().unwrap();
    let hooks_seen = tokio::spawn(async move {
        hooks_rx.wait_for(Option::is_some).await.unwrap();
        Instant::now()
    });
    let registry_seen = tokio::spawn(async move {
        registry_rx.wait_for(Option::is_some).await.unwrap();
        Instant::now()
    });

    let started = Instant::now();
    builder.load().await.unwrap();

    let initialized_at = initialized_at.lock().unwrap();
    let hooks_seen = hooks_seen.await.unwrap();
    let registry_seen = registry_seen.await.unwrap();
    let exposed_at = exposed_at.lock().unwrap();

    assert!(initialized_at <= hooks_seen);
    assert!(hooks_seen < registry_seen, "registry must wait for the deferred hook");
    assert!(registry_seen - started >= Duration::from_millis(40));
    assert!(registry_seen <= exposed_at);
}
