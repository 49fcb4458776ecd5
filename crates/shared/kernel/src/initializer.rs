//! Concurrent initialization of every active hook.

use crate::error::BootstrapError;
use crate::hook::{HookContext, HookError};
use crate::middleware::Middleware;
use crate::readiness::{self, ReadinessBarrier, ReadinessLatch};
use crate::resolver::HookSet;
use hooklift_domain::settings::Settings;
use hooklift_domain::signals::HooksInitialized;
use hooklift_event_bus::EventBus;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::{AbortHandle, Id, JoinSet};
use tokio::time::timeout_at;
use tracing::{debug, error, info, warn};

/// Outcome of the hooks phase, consumed by the registry phase.
#[derive(Debug)]
pub struct Initialized {
    pub hooks: HookSet,
    /// Middleware of every active hook, in hook-set order.
    pub middleware: Vec<(String, Middleware)>,
    pub latch: ReadinessLatch,
    /// Watchdog shared with the readiness barrier.
    pub barrier: ReadinessBarrier,
}

/// Starts `initialize` on every active hook at once and collects their middleware.
///
/// A hook waits for the readiness of the hooks it depends on before its own
/// `initialize` is called; there is no other ordering between hooks. The
/// first failure aborts the phase. Hooks already inside `initialize` are
/// detached, not cancelled; tasks still waiting on a dependency are aborted.
/// The watchdog of `barrier` also bounds this phase, so a hook whose
/// `initialize` never returns is reported like one that never becomes ready.
///
/// # Errors
/// * [`BootstrapError::Config`] / [`BootstrapError::Graph`] for broken dependency declarations.
/// * [`BootstrapError::HookInit`] for the first hook that fails.
/// * [`BootstrapError::ReadinessTimeout`] when the watchdog fires first.
pub async fn initialize_all(
    hooks: HookSet,
    settings: Arc<Settings>,
    events: EventBus,
    barrier: ReadinessBarrier,
) -> Result<Initialized, BootstrapError> {
    let order = hooks.dependency_order()?;
    debug!(order = ?order, "Hook dependency order");

    let latch = ReadinessLatch::new(hooks.active_ids(), events.clone());
    let mut set = JoinSet::new();
    let mut running: BTreeMap<Id, Pending> = BTreeMap::new();

    for (id, hook) in hooks.active() {
        let Some(ready) = latch.handle(id) else {
            return Err(BootstrapError::from(format!("hook `{id}` has no readiness slot")));
        };
        let ctx = HookContext::new(id, Arc::clone(&settings), events.clone(), ready);
        let hook = Arc::clone(hook);
        let latch = latch.clone();
        let label = id.to_owned();
        let started = Arc::new(AtomicBool::new(false));
        let entered = Arc::clone(&started);

        let handle = set.spawn(async move {
            for &dep in hook.depends_on() {
                if !latch.wait(dep).await {
                    return (label, Err(HookError::from(format!("dependency `{dep}` went away"))));
                }
            }

            entered.store(true, Ordering::Release);
            debug!(hook = %label, "Initializing hook");
            let outcome = hook.initialize(ctx.clone()).await;
            if outcome.is_ok() && !ctx.is_deferred() {
                ctx.ready_handle().signal();
            }
            (label, outcome)
        });
        running.insert(handle.id(), Pending { id: id.to_owned(), started, abort: handle });
    }

    let mut middleware: BTreeMap<String, Middleware> = BTreeMap::new();
    loop {
        let joined = match timeout_at(barrier.deadline(), set.join_next_with_id()).await {
            Ok(Some(joined)) => joined,
            Ok(None) => break,
            Err(_) => {
                abandon(&mut set, &running);
                return Err(readiness::timeout(latch.pending()));
            },
        };

        let (id, outcome) = match joined {
            Ok((task, (id, outcome))) => {
                running.remove(&task);
                (id, outcome)
            },
            Err(err) => {
                let id = running.remove(&err.id()).map(|task| task.id).unwrap_or_default();
                (id, Err(HookError::from(format!("initialize panicked: {err}"))))
            },
        };

        match outcome {
            Ok(exposed) => {
                debug!(hook = %id, handlers = exposed.len(), "Hook initialized");
                middleware.insert(id, exposed);
            },
            Err(source) => {
                error!(hook = %id, error = %source, "Hook initialization failed");
                abandon(&mut set, &running);
                return Err(BootstrapError::HookInit {
                    source,
                    context: Some(format!("hook `{id}`").into()),
                });
            },
        }
    }

    let ids = hooks.active_ids();
    info!(hooks = ?ids, "Hooks initialized");
    if let Err(err) = events.publish_latest(HooksInitialized { hooks: ids.clone() }) {
        warn!(error = %err, "Failed to publish hooks initialized signal");
    }

    let middleware = ids.into_iter().filter_map(|id| middleware.remove_entry(&id)).collect();
    Ok(Initialized { hooks, middleware, latch, barrier })
}

/// A spawned hook task that has not reported back yet.
struct Pending {
    id: String,
    /// Set once the task is past its dependencies and inside `initialize`.
    started: Arc<AtomicBool>,
    abort: AbortHandle,
}

/// Gives up on every unfinished task of a failed phase.
///
/// Tasks still parked on a dependency never reached hook code and are
/// aborted. Tasks inside `initialize` are left to finish on their own.
fn abandon(
    set: &mut JoinSet<(String, Result<Middleware, HookError>)>,
    running: &BTreeMap<Id, Pending>,
) {
    let (entered, waiting): (Vec<&Pending>, Vec<&Pending>) =
        running.values().partition(|task| task.started.load(Ordering::Acquire));

    for task in &waiting {
        debug!(hook = %task.id, "Aborting hook still waiting on its dependencies");
        task.abort.abort();
    }
    if !entered.is_empty() {
        let ids: Vec<&str> = entered.iter().map(|task| task.id.as_str()).collect();
        warn!(hooks = ?ids, "Detaching unfinished hooks");
    }
    set.detach_all();
}
