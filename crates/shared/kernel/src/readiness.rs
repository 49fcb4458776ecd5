//! Readiness latch and the barrier that waits on it.
//!
//! Every active hook owns one slot in a [`ReadinessLatch`]. A slot flips to
//! ready exactly once, through a [`ReadyHandle`]. The [`ReadinessBarrier`]
//! resolves the moment the last slot flips, or fails with
//! [`BootstrapError::ReadinessTimeout`] once the watchdog deadline passes.

use crate::error::BootstrapError;
use hooklift_domain::settings::ReadinessSettings;
use hooklift_domain::signals::HookReady;
use hooklift_event_bus::EventBus;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, trace, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One-shot readiness slots keyed by hook id.
#[derive(Debug, Clone)]
pub struct ReadinessLatch {
    slots: Arc<BTreeMap<String, watch::Sender<bool>>>,
    events: EventBus,
}

impl ReadinessLatch {
    pub fn new<I, S>(ids: I, events: EventBus) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = ids.into_iter().map(|id| (id.into(), watch::channel(false).0)).collect();
        Self { slots: Arc::new(slots), events }
    }

    /// Handle that marks `id` ready; `None` when `id` has no slot.
    #[must_use]
    pub fn handle(&self, id: &str) -> Option<ReadyHandle> {
        let (id, tx) = self.slots.get_key_value(id)?;
        Some(ReadyHandle { id: id.as_str().into(), tx: tx.clone(), events: self.events.clone() })
    }

    #[must_use]
    pub fn is_ready(&self, id: &str) -> bool {
        self.slots.get(id).is_some_and(|tx| *tx.borrow())
    }

    /// Ids that have not signaled yet, in id order.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.slots.iter().filter(|(_, tx)| !*tx.borrow()).map(|(id, _)| id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Waits until `id` is ready. Returns `false` if `id` has no slot.
    pub async fn wait(&self, id: &str) -> bool {
        let Some(tx) = self.slots.get(id) else {
            return false;
        };
        let mut rx = tx.subscribe();
        rx.wait_for(|ready| *ready).await.is_ok()
    }

    /// Waits until every slot is ready.
    pub async fn wait_all(&self) {
        for tx in self.slots.values() {
            let mut rx = tx.subscribe();
            // The latch owns every sender, so the channel cannot close under us.
            if rx.wait_for(|ready| *ready).await.is_err() {
                return;
            }
        }
    }
}

/// Marks one hook ready. Cloning is cheap; only the first signal counts.
#[derive(Clone)]
pub struct ReadyHandle {
    id: Arc<str>,
    tx: watch::Sender<bool>,
    events: EventBus,
}

impl ReadyHandle {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Flips the slot to ready and broadcasts [`HookReady`]. Repeated calls are no-ops.
    pub fn signal(self) {
        let flipped = self.tx.send_if_modified(|ready| !std::mem::replace(ready, true));
        if !flipped {
            trace!(hook = %self.id, "Readiness already signaled");
            return;
        }

        debug!(hook = %self.id, "Hook signaled readiness");
        if let Err(err) = self.events.publish(HookReady { id: self.id.to_string() }) {
            warn!(hook = %self.id, error = %err, "Failed to broadcast readiness");
        }
    }
}

impl fmt::Debug for ReadyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyHandle")
            .field("id", &self.id)
            .field("ready", &*self.tx.borrow())
            .finish()
    }
}

/// Waits for a [`ReadinessLatch`] to drain, bounded by a watchdog deadline.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessBarrier {
    poll_interval: Duration,
    deadline: Instant,
}

impl ReadinessBarrier {
    /// Barrier whose deadline is `settings.timeout_ms` from now.
    #[must_use]
    pub fn start(settings: &ReadinessSettings) -> Self {
        Self::with_deadline(settings.poll_interval(), Instant::now() + settings.timeout())
    }

    #[must_use]
    pub fn with_deadline(poll_interval: Duration, deadline: Instant) -> Self {
        Self { poll_interval: poll_interval.max(MIN_POLL_INTERVAL), deadline }
    }

    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Resolves once every slot of `latch` is ready.
    ///
    /// Still-pending hooks are logged every poll interval.
    ///
    /// # Errors
    /// Returns [`BootstrapError::ReadinessTimeout`] naming the pending hooks once
    /// the deadline passes.
    pub async fn wait(&self, latch: &ReadinessLatch) -> Result<(), BootstrapError> {
        let started = Instant::now();
        let all_ready = latch.wait_all();
        let watchdog = sleep_until(self.deadline);
        let mut ticker = interval_at(started + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(all_ready, watchdog);

        loop {
            tokio::select! {
                biased;

                () = &mut all_ready => {
                    info!(
                        hooks = latch.len(),
                        elapsed_ms = elapsed_ms(started),
                        "Every hook signaled readiness"
                    );
                    return Ok(());
                }
                () = &mut watchdog => {
                    return Err(timeout(latch.pending()));
                }
                _ = ticker.tick() => {
                    debug!(pending = ?latch.pending(), "Waiting for hooks to signal readiness");
                }
            }
        }
    }
}

pub(crate) fn timeout(pending: Vec<String>) -> BootstrapError {
    warn!(pending = ?pending, "Readiness watchdog fired");
    BootstrapError::ReadinessTimeout {
        message: format!("hooks never signaled readiness: {}", pending.join(", ")).into(),
        pending,
        context: None,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latch(ids: &[&str]) -> ReadinessLatch {
        ReadinessLatch::new(ids.iter().copied(), EventBus::new())
    }

    #[test]
    fn new_slots_are_pending() {
        let latch = latch(&["b", "a"]);
        assert_eq!(latch.pending(), ["a", "b"]);
        assert!(!latch.is_ready("a"));
        assert!(latch.handle("missing").is_none());
    }

    #[test]
    fn signal_is_one_shot() {
        let latch = latch(&["a"]);
        let handle = latch.handle("a").unwrap();
        handle.clone().signal();
        handle.signal();
        assert!(latch.is_ready("a"));
        assert!(latch.pending().is_empty());
    }

    #[tokio::test]
    async fn signal_broadcasts_hook_ready() {
        let latch = latch(&["a"]);
        let mut rx = latch.events.subscribe::<HookReady>().unwrap();
        latch.handle("a").unwrap().signal();
        assert_eq!(rx.recv().await.unwrap().id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn barrier_waits_for_the_slowest_hook() {
        let latch = latch(&["fast", "slow"]);
        latch.handle("fast").unwrap().signal();

        let slow = latch.handle("slow").unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            slow.signal();
        });

        let started = Instant::now();
        let barrier = ReadinessBarrier::start(&ReadinessSettings::default());
        barrier.wait(&latch).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn barrier_names_stalled_hooks() {
        let latch = latch(&["stalled", "done"]);
        latch.handle("done").unwrap().signal();

        let settings = ReadinessSettings { poll_interval_ms: 10, timeout_ms: 200 };
        let err = ReadinessBarrier::start(&settings).wait(&latch).await.unwrap_err();
        assert!(err.is_readiness_timeout());
        assert_eq!(err.pending_hooks(), ["stalled"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_latch_passes_immediately() {
        let settings = ReadinessSettings { poll_interval_ms: 0, timeout_ms: 0 };
        ReadinessBarrier::start(&settings).wait(&latch(&[])).await.unwrap();
    }
}
