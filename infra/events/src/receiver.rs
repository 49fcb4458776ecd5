use crate::bus::Event;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Uniform "wait for the next event" over the bus receiver kinds.
pub trait EventReceiverExt<T> {
    /// Resolves with the next event, or `None` once the bus is shut down.
    ///
    /// Broadcast receivers that fell behind skip to the oldest retained event
    /// instead of failing.
    fn next_event(&mut self) -> impl Future<Output = Option<Arc<T>>> + Send;
}

impl<T: Event> EventReceiverExt<T> for broadcast::Receiver<Arc<T>> {
    async fn next_event(&mut self) -> Option<Arc<T>> {
        loop {
            match self.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(event = std::any::type_name::<T>(), skipped, "Event receiver lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl<T: Event> EventReceiverExt<T> for watch::Receiver<Option<Arc<T>>> {
    async fn next_event(&mut self) -> Option<Arc<T>> {
        self.wait_for(Option::is_some).await.ok().and_then(|value| value.clone())
    }
}
