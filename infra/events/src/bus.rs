use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{trace, warn};

/// Buffer size for broadcast channels created on first use.
const DEFAULT_CAPACITY: usize = 64;

/// Marker trait for types that can travel over the [`EventBus`].
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

/// Delivery semantics of a registered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Every subscriber sees every event published after it subscribed.
    Broadcast { capacity: usize },
    /// Subscribers only see the most recent value, including one published
    /// before they subscribed.
    Latest,
}

#[derive(Debug)]
struct Channel {
    kind: ChannelKind,
    sender: Box<dyn Any + Send + Sync>,
}

impl Channel {
    fn broadcast<T: Event>(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
        Self { kind: ChannelKind::Broadcast { capacity }, sender: Box::new(tx) }
    }

    fn latest<T: Event>() -> Self {
        let (tx, _) = watch::channel::<Option<Arc<T>>>(None);
        Self { kind: ChannelKind::Latest, sender: Box::new(tx) }
    }

    fn broadcast_sender<T: Event>(&self) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        match self.kind {
            ChannelKind::Broadcast { .. } => self
                .sender
                .downcast_ref::<broadcast::Sender<Arc<T>>>()
                .cloned()
                .ok_or_else(type_mismatch::<T>),
            ChannelKind::Latest => Err(kind_mismatch::<T>(self.kind, "broadcast")),
        }
    }

    fn latest_sender<T: Event>(&self) -> Result<watch::Sender<Option<Arc<T>>>, EventBusError> {
        match self.kind {
            ChannelKind::Latest => self
                .sender
                .downcast_ref::<watch::Sender<Option<Arc<T>>>>()
                .cloned()
                .ok_or_else(type_mismatch::<T>),
            ChannelKind::Broadcast { .. } => Err(kind_mismatch::<T>(self.kind, "latest")),
        }
    }
}

/// Type-keyed publish/subscribe bus.
///
/// One bus is created per bootstrap run and handed to every hook, so hooks can
/// announce milestones to each other and observers can follow the lifecycle
/// signals. Channels are created lazily the first time an event type is used.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, Channel>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every future `T` published with [`EventBus::publish`].
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is already used as a
    /// latest-value channel.
    ///
    /// # Examples
    /// ```rust
    /// use hooklift_event_bus::{EventBus, EventReceiverExt};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct CacheWarm(u32);
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), hooklift_event_bus::EventBusError> {
    /// let bus = EventBus::new();
    /// let mut rx = bus.subscribe::<CacheWarm>()?;
    /// bus.publish(CacheWarm(3))?;
    /// assert_eq!(rx.next_event().await.unwrap().0, 3);
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        self.with_channel::<T, _>(
            || Channel::broadcast::<T>(DEFAULT_CAPACITY),
            Channel::broadcast_sender::<T>,
        )
        .map(|tx| tx.subscribe())
    }

    /// Broadcasts `event` and returns the number of subscribers that received it.
    ///
    /// Publishing without subscribers is not an error; the event is dropped.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is already used as a
    /// latest-value channel.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        let tx = self.with_channel::<T, _>(
            || Channel::broadcast::<T>(DEFAULT_CAPACITY),
            Channel::broadcast_sender::<T>,
        )?;

        tx.send(Arc::new(event)).map_or_else(
            |_| {
                trace!(event = type_name::<T>(), "Event dropped: no active subscribers");
                Ok(0)
            },
            |count| {
                trace!(event = type_name::<T>(), count, "Event dispatched");
                Ok(count)
            },
        )
    }

    /// Stores `event` as the latest value of `T` and wakes every watcher.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is already used as a
    /// broadcast channel.
    pub fn publish_latest<T: Event>(&self, event: T) -> Result<(), EventBusError> {
        let tx = self.with_channel::<T, _>(Channel::latest::<T>, Channel::latest_sender::<T>)?;
        tx.send_replace(Some(Arc::new(event)));
        trace!(event = type_name::<T>(), "Latest value replaced");
        Ok(())
    }

    /// Watches the latest value of `T`; the receiver holds `None` until the first publish.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is already used as a
    /// broadcast channel.
    pub fn watch<T: Event>(&self) -> Result<watch::Receiver<Option<Arc<T>>>, EventBusError> {
        self.with_channel::<T, _>(Channel::latest::<T>, Channel::latest_sender::<T>)
            .map(|tx| tx.subscribe())
    }

    /// Returns the latest value of `T`, if one was published.
    #[must_use]
    pub fn latest<T: Event>(&self) -> Option<Arc<T>> {
        let channels = self.channels.read();
        channels
            .get(&TypeId::of::<T>())?
            .sender
            .downcast_ref::<watch::Sender<Option<Arc<T>>>>()
            .and_then(|tx| tx.borrow().clone())
    }

    /// Drops every channel, closing all receivers. Returns how many were closed.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        let mut channels = self.channels.write();
        let closed = channels.len();
        channels.clear();
        closed
    }

    fn with_channel<T: Event, S>(
        &self,
        create: impl FnOnce() -> Channel,
        sender: impl Fn(&Channel) -> Result<S, EventBusError>,
    ) -> Result<S, EventBusError> {
        let id = TypeId::of::<T>();

        if let Some(channel) = self.channels.read().get(&id) {
            return sender(channel);
        }

        let mut channels = self.channels.write();
        let channel = channels.entry(id).or_insert_with(|| {
            let channel = create();
            trace!(event = type_name::<T>(), kind = ?channel.kind, "Initializing event channel");
            channel
        });
        sender(channel).inspect_err(|err| {
            warn!(event = type_name::<T>(), error = %err, "Event channel rejected request");
        })
    }
}

fn type_mismatch<T: Event>() -> EventBusError {
    EventBusError::TypeMismatch { message: type_name::<T>().into(), context: None }
}

fn kind_mismatch<T: Event>(existing: ChannelKind, requested: &'static str) -> EventBusError {
    EventBusError::ChannelKindMismatch {
        message: format!("{} is registered as {existing:?}, not {requested}", type_name::<T>())
            .into(),
        context: None,
    }
}
