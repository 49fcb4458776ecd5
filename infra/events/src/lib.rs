//! # Event Bus
//!
//! Type-keyed publish/subscribe used during a bootstrap run.
//!
//! The orchestrator announces lifecycle milestones on it, and hooks may use it
//! to tell each other about work they finish after their `initialize` call.
//!
//! * **Broadcast** ([`EventBus::publish`]): every subscriber sees every event.
//! * **Latest** ([`EventBus::publish_latest`]): late subscribers still observe
//!   the most recent value, which suits one-shot milestones.
//!
//! # Example
//!
//! ```rust
//! use hooklift_event_bus::{EventBus, EventReceiverExt, EventBusError};
//!
//! #[derive(Debug)]
//! struct SchemaMigrated;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     bus.publish_latest(SchemaMigrated)?;
//!
//!     // Subscribing after the fact still observes the milestone.
//!     let mut rx = bus.watch::<SchemaMigrated>()?;
//!     assert!(rx.next_event().await.is_some());
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{ChannelKind, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
