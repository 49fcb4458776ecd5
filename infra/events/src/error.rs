use std::borrow::Cow;

/// Errors raised by [`crate::EventBus`] operations.
#[hooklift_derive::hooklift_error]
pub enum EventBusError {
    /// The stored sender does not match the requested event type.
    /// Only reachable if the type registry invariant is broken.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The event type is already registered with different delivery semantics.
    #[error("Channel kind mismatch{}: {message}", format_context(.context))]
    ChannelKindMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
