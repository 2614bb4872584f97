//! Error types for Courier.
//!
//! The taxonomy splits along the two phases of the dispatcher's life:
//!
//! - [`RegistrationError`] - configuration faults, raised while the registry
//!   is being built, never deferred to dispatch time
//! - [`DispatchError`] - faults of a single dispatch call
//! - [`FanoutError`] - composite failure of an event fan-out
//!
//! Command and query handler failures pass through [`DispatchError::Handler`]
//! transparently: the caller sees the true error, unwrapped. Nothing in the
//! core logs-and-suppresses, and nothing retries.

use thiserror::Error;

use crate::delegate::HandlerShape;
use crate::message::{MessageKey, MessageKind};

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration faults raised while handlers are being registered.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// A second handler was registered for a single-handler message key.
    /// Duplicates are rejected, never overwritten.
    #[error("a handler is already registered for {0}")]
    DuplicateHandler(MessageKey),

    /// A method's kind marker disagrees with the delegate it binds, e.g. a
    /// query marker on a method that produces no result.
    #[error("method `{method}` is marked as a {marked} handler but binds a {bound} delegate")]
    InvalidSignature {
        /// Name of the offending method.
        method: &'static str,
        /// The kind the method was marked with.
        marked: MessageKind,
        /// The kind of the delegate it actually binds.
        bound: MessageKind,
    },

    /// A method's declared shape is not the shape its delegate was adapted
    /// with.
    #[error("method `{method}` declares the {declared} shape but was adapted as {adapted}")]
    UnsupportedShape {
        /// Name of the offending method.
        method: &'static str,
        /// The shape the method claims.
        declared: HandlerShape,
        /// The shape the adapter produced.
        adapted: HandlerShape,
    },
}

/// Faults of a single dispatch call.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Single-handler resolution found zero candidates.
    #[error("no handler resolved for {0}")]
    NoHandler(MessageKey),

    /// A resolver failed while looking up handlers.
    #[error("handler lookup failed for {key}")]
    Resolver {
        /// The key being resolved.
        key: MessageKey,
        /// The underlying lookup failure.
        #[source]
        source: BoxError,
    },

    /// A resolver produced a delegate for a different message type. Only a
    /// misbehaving container can cause this.
    #[error("resolved delegate for {0} does not match the message type")]
    DelegateMismatch(MessageKey),

    /// The resolved command or query handler failed. The underlying error is
    /// surfaced unwrapped.
    #[error(transparent)]
    Handler(BoxError),

    /// One or more event subscribers failed after the fan-out completed.
    #[error(transparent)]
    Fanout(#[from] FanoutError),
}

/// Composite failure of an event fan-out.
///
/// Fan-out is fail-independent: every subscriber runs to completion before
/// failures are gathered, so one failing subscriber never prevents the others
/// from being notified.
#[derive(Error, Debug)]
#[error("{} of {invoked} subscriber(s) failed for {key}", .failures.len())]
pub struct FanoutError {
    /// Key of the published event.
    pub key: MessageKey,
    /// How many subscribers were invoked.
    pub invoked: usize,
    /// The failures, in resolution order.
    pub failures: Vec<SubscriberFailure>,
}

/// A single subscriber's failure within a fan-out.
#[derive(Debug)]
pub struct SubscriberFailure {
    /// Position of the subscriber in resolution order.
    pub index: usize,
    /// The error it returned.
    pub error: BoxError,
}

/// The explicit result value for handlers that honor the advisory
/// [`CancelToken`].
///
/// [`CancelToken`]: crate::CancelToken
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;
