//! # courier-core
//!
//! Core contracts for the Courier message dispatch framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! handler crates and resolver extensions that don't need the full `courier`
//! implementation.
//!
//! # Dispatch Model
//!
//! Courier routes three kinds of in-process messages, each identified by its
//! concrete type:
//!
//! ## Commands ([`Command`])
//!
//! State-changing intents. Exactly one handler per command type; the handler
//! produces no result. Resolving zero handlers is an error.
//!
//! ## Queries ([`Query`])
//!
//! Data requests. Exactly one handler per query type; the handler produces
//! the query's declared `Output`.
//!
//! ## Events ([`Event`])
//!
//! Broadcast facts. Zero or more subscribers per event type; all of them are
//! notified concurrently and independently, and an empty subscriber set is a
//! silent no-op.
//!
//! # The Uniform Calling Convention
//!
//! Handlers come in several method shapes: synchronous, asynchronous, with
//! or without a cancellation parameter. The delegate types
//! ([`CommandDelegate`], [`QueryDelegate`], [`EventDelegate`]) normalize all
//! of them behind one `(message, token) -> future` contract, chosen once at
//! registration and tagged with a [`HandlerShape`]. [`ErasedDelegate`] is the
//! type-erased unit that registries store and resolvers return.
//!
//! # Error Types
//!
//! - [`RegistrationError`] - configuration faults, raised at registration
//! - [`DispatchError`] - faults of a single dispatch call
//! - [`FanoutError`] - composite failure of an event fan-out

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod cancel;
mod delegate;
mod error;
mod handler;
mod message;

// Re-exports
pub use cancel::CancelToken;
pub use delegate::{
    BoxFuture, CommandDelegate, ErasedDelegate, EventDelegate, HandlerShape, QueryDelegate,
};
pub use error::{
    BoxError, Cancelled, DispatchError, FanoutError, RegistrationError, SubscriberFailure,
};
pub use handler::{CommandHandler, EventHandler, QueryHandler};
pub use message::{Command, Event, Message, MessageKey, MessageKind, Query};
