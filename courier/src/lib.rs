//! # courier - In-Process Message Dispatch
//!
//! `courier` routes commands, queries and events to their handlers inside a
//! single process. Handlers of heterogeneous shapes (synchronous,
//! asynchronous, cancellation-aware, with or without a result) are
//! normalized behind one invocation contract; three discovery strategies
//! (startup registration, handler-group method tables, external containers)
//! sit behind one resolver interface.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::{Dispatcher, Command, Query, BoxError};
//!
//! struct Activate { id: u64 }
//! impl Command for Activate {}
//!
//! struct FindName { id: u64 }
//! impl Query for FindName { type Output = String; }
//!
//! let dispatcher = Dispatcher::builder()
//!     .command::<Activate, _, _>(|| |cmd: Activate| async move { Ok(()) })?
//!     .query::<FindName, _, _>(|| |q: FindName| async move { Ok(format!("user-{}", q.id)) })?
//!     .build();
//!
//! dispatcher.dispatch(Activate { id: 7 }).await?;
//! let name = dispatcher.query(FindName { id: 7 }).await?;
//! ```
//!
//! There is no scheduler, queue or persistence here: a dispatch call is one
//! logical in-process call, and event fan-out (concurrent notification of
//! every subscriber) is the only place concurrency arises.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod container;
pub mod dispatch;
pub mod group;
pub mod resolve;
pub mod store;
pub mod testing;

// Re-export the core contracts so `courier` is a one-stop dependency.
pub use courier_core::{
    BoxError, BoxFuture, CancelToken, Cancelled, Command, CommandDelegate, CommandHandler,
    DispatchError, ErasedDelegate, Event, EventDelegate, EventHandler, FanoutError, HandlerShape,
    Message, MessageKey, MessageKind, Query, QueryDelegate, QueryHandler, RegistrationError,
    SubscriberFailure,
};

pub use container::HandlerContainer;
pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use group::{GroupBindings, HandlerGroup, MethodSpec, scan};
pub use resolve::{
    CompositeResolver, ContainerResolver, GroupResolver, Resolver, StoreResolver,
};
pub use store::HandlerStore;

/// Prelude module - common imports for Courier.
///
/// # Usage
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError, CancelToken, Cancelled, Command, CommandHandler, DispatchError, Dispatcher,
        DispatcherBuilder, Event, EventHandler, HandlerGroup, Message, Query, QueryHandler,
        RegistrationError,
    };
}
