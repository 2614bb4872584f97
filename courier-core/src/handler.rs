//! Handler traits for the three message kinds.
//!
//! These are the "full" handler signatures: asynchronous, receiving the
//! advisory [`CancelToken`]. Narrower method shapes (synchronous, or
//! asynchronous without a token) are adapted through the constructors on the
//! delegate types instead of through these traits.
//!
//! Closures of the form `|msg| async move { .. }` implement the command and
//! query traits directly via the blanket impls; the token is ignored.

use std::future::Future;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::BoxError;
use crate::message::{Command, Event, Query};

/// Handles a command. Exactly one implementation may be registered per
/// command type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle commands of type `{C}`",
    label = "missing `CommandHandler<{C}>` implementation"
)]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Execute the command. The token is advisory; implementations are free
    /// to ignore it.
    fn handle(
        &self,
        command: C,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<F, C, Fut> CommandHandler<C> for F
where
    C: Command,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn handle(
        &self,
        command: C,
        _cancel: CancelToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(command)
    }
}

/// Handles a query and produces its declared result. Exactly one
/// implementation may be registered per query type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle queries of type `{Q}`",
    label = "missing `QueryHandler<{Q}>` implementation"
)]
pub trait QueryHandler<Q: Query>: Send + Sync {
    /// Execute the query.
    fn handle(
        &self,
        query: Q,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<Q::Output, BoxError>> + Send;
}

impl<F, Q, Fut> QueryHandler<Q> for F
where
    Q: Query,
    F: Fn(Q) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Q::Output, BoxError>> + Send,
{
    fn handle(
        &self,
        query: Q,
        _cancel: CancelToken,
    ) -> impl Future<Output = Result<Q::Output, BoxError>> + Send {
        (self)(query)
    }
}

/// Subscribes to an event. Any number of subscribers may be registered per
/// event type; all of them observe the same instance.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot subscribe to events of type `{E}`",
    label = "missing `EventHandler<{E}>` implementation"
)]
pub trait EventHandler<E: Event>: Send + Sync {
    /// React to the event.
    fn handle(
        &self,
        event: Arc<E>,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<F, E, Fut> EventHandler<E> for F
where
    E: Event,
    F: Fn(Arc<E>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn handle(
        &self,
        event: Arc<E>,
        _cancel: CancelToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(event)
    }
}
