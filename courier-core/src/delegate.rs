//! Uniform invocation delegates and the shape adapters that build them.
//!
//! A delegate is the single calling convention every handler is normalized
//! into: `(message, token) -> boxed future`. The adapters accept the
//! supported method shapes (synchronous, asynchronous, asynchronous with a
//! cancellation parameter) and close over a zero-argument handler factory.
//! The factory runs exactly once per invocation; instance caching, if wanted,
//! is the factory's business.
//!
//! A synchronous method runs inline to completion while the delegate is being
//! invoked, before the returned future is first polled. Cancellation
//! signalled after the call has entered such a method has no effect on that
//! invocation.
//!
//! [`ErasedDelegate`] is the unit registries store and resolvers return; the
//! checked downcasts on it restore the concrete message type after erasure.

use std::any::Any;
use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::BoxError;
use crate::handler::{CommandHandler, EventHandler, QueryHandler};
use crate::message::{Command, Event, MessageKey, Query};

/// Boxed future used by the uniform calling convention.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The shape a handler method had before adaptation, chosen once at
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerShape {
    /// Synchronous method; runs inline during invocation.
    Sync,
    /// Asynchronous method without a cancellation parameter.
    Async,
    /// Asynchronous method receiving the advisory [`CancelToken`].
    AsyncCancellable,
}

impl fmt::Display for HandlerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerShape::Sync => "sync",
            HandlerShape::Async => "async",
            HandlerShape::AsyncCancellable => "async+cancel",
        };
        f.write_str(name)
    }
}

type CommandFn<C> =
    dyn Fn(C, CancelToken) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync;

type QueryFn<Q> = dyn Fn(Q, CancelToken) -> BoxFuture<'static, Result<<Q as Query>::Output, BoxError>>
    + Send
    + Sync;

type EventFn<E> =
    dyn Fn(Arc<E>, CancelToken) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync;

// ============================================================================
// CommandDelegate
// ============================================================================

/// The uniform invocation delegate for one command type.
pub struct CommandDelegate<C: Command> {
    invoke: Arc<CommandFn<C>>,
    shape: HandlerShape,
}

impl<C: Command> Clone for CommandDelegate<C> {
    fn clone(&self) -> Self {
        Self {
            invoke: Arc::clone(&self.invoke),
            shape: self.shape,
        }
    }
}

impl<C: Command> CommandDelegate<C> {
    /// Adapt a synchronous method `fn(&H, C) -> Result<(), _>`.
    pub fn from_sync<F, H, M>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: 'static,
        M: Fn(&H, C) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let invoke =
            move |command: C, _cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                let handler = factory();
                let out = method(&handler, command);
                Box::pin(future::ready(out))
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::Sync,
        }
    }

    /// Adapt an asynchronous method `fn(H, C) -> impl Future`.
    pub fn from_async<F, H, M, Fut>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Send + 'static,
        M: Fn(H, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let invoke =
            move |command: C, _cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(method(factory(), command))
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::Async,
        }
    }

    /// Adapt an asynchronous method that receives the cancellation token.
    pub fn from_cancellable<F, H, M, Fut>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Send + 'static,
        M: Fn(H, C, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let invoke =
            move |command: C, cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(method(factory(), command, cancel))
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::AsyncCancellable,
        }
    }

    /// Adapt a [`CommandHandler`] implementation produced by `factory`.
    pub fn from_handler<F, H>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: CommandHandler<C> + 'static,
    {
        let invoke =
            move |command: C, cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                let handler = factory();
                Box::pin(async move { handler.handle(command, cancel).await })
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::AsyncCancellable,
        }
    }

    /// Invoke the underlying handler.
    pub fn invoke(
        &self,
        command: C,
        cancel: CancelToken,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        (self.invoke)(command, cancel)
    }

    /// The shape the handler was adapted from.
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Erase the message type for storage in a registry.
    pub fn erase(self) -> ErasedDelegate {
        ErasedDelegate {
            key: MessageKey::command::<C>(),
            shape: self.shape,
            raw: Arc::new(self),
        }
    }
}

// ============================================================================
// QueryDelegate
// ============================================================================

/// The uniform invocation delegate for one query type.
pub struct QueryDelegate<Q: Query> {
    invoke: Arc<QueryFn<Q>>,
    shape: HandlerShape,
}

impl<Q: Query> Clone for QueryDelegate<Q> {
    fn clone(&self) -> Self {
        Self {
            invoke: Arc::clone(&self.invoke),
            shape: self.shape,
        }
    }
}

impl<Q: Query> QueryDelegate<Q> {
    /// Adapt a synchronous method `fn(&H, Q) -> Result<Q::Output, _>`.
    pub fn from_sync<F, H, M>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: 'static,
        M: Fn(&H, Q) -> Result<Q::Output, BoxError> + Send + Sync + 'static,
    {
        let invoke = move |query: Q,
                           _cancel: CancelToken|
              -> BoxFuture<'static, Result<Q::Output, BoxError>> {
            let handler = factory();
            let out = method(&handler, query);
            Box::pin(future::ready(out))
        };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::Sync,
        }
    }

    /// Adapt an asynchronous method `fn(H, Q) -> impl Future`.
    pub fn from_async<F, H, M, Fut>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Send + 'static,
        M: Fn(H, Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Q::Output, BoxError>> + Send + 'static,
    {
        let invoke = move |query: Q,
                           _cancel: CancelToken|
              -> BoxFuture<'static, Result<Q::Output, BoxError>> {
            Box::pin(method(factory(), query))
        };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::Async,
        }
    }

    /// Adapt an asynchronous method that receives the cancellation token.
    pub fn from_cancellable<F, H, M, Fut>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Send + 'static,
        M: Fn(H, Q, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Q::Output, BoxError>> + Send + 'static,
    {
        let invoke = move |query: Q,
                           cancel: CancelToken|
              -> BoxFuture<'static, Result<Q::Output, BoxError>> {
            Box::pin(method(factory(), query, cancel))
        };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::AsyncCancellable,
        }
    }

    /// Adapt a [`QueryHandler`] implementation produced by `factory`.
    pub fn from_handler<F, H>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: QueryHandler<Q> + 'static,
    {
        let invoke = move |query: Q,
                           cancel: CancelToken|
              -> BoxFuture<'static, Result<Q::Output, BoxError>> {
            let handler = factory();
            Box::pin(async move { handler.handle(query, cancel).await })
        };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::AsyncCancellable,
        }
    }

    /// Invoke the underlying handler.
    pub fn invoke(
        &self,
        query: Q,
        cancel: CancelToken,
    ) -> BoxFuture<'static, Result<Q::Output, BoxError>> {
        (self.invoke)(query, cancel)
    }

    /// The shape the handler was adapted from.
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Erase the message type for storage in a registry.
    pub fn erase(self) -> ErasedDelegate {
        ErasedDelegate {
            key: MessageKey::query::<Q>(),
            shape: self.shape,
            raw: Arc::new(self),
        }
    }
}

// ============================================================================
// EventDelegate
// ============================================================================

/// The uniform invocation delegate for one event subscriber.
///
/// Events are shared: every subscriber of a fan-out receives the same
/// `Arc<E>` instance.
pub struct EventDelegate<E: Event> {
    invoke: Arc<EventFn<E>>,
    shape: HandlerShape,
}

impl<E: Event> Clone for EventDelegate<E> {
    fn clone(&self) -> Self {
        Self {
            invoke: Arc::clone(&self.invoke),
            shape: self.shape,
        }
    }
}

impl<E: Event> EventDelegate<E> {
    /// Adapt a synchronous method `fn(&H, &E) -> Result<(), _>`.
    pub fn from_sync<F, H, M>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: 'static,
        M: Fn(&H, &E) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let invoke =
            move |event: Arc<E>, _cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                let handler = factory();
                let out = method(&handler, event.as_ref());
                Box::pin(future::ready(out))
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::Sync,
        }
    }

    /// Adapt an asynchronous method `fn(H, Arc<E>) -> impl Future`.
    pub fn from_async<F, H, M, Fut>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Send + 'static,
        M: Fn(H, Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let invoke =
            move |event: Arc<E>, _cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(method(factory(), event))
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::Async,
        }
    }

    /// Adapt an asynchronous method that receives the cancellation token.
    pub fn from_cancellable<F, H, M, Fut>(factory: F, method: M) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Send + 'static,
        M: Fn(H, Arc<E>, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let invoke =
            move |event: Arc<E>, cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(method(factory(), event, cancel))
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::AsyncCancellable,
        }
    }

    /// Adapt an [`EventHandler`] implementation produced by `factory`.
    pub fn from_handler<F, H>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: EventHandler<E> + 'static,
    {
        let invoke =
            move |event: Arc<E>, cancel: CancelToken| -> BoxFuture<'static, Result<(), BoxError>> {
                let handler = factory();
                Box::pin(async move { handler.handle(event, cancel).await })
            };
        Self {
            invoke: Arc::new(invoke),
            shape: HandlerShape::AsyncCancellable,
        }
    }

    /// Invoke the underlying subscriber.
    pub fn invoke(
        &self,
        event: Arc<E>,
        cancel: CancelToken,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        (self.invoke)(event, cancel)
    }

    /// The shape the subscriber was adapted from.
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Erase the message type for storage in a registry.
    pub fn erase(self) -> ErasedDelegate {
        ErasedDelegate {
            key: MessageKey::event::<E>(),
            shape: self.shape,
            raw: Arc::new(self),
        }
    }
}

// ============================================================================
// ErasedDelegate
// ============================================================================

/// A type-erased invocation delegate, keyed by message identity.
///
/// Registries store these; resolvers return them. The dispatcher restores the
/// concrete message type with one of the checked downcasts, which can only
/// fail if a resolver hands back a delegate registered under a different
/// type.
#[derive(Clone)]
pub struct ErasedDelegate {
    key: MessageKey,
    shape: HandlerShape,
    raw: Arc<dyn Any + Send + Sync>,
}

impl ErasedDelegate {
    /// The identity this delegate was registered under.
    pub fn key(&self) -> MessageKey {
        self.key
    }

    /// The shape the underlying handler was adapted from.
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Downcast to a command delegate.
    pub fn as_command<C: Command>(&self) -> Option<CommandDelegate<C>> {
        self.raw.downcast_ref::<CommandDelegate<C>>().cloned()
    }

    /// Downcast to a query delegate.
    pub fn as_query<Q: Query>(&self) -> Option<QueryDelegate<Q>> {
        self.raw.downcast_ref::<QueryDelegate<Q>>().cloned()
    }

    /// Downcast to an event delegate.
    pub fn as_event<E: Event>(&self) -> Option<EventDelegate<E>> {
        self.raw.downcast_ref::<EventDelegate<E>>().cloned()
    }
}

impl fmt::Debug for ErasedDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedDelegate")
            .field("key", &self.key)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll, Waker};

    fn drive<T>(mut fut: BoxFuture<'static, T>) -> T {
        let mut cx = Context::from_waker(Waker::noop());
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(value) => value,
            Poll::Pending => panic!("delegate future did not complete in one poll"),
        }
    }

    struct Increment;
    impl Command for Increment {}

    struct Echo(String);
    impl Query for Echo {
        type Output = String;
    }

    struct Created;
    impl Event for Created {}

    struct Counter(Arc<AtomicUsize>);

    #[test]
    fn sync_command_runs_inline_before_polling() {
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let delegate = CommandDelegate::from_sync(
            move || Counter(count2.clone()),
            |h: &Counter, _cmd: Increment| {
                h.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );

        let fut = delegate.invoke(Increment, CancelToken::new());
        // The side effect lands before the future is polled.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        drive(fut).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_runs_once_per_invocation() {
        let built = Arc::new(AtomicUsize::new(0));
        let built2 = built.clone();
        let delegate = CommandDelegate::from_sync(
            move || {
                built2.fetch_add(1, Ordering::SeqCst);
                Counter(Arc::new(AtomicUsize::new(0)))
            },
            |_h: &Counter, _cmd: Increment| Ok(()),
        );

        drive(delegate.invoke(Increment, CancelToken::new())).unwrap();
        drive(delegate.invoke(Increment, CancelToken::new())).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shapes_are_recorded_at_adaptation() {
        let sync = CommandDelegate::from_sync(|| (), |_: &(), _: Increment| Ok(()));
        let asynchronous =
            CommandDelegate::from_async(|| (), |_: (), _: Increment| async { Ok(()) });
        let cancellable = CommandDelegate::from_cancellable(
            || (),
            |_: (), _: Increment, _: CancelToken| async { Ok(()) },
        );

        assert_eq!(sync.shape(), HandlerShape::Sync);
        assert_eq!(asynchronous.shape(), HandlerShape::Async);
        assert_eq!(cancellable.shape(), HandlerShape::AsyncCancellable);
    }

    #[test]
    fn erased_delegate_round_trips() {
        let delegate =
            QueryDelegate::from_sync(|| (), |_: &(), q: Echo| Ok(q.0)).erase();

        assert_eq!(delegate.key(), MessageKey::query::<Echo>());
        let typed = delegate.as_query::<Echo>().expect("downcast");
        let out = drive(typed.invoke(Echo("abc".into()), CancelToken::new())).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn wrong_downcast_is_rejected() {
        let delegate = CommandDelegate::from_sync(|| (), |_: &(), _: Increment| Ok(())).erase();
        assert!(delegate.as_query::<Echo>().is_none());
        assert!(delegate.as_event::<Created>().is_none());
    }

    #[test]
    fn event_subscribers_share_the_instance() {
        let delegate = EventDelegate::from_sync(
            || (),
            |_: &(), _event: &Created| Ok(()),
        );
        let event = Arc::new(Created);
        drive(delegate.invoke(Arc::clone(&event), CancelToken::new())).unwrap();
        // One reference held here, none retained by the delegate.
        assert_eq!(Arc::strong_count(&event), 1);
    }
}
