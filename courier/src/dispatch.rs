//! The dispatcher: resolve, then invoke.
//!
//! [`DispatcherBuilder`] is the registration surface, used during a
//! single-threaded startup phase; [`DispatcherBuilder::build`] freezes
//! everything into an immutable [`Dispatcher`] that is safe to share and
//! call from any number of tasks.
//!
//! Dispatch semantics per message kind:
//!
//! - **Commands / queries**: exactly one delegate is invoked. Zero candidates
//!   is [`DispatchError::NoHandler`]; a handler failure propagates to the
//!   caller unwrapped. No retry, no swallowing.
//! - **Events**: every resolved subscriber is invoked concurrently and the
//!   call completes only when all of them have finished. Failures are
//!   gathered afterwards into one [`FanoutError`]: fail-independent, never
//!   fail-fast, so one failing subscriber cannot starve the others. Zero
//!   subscribers completes silently.
//!
//! Cancellation is advisory: the token reaches every delegate, but the
//! dispatcher never force-aborts an in-flight handler and imposes no
//! timeout.

use std::sync::Arc;

use courier_core::{
    CancelToken, Command, CommandDelegate, CommandHandler, DispatchError, ErasedDelegate, Event,
    EventDelegate, EventHandler, FanoutError, MessageKey, Query, QueryDelegate, QueryHandler,
    RegistrationError, SubscriberFailure,
};
use futures::future::join_all;

use crate::container::HandlerContainer;
use crate::group::HandlerGroup;
use crate::resolve::{CompositeResolver, ContainerResolver, GroupResolver, Resolver, StoreResolver};
use crate::store::HandlerStore;

/// Registration surface for a [`Dispatcher`].
///
/// Registration-time faults (duplicate single-handler keys, invalid group
/// method signatures) surface here, from the registering call, never later
/// at dispatch time.
pub struct DispatcherBuilder {
    store: HandlerStore,
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder").finish_non_exhaustive()
    }
}

impl DispatcherBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            store: HandlerStore::new(),
            resolvers: Vec::new(),
        }
    }

    /// Register the command handler produced by `factory`. The factory runs
    /// once per dispatched command.
    pub fn command<C, H, F>(mut self, factory: F) -> Result<Self, RegistrationError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.store
            .register(CommandDelegate::from_handler(factory).erase())?;
        Ok(self)
    }

    /// Register a pre-adapted command delegate (any supported shape).
    pub fn command_delegate<C: Command>(
        mut self,
        delegate: CommandDelegate<C>,
    ) -> Result<Self, RegistrationError> {
        self.store.register(delegate.erase())?;
        Ok(self)
    }

    /// Register the query handler produced by `factory`.
    pub fn query<Q, H, F>(mut self, factory: F) -> Result<Self, RegistrationError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.store
            .register(QueryDelegate::from_handler(factory).erase())?;
        Ok(self)
    }

    /// Register a pre-adapted query delegate (any supported shape).
    pub fn query_delegate<Q: Query>(
        mut self,
        delegate: QueryDelegate<Q>,
    ) -> Result<Self, RegistrationError> {
        self.store.register(delegate.erase())?;
        Ok(self)
    }

    /// Add the event subscriber produced by `factory`. Subscribers
    /// accumulate; registering is never a duplicate error.
    pub fn subscribe<E, H, F>(mut self, factory: F) -> Self
    where
        E: Event,
        H: EventHandler<E> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.store
            .subscribe(EventDelegate::from_handler(factory).erase());
        self
    }

    /// Add a pre-adapted event delegate (any supported shape).
    pub fn subscribe_delegate<E: Event>(mut self, delegate: EventDelegate<E>) -> Self {
        self.store.subscribe(delegate.erase());
        self
    }

    /// Register a handler group; its method table is scanned and validated
    /// now.
    pub fn group<G: HandlerGroup>(
        mut self,
        factory: impl Fn() -> G + Send + Sync + 'static,
    ) -> Result<Self, RegistrationError> {
        self.resolvers.push(Arc::new(GroupResolver::new(factory)?));
        Ok(self)
    }

    /// Chain an external container as a discovery strategy.
    pub fn container(mut self, container: Arc<dyn HandlerContainer>) -> Self {
        self.resolvers
            .push(Arc::new(ContainerResolver::new(container)));
        self
    }

    /// Chain a custom resolver.
    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Freeze registrations into an immutable dispatcher.
    ///
    /// The resolution chain consults the registration store first, then the
    /// chained resolvers in the order they were added.
    pub fn build(self) -> Dispatcher {
        let mut chain = CompositeResolver::new();
        chain.push(Arc::new(StoreResolver::new(self.store)));
        for resolver in self.resolvers {
            chain.push(resolver);
        }
        Dispatcher { resolver: chain }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The caller-facing entry point: resolves handler(s) for a message's
/// concrete type and invokes them.
///
/// Immutable after [`DispatcherBuilder::build`]; share it via `Arc` or by
/// reference.
pub struct Dispatcher {
    resolver: CompositeResolver,
}

impl Dispatcher {
    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Dispatch a command with a fresh (never-cancelled) token.
    pub async fn dispatch<C: Command>(&self, command: C) -> Result<(), DispatchError> {
        self.dispatch_with(command, CancelToken::new()).await
    }

    /// Dispatch a command, handing `cancel` to the handler.
    pub async fn dispatch_with<C: Command>(
        &self,
        command: C,
        cancel: CancelToken,
    ) -> Result<(), DispatchError> {
        let key = MessageKey::command::<C>();
        let delegate = self
            .resolve_single(key)?
            .as_command::<C>()
            .ok_or(DispatchError::DelegateMismatch(key))?;
        #[cfg(feature = "tracing")]
        tracing::trace!(key = %key, shape = %delegate.shape(), "dispatching command");
        delegate
            .invoke(command, cancel)
            .await
            .map_err(DispatchError::Handler)
    }

    /// Synchronous wrapper around [`dispatch`](Self::dispatch); drives the
    /// call to completion on the current thread. Must not be called from
    /// inside an async runtime.
    pub fn dispatch_blocking<C: Command>(&self, command: C) -> Result<(), DispatchError> {
        futures::executor::block_on(self.dispatch(command))
    }

    /// Dispatch a query with a fresh token and return its result.
    pub async fn query<Q: Query>(&self, query: Q) -> Result<Q::Output, DispatchError> {
        self.query_with(query, CancelToken::new()).await
    }

    /// Dispatch a query, handing `cancel` to the handler.
    pub async fn query_with<Q: Query>(
        &self,
        query: Q,
        cancel: CancelToken,
    ) -> Result<Q::Output, DispatchError> {
        let key = MessageKey::query::<Q>();
        let delegate = self
            .resolve_single(key)?
            .as_query::<Q>()
            .ok_or(DispatchError::DelegateMismatch(key))?;
        #[cfg(feature = "tracing")]
        tracing::trace!(key = %key, shape = %delegate.shape(), "dispatching query");
        delegate
            .invoke(query, cancel)
            .await
            .map_err(DispatchError::Handler)
    }

    /// Synchronous wrapper around [`query`](Self::query).
    pub fn query_blocking<Q: Query>(&self, query: Q) -> Result<Q::Output, DispatchError> {
        futures::executor::block_on(self.query(query))
    }

    /// Publish an event with a fresh token.
    pub async fn publish<E: Event>(&self, event: E) -> Result<(), DispatchError> {
        self.publish_with(event, CancelToken::new()).await
    }

    /// Publish an event, handing `cancel` to every subscriber.
    ///
    /// All subscribers are started without waiting for one another and the
    /// call joins them; no ordering is guaranteed between them. Failures are
    /// collected into one [`FanoutError`] after every subscriber finished.
    pub async fn publish_with<E: Event>(
        &self,
        event: E,
        cancel: CancelToken,
    ) -> Result<(), DispatchError> {
        let key = MessageKey::event::<E>();
        let resolved = self
            .resolver
            .resolve_all(&key)
            .map_err(|source| DispatchError::Resolver { key, source })?;
        // Zero subscribers is a valid, silent completion.
        if resolved.is_empty() {
            return Ok(());
        }

        let event = Arc::new(event);
        let mut invocations = Vec::with_capacity(resolved.len());
        for entry in &resolved {
            let delegate = entry
                .as_event::<E>()
                .ok_or(DispatchError::DelegateMismatch(key))?;
            invocations.push(delegate.invoke(Arc::clone(&event), cancel.clone()));
        }
        let invoked = invocations.len();
        #[cfg(feature = "tracing")]
        tracing::trace!(key = %key, subscribers = invoked, "publishing event");

        let results = join_all(invocations).await;
        let failures: Vec<SubscriberFailure> = results
            .into_iter()
            .enumerate()
            .filter_map(|(index, result)| {
                result.err().map(|error| SubscriberFailure { index, error })
            })
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(FanoutError {
                key,
                invoked,
                failures,
            }
            .into())
        }
    }

    /// Synchronous wrapper around [`publish`](Self::publish).
    pub fn publish_blocking<E: Event>(&self, event: E) -> Result<(), DispatchError> {
        futures::executor::block_on(self.publish(event))
    }

    fn resolve_single(&self, key: MessageKey) -> Result<ErasedDelegate, DispatchError> {
        self.resolver
            .resolve_one(&key)
            .map_err(|source| DispatchError::Resolver { key, source })?
            .ok_or(DispatchError::NoHandler(key))
    }
}
