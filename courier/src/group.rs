//! Handler groups: the capability-tagged method table.
//!
//! A handler group is one object exposing handler methods for several
//! message types. Instead of runtime method discovery, the group declares
//! its methods explicitly in [`HandlerGroup::bindings`], and every declared
//! entry is validated against the fixed kind and shape tags before it can be
//! admitted to a registry. A marked method whose tags disagree with what it
//! binds fails registration; entries are never silently skipped, since
//! skipping would hide a configuration bug.
//!
//! # Example
//!
//! ```rust,ignore
//! struct InventoryHandlers;
//!
//! impl HandlerGroup for InventoryHandlers {
//!     fn bindings(methods: &mut GroupBindings<Self>) {
//!         methods
//!             .command("restock", Self::restock)
//!             .query("on_hand", Self::on_hand)
//!             .event("item_created", Self::item_created);
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use courier_core::{
    BoxError, CancelToken, Command, CommandDelegate, ErasedDelegate, Event, EventDelegate,
    HandlerShape, MessageKind, Query, QueryDelegate, RegistrationError,
};

/// A type whose handler methods are registered as a unit.
///
/// One group may expose methods for any number of message types; each
/// declared method becomes an independent registry entry under its own key.
/// A fresh instance is produced by the registered factory for every
/// invocation.
pub trait HandlerGroup: Send + Sync + Sized + 'static {
    /// Declare every handler method the group exposes.
    fn bindings(methods: &mut GroupBindings<Self>);
}

/// One declared handler method: its marker tags plus the delegate it binds.
pub struct MethodSpec {
    method: &'static str,
    kind: MessageKind,
    shape: HandlerShape,
    delegate: ErasedDelegate,
}

impl std::fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodSpec")
            .field("method", &self.method)
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl MethodSpec {
    /// Build a raw spec.
    ///
    /// The typed [`GroupBindings`] methods always produce consistent specs;
    /// this constructor exists for plugin-style discovery, and its tags are
    /// only checked during [`scan`] validation.
    pub fn new(
        method: &'static str,
        kind: MessageKind,
        shape: HandlerShape,
        delegate: ErasedDelegate,
    ) -> Self {
        Self {
            method,
            kind,
            shape,
            delegate,
        }
    }

    /// The declaring method's name, used in diagnostics.
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// The kind the method is marked with.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The shape the method declares.
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// The delegate the method binds.
    pub fn delegate(&self) -> &ErasedDelegate {
        &self.delegate
    }
}

/// Builder over a group's handler factory; collects one [`MethodSpec`] per
/// declared method.
pub struct GroupBindings<G> {
    factory: Arc<dyn Fn() -> G + Send + Sync>,
    specs: Vec<MethodSpec>,
}

impl<G: HandlerGroup> GroupBindings<G> {
    fn new(factory: Arc<dyn Fn() -> G + Send + Sync>) -> Self {
        Self {
            factory,
            specs: Vec::new(),
        }
    }

    fn push(&mut self, method: &'static str, kind: MessageKind, delegate: ErasedDelegate) {
        self.specs.push(MethodSpec {
            method,
            kind,
            shape: delegate.shape(),
            delegate,
        });
    }

    /// Bind a synchronous command method `fn(&G, C) -> Result<(), _>`.
    pub fn command<C, M>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        C: Command,
        M: Fn(&G, C) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = CommandDelegate::from_sync(move || factory(), binding).erase();
        self.push(method, MessageKind::Command, delegate);
        self
    }

    /// Bind an asynchronous command method `fn(G, C) -> impl Future`.
    pub fn command_async<C, M, Fut>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        C: Command,
        M: Fn(G, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = CommandDelegate::from_async(move || factory(), binding).erase();
        self.push(method, MessageKind::Command, delegate);
        self
    }

    /// Bind a cancellation-aware command method.
    pub fn command_cancellable<C, M, Fut>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        C: Command,
        M: Fn(G, C, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = CommandDelegate::from_cancellable(move || factory(), binding).erase();
        self.push(method, MessageKind::Command, delegate);
        self
    }

    /// Bind a synchronous query method `fn(&G, Q) -> Result<Q::Output, _>`.
    pub fn query<Q, M>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        Q: Query,
        M: Fn(&G, Q) -> Result<Q::Output, BoxError> + Send + Sync + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = QueryDelegate::from_sync(move || factory(), binding).erase();
        self.push(method, MessageKind::Query, delegate);
        self
    }

    /// Bind an asynchronous query method `fn(G, Q) -> impl Future`.
    pub fn query_async<Q, M, Fut>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        Q: Query,
        M: Fn(G, Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Q::Output, BoxError>> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = QueryDelegate::from_async(move || factory(), binding).erase();
        self.push(method, MessageKind::Query, delegate);
        self
    }

    /// Bind a cancellation-aware query method.
    pub fn query_cancellable<Q, M, Fut>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        Q: Query,
        M: Fn(G, Q, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Q::Output, BoxError>> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = QueryDelegate::from_cancellable(move || factory(), binding).erase();
        self.push(method, MessageKind::Query, delegate);
        self
    }

    /// Bind a synchronous event method `fn(&G, &E) -> Result<(), _>`.
    pub fn event<E, M>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        E: Event,
        M: Fn(&G, &E) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = EventDelegate::from_sync(move || factory(), binding).erase();
        self.push(method, MessageKind::Event, delegate);
        self
    }

    /// Bind an asynchronous event method `fn(G, Arc<E>) -> impl Future`.
    pub fn event_async<E, M, Fut>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        E: Event,
        M: Fn(G, Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = EventDelegate::from_async(move || factory(), binding).erase();
        self.push(method, MessageKind::Event, delegate);
        self
    }

    /// Bind a cancellation-aware event method.
    pub fn event_cancellable<E, M, Fut>(&mut self, method: &'static str, binding: M) -> &mut Self
    where
        E: Event,
        M: Fn(G, Arc<E>, CancelToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let factory = Arc::clone(&self.factory);
        let delegate = EventDelegate::from_cancellable(move || factory(), binding).erase();
        self.push(method, MessageKind::Event, delegate);
        self
    }

    /// Admit a plugin-style raw spec. Its tags are checked during
    /// validation like every other entry.
    pub fn raw(&mut self, spec: MethodSpec) -> &mut Self {
        self.specs.push(spec);
        self
    }
}

/// Run a group's declarations and validate every entry.
///
/// Validation is fail-fast and happens here, at registration time:
///
/// - a kind marker that disagrees with the bound delegate (e.g. a query
///   marker on a method producing no result) is an
///   [`InvalidSignature`](RegistrationError::InvalidSignature) error;
/// - a declared shape that disagrees with the adapted shape is an
///   [`UnsupportedShape`](RegistrationError::UnsupportedShape) error;
/// - two single-discipline methods bound to the same message key in one
///   group are ambiguous and rejected as
///   [`DuplicateHandler`](RegistrationError::DuplicateHandler). Event
///   methods may repeat a key.
pub fn scan<G: HandlerGroup>(
    factory: impl Fn() -> G + Send + Sync + 'static,
) -> Result<Vec<MethodSpec>, RegistrationError> {
    let mut bindings = GroupBindings::new(Arc::new(factory));
    G::bindings(&mut bindings);
    validate(&bindings.specs)?;
    Ok(bindings.specs)
}

fn validate(specs: &[MethodSpec]) -> Result<(), RegistrationError> {
    let mut single_keys = HashSet::new();
    for spec in specs {
        let bound = spec.delegate.key().kind();
        if spec.kind != bound {
            return Err(RegistrationError::InvalidSignature {
                method: spec.method,
                marked: spec.kind,
                bound,
            });
        }
        if spec.shape != spec.delegate.shape() {
            return Err(RegistrationError::UnsupportedShape {
                method: spec.method,
                declared: spec.shape,
                adapted: spec.delegate.shape(),
            });
        }
        let single = matches!(spec.kind, MessageKind::Command | MessageKind::Query);
        if single && !single_keys.insert(spec.delegate.key()) {
            return Err(RegistrationError::DuplicateHandler(spec.delegate.key()));
        }
    }
    Ok(())
}
