//! Handler resolution strategies.
//!
//! A [`Resolver`] translates a message key into invocation delegate(s),
//! abstracting how handlers were discovered: startup registration
//! ([`StoreResolver`]), a handler group's method table ([`GroupResolver`]),
//! or an external container ([`ContainerResolver`]). [`CompositeResolver`]
//! chains several strategies behind the same interface.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use courier_core::{BoxError, ErasedDelegate, MessageKey, MessageKind, RegistrationError};

use crate::container::HandlerContainer;
use crate::group::{HandlerGroup, MethodSpec, scan};
use crate::store::HandlerStore;

/// A discovery strategy: translate a message key into delegates.
///
/// `Ok(None)` and an empty vector mean "not known here" and are
/// non-exceptional; an `Err` is a genuine lookup fault.
pub trait Resolver: Send + Sync {
    /// Resolve the single delegate for a command or query key.
    fn resolve_one(&self, key: &MessageKey) -> Result<Option<ErasedDelegate>, BoxError>;

    /// Resolve every subscriber delegate for an event key.
    fn resolve_all(&self, key: &MessageKey) -> Result<Vec<ErasedDelegate>, BoxError>;
}

// ============================================================================
// StoreResolver
// ============================================================================

/// Resolver backed by a frozen [`HandlerStore`].
pub struct StoreResolver {
    store: HandlerStore,
}

impl StoreResolver {
    /// Freeze a store into a resolver.
    pub fn new(store: HandlerStore) -> Self {
        Self { store }
    }
}

impl Resolver for StoreResolver {
    fn resolve_one(&self, key: &MessageKey) -> Result<Option<ErasedDelegate>, BoxError> {
        Ok(self.store.lookup(key).cloned())
    }

    fn resolve_all(&self, key: &MessageKey) -> Result<Vec<ErasedDelegate>, BoxError> {
        Ok(self.store.lookup_all(key).to_vec())
    }
}

// ============================================================================
// GroupResolver
// ============================================================================

/// Resolver over one handler group's method table.
///
/// The table is scanned and validated eagerly when the resolver is
/// constructed, so configuration faults surface at registration time. The
/// lookup index is built lazily on the first resolution and cached for the
/// process lifetime; the `OnceLock` keeps racing first callers from
/// installing more than one index (duplicate work at worst, never duplicate
/// state).
pub struct GroupResolver {
    specs: Vec<MethodSpec>,
    index: OnceLock<GroupIndex>,
}

#[derive(Default)]
struct GroupIndex {
    single: HashMap<MessageKey, ErasedDelegate>,
    multi: HashMap<MessageKey, Vec<ErasedDelegate>>,
}

impl GroupResolver {
    /// Scan and validate `G`'s declared methods.
    pub fn new<G: HandlerGroup>(
        factory: impl Fn() -> G + Send + Sync + 'static,
    ) -> Result<Self, RegistrationError> {
        Ok(Self {
            specs: scan(factory)?,
            index: OnceLock::new(),
        })
    }

    fn index(&self) -> &GroupIndex {
        self.index.get_or_init(|| {
            let mut index = GroupIndex::default();
            for spec in &self.specs {
                let delegate = spec.delegate().clone();
                match delegate.key().kind() {
                    // Ambiguity within the group was rejected by validation.
                    MessageKind::Command | MessageKind::Query => {
                        index.single.insert(delegate.key(), delegate);
                    }
                    MessageKind::Event => {
                        index.multi.entry(delegate.key()).or_default().push(delegate);
                    }
                }
            }
            index
        })
    }
}

impl Resolver for GroupResolver {
    fn resolve_one(&self, key: &MessageKey) -> Result<Option<ErasedDelegate>, BoxError> {
        Ok(self.index().single.get(key).cloned())
    }

    fn resolve_all(&self, key: &MessageKey) -> Result<Vec<ErasedDelegate>, BoxError> {
        Ok(self.index().multi.get(key).cloned().unwrap_or_default())
    }
}

// ============================================================================
// ContainerResolver
// ============================================================================

/// Resolver that defers to an injected [`HandlerContainer`].
pub struct ContainerResolver {
    container: Arc<dyn HandlerContainer>,
}

impl ContainerResolver {
    /// Wrap a container adapter.
    pub fn new(container: Arc<dyn HandlerContainer>) -> Self {
        Self { container }
    }
}

impl Resolver for ContainerResolver {
    fn resolve_one(&self, key: &MessageKey) -> Result<Option<ErasedDelegate>, BoxError> {
        Ok(self.container.resolve_one(key))
    }

    fn resolve_all(&self, key: &MessageKey) -> Result<Vec<ErasedDelegate>, BoxError> {
        Ok(self.container.resolve_many(key))
    }
}

// ============================================================================
// CompositeResolver
// ============================================================================

/// An ordered chain of resolvers.
///
/// Single resolution short-circuits on the first hit and reports not-found
/// only when every child misses; a child's lookup fault propagates, since
/// swallowing it would masquerade as "no handler". Multi resolution
/// concatenates every child's subscribers in chain order; there a child
/// whose lookup fails contributes zero subscribers, so one faulty container
/// cannot silence the other strategies.
pub struct CompositeResolver {
    children: Vec<Arc<dyn Resolver>>,
}

impl CompositeResolver {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Append a resolver to the chain.
    pub fn push(&mut self, resolver: Arc<dyn Resolver>) {
        self.children.push(resolver);
    }

    /// Number of chained resolvers.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Default for CompositeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for CompositeResolver {
    fn resolve_one(&self, key: &MessageKey) -> Result<Option<ErasedDelegate>, BoxError> {
        for child in &self.children {
            if let Some(found) = child.resolve_one(key)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn resolve_all(&self, key: &MessageKey) -> Result<Vec<ErasedDelegate>, BoxError> {
        let mut merged = Vec::new();
        for child in &self.children {
            match child.resolve_all(key) {
                Ok(delegates) => merged.extend(delegates),
                Err(_error) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        key = %key,
                        error = %_error,
                        "resolver failed during fan-out lookup, contributing no subscribers"
                    );
                }
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Command, CommandDelegate, Event, EventDelegate};

    struct Activate;
    impl Command for Activate {}

    struct Created;
    impl Event for Created {}

    fn command_delegate() -> ErasedDelegate {
        CommandDelegate::from_sync(|| (), |_: &(), _: Activate| Ok(())).erase()
    }

    fn event_delegate() -> ErasedDelegate {
        EventDelegate::from_sync(|| (), |_: &(), _: &Created| Ok(())).erase()
    }

    struct FailingResolver;

    impl Resolver for FailingResolver {
        fn resolve_one(&self, _key: &MessageKey) -> Result<Option<ErasedDelegate>, BoxError> {
            Err("lookup exploded".into())
        }

        fn resolve_all(&self, _key: &MessageKey) -> Result<Vec<ErasedDelegate>, BoxError> {
            Err("lookup exploded".into())
        }
    }

    fn store_with_command() -> StoreResolver {
        let mut store = HandlerStore::new();
        store.register(command_delegate()).unwrap();
        StoreResolver::new(store)
    }

    #[test]
    fn composite_single_resolution_short_circuits() {
        let mut chain = CompositeResolver::new();
        chain.push(Arc::new(store_with_command()));
        chain.push(Arc::new(FailingResolver));

        let key = MessageKey::command::<Activate>();
        // The first hit wins; the failing child is never consulted.
        assert!(chain.resolve_one(&key).unwrap().is_some());
    }

    #[test]
    fn composite_single_resolution_propagates_lookup_faults() {
        let mut chain = CompositeResolver::new();
        chain.push(Arc::new(FailingResolver));
        chain.push(Arc::new(store_with_command()));

        let key = MessageKey::command::<Activate>();
        assert!(chain.resolve_one(&key).is_err());
    }

    #[test]
    fn composite_multi_resolution_concatenates_and_tolerates_faults() {
        let mut first = HandlerStore::new();
        first.subscribe(event_delegate());
        let mut second = HandlerStore::new();
        second.subscribe(event_delegate());
        second.subscribe(event_delegate());

        let mut chain = CompositeResolver::new();
        chain.push(Arc::new(StoreResolver::new(first)));
        chain.push(Arc::new(FailingResolver));
        chain.push(Arc::new(StoreResolver::new(second)));

        let key = MessageKey::event::<Created>();
        assert_eq!(chain.resolve_all(&key).unwrap().len(), 3);
    }

    #[test]
    fn empty_chain_resolves_to_nothing() {
        let chain = CompositeResolver::new();
        assert!(chain
            .resolve_one(&MessageKey::command::<Activate>())
            .unwrap()
            .is_none());
        assert!(chain
            .resolve_all(&MessageKey::event::<Created>())
            .unwrap()
            .is_empty());
    }
}
