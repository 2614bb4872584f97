//! Type-keyed handler registration.
//!
//! The store is populated during a single-threaded startup phase and frozen
//! afterwards (the builder hands it to a [`StoreResolver`]); reads after the
//! freeze need no synchronization.
//!
//! [`StoreResolver`]: crate::resolve::StoreResolver

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use courier_core::{ErasedDelegate, MessageKey, RegistrationError};

/// The table from message key to one delegate (single-handler discipline) or
/// a list of delegates (multi-handler discipline).
pub struct HandlerStore {
    single: HashMap<MessageKey, ErasedDelegate>,
    multi: HashMap<MessageKey, Vec<ErasedDelegate>>,
}

impl HandlerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            single: HashMap::new(),
            multi: HashMap::new(),
        }
    }

    /// Register under single-handler discipline (commands and queries).
    ///
    /// A duplicate key is a configuration error and is rejected immediately,
    /// never overwritten and never deferred to dispatch time.
    pub fn register(&mut self, delegate: ErasedDelegate) -> Result<(), RegistrationError> {
        match self.single.entry(delegate.key()) {
            Entry::Occupied(slot) => Err(RegistrationError::DuplicateHandler(*slot.key())),
            Entry::Vacant(slot) => {
                slot.insert(delegate);
                Ok(())
            }
        }
    }

    /// Append under multi-handler discipline (events). Registration order is
    /// preserved.
    pub fn subscribe(&mut self, delegate: ErasedDelegate) {
        self.multi.entry(delegate.key()).or_default().push(delegate);
    }

    /// Look up the single delegate for a key.
    pub fn lookup(&self, key: &MessageKey) -> Option<&ErasedDelegate> {
        self.single.get(key)
    }

    /// Look up every subscriber delegate for a key, in registration order.
    /// An empty slice is a valid, non-error result.
    pub fn lookup_all(&self, key: &MessageKey) -> &[ErasedDelegate] {
        self.multi.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of registered delegates.
    pub fn len(&self) -> usize {
        self.single.len() + self.multi.values().map(Vec::len).sum::<usize>()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multi.is_empty()
    }
}

impl Default for HandlerStore {
    fn default() -> Self {
        Self::new()
    }
}
