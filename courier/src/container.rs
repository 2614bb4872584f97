//! The boundary to an external handler container.

use courier_core::{ErasedDelegate, MessageKey};

/// Adapter over an injected DI container that produces invocation delegates
/// by message key.
///
/// The contract is normalized so the rest of the core never needs defensive
/// handling of container quirks:
///
/// - [`resolve_many`](HandlerContainer::resolve_many) returns an empty vector
///   when the container knows nothing about the key; it never fails on
///   empty. Containers whose native "resolve all" raises in that case must
///   absorb it inside the adapter.
/// - [`resolve_one`](HandlerContainer::resolve_one) returns `None` for "none
///   found". What to do about ambiguity (several candidates for one
///   single-handler key) is the adapter's policy.
///
/// The concrete DI library behind an implementation is out of scope for this
/// crate; [`MapContainer`](crate::testing::MapContainer) is an in-memory
/// stand-in for tests.
pub trait HandlerContainer: Send + Sync {
    /// Resolve the single delegate for a command or query key.
    fn resolve_one(&self, key: &MessageKey) -> Option<ErasedDelegate>;

    /// Resolve every subscriber delegate for an event key.
    fn resolve_many(&self, key: &MessageKey) -> Vec<ErasedDelegate>;
}
