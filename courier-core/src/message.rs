//! Message kinds and type-keyed identity.
//!
//! Every dispatchable value is identified by its concrete type. The three
//! kind traits, [`Command`], [`Query`] and [`Event`], decide the handler
//! discipline: commands and queries bind exactly one handler, events fan out
//! to zero or more subscribers. [`MessageKey`] is the lookup key used by
//! every registry and resolver.

use std::any::TypeId;
use std::fmt;

/// A marker for values that can travel through the dispatcher.
///
/// Messages are create-once values passed into the dispatcher by value; they
/// carry no reference to the dispatch machinery itself.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Message",
    label = "must be `Send + Sync + 'static`",
    note = "All messages in Courier must be thread-safe and static."
)]
pub trait Message: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Message for T {}

/// A state-changing intent. Handled by exactly one handler, produces no
/// result.
///
/// # Example
///
/// ```rust,ignore
/// struct ActivateAccount { id: u64 }
///
/// impl Command for ActivateAccount {}
/// ```
pub trait Command: Message {}

/// A request for data. Handled by exactly one handler, produces a typed
/// result.
///
/// # Example
///
/// ```rust,ignore
/// struct FindById { id: String }
///
/// impl Query for FindById {
///     type Output = String;
/// }
/// ```
pub trait Query: Message {
    /// The result type the query's handler produces.
    type Output: Send + 'static;
}

/// A fact that already occurred, broadcast to zero or more independent
/// subscribers.
pub trait Event: Message {}

/// The semantic kind of a message, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Single handler, no result.
    Command,
    /// Single handler, typed result.
    Query,
    /// Zero or more subscribers, no result.
    Event,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Command => "command",
            MessageKind::Query => "query",
            MessageKind::Event => "event",
        };
        f.write_str(name)
    }
}

/// The identity a handler is registered under: message kind plus concrete
/// message type.
///
/// Keys are `Copy` and hashable; the type name rides along purely for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey {
    kind: MessageKind,
    type_id: TypeId,
    type_name: &'static str,
}

impl MessageKey {
    /// Key for a command type.
    pub fn command<C: Command>() -> Self {
        Self::of::<C>(MessageKind::Command)
    }

    /// Key for a query type.
    pub fn query<Q: Query>() -> Self {
        Self::of::<Q>(MessageKind::Query)
    }

    /// Key for an event type.
    pub fn event<E: Event>() -> Self {
        Self::of::<E>(MessageKind::Event)
    }

    fn of<M: Message>(kind: MessageKind) -> Self {
        Self {
            kind,
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
        }
    }

    /// The message kind this key was built for.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The concrete message type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The message type's name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind, self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Command for Ping {}

    struct Lookup;
    impl Query for Lookup {
        type Output = u64;
    }
    impl Event for Lookup {}

    #[test]
    fn keys_distinguish_kind_for_the_same_type() {
        let as_query = MessageKey::query::<Lookup>();
        let as_event = MessageKey::event::<Lookup>();

        assert_eq!(as_query.type_id(), as_event.type_id());
        assert_ne!(as_query, as_event);
    }

    #[test]
    fn keys_are_stable_per_type() {
        assert_eq!(MessageKey::command::<Ping>(), MessageKey::command::<Ping>());
    }

    #[test]
    fn display_names_kind_and_type() {
        let key = MessageKey::command::<Ping>();
        let text = key.to_string();
        assert!(text.starts_with("command `"));
        assert!(text.contains("Ping"));
    }
}
