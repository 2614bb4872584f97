//! Testing utilities for Courier.
//!
//! This module provides doubles for exercising dispatchers, resolvers and
//! the container boundary without real handlers or a DI library.
//!
//! - [`CountingSubscriber`]: counts how many events it receives
//! - [`RecordingSubscriber`]: records every event it receives
//! - [`FailingSubscriber`]: always fails, for fan-out aggregation tests
//! - [`MapContainer`]: an in-memory [`HandlerContainer`]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use courier_core::{BoxError, CancelToken, ErasedDelegate, Event, EventHandler, MessageKey};

use crate::container::HandlerContainer;

// ============================================================================
// Counting Subscriber
// ============================================================================

/// A subscriber that counts invocations.
///
/// Clones share the counter, so a clone kept by the test observes
/// invocations of the registered original.
///
/// # Example
///
/// ```rust,ignore
/// let counter = CountingSubscriber::new();
/// let probe = counter.clone();
///
/// // register `counter`, publish an event...
/// assert_eq!(probe.count(), 1);
/// ```
pub struct CountingSubscriber {
    count: Arc<AtomicUsize>,
}

impl CountingSubscriber {
    /// Create a subscriber with a zeroed counter.
    pub fn new() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Invocations observed so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl Default for CountingSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CountingSubscriber {
    fn clone(&self) -> Self {
        Self {
            count: self.count.clone(),
        }
    }
}

impl<E: Event> EventHandler<E> for CountingSubscriber {
    async fn handle(&self, _event: Arc<E>, _cancel: CancelToken) -> Result<(), BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Recording Subscriber
// ============================================================================

/// A subscriber that records every event it receives.
///
/// Useful for verifying that fan-out delivers the same instance to every
/// subscriber.
pub struct RecordingSubscriber<E> {
    received: Arc<Mutex<Vec<Arc<E>>>>,
}

impl<E> RecordingSubscriber<E> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The events received so far.
    pub fn received(&self) -> Vec<Arc<E>> {
        self.received.lock().unwrap().clone()
    }

    /// Number of events received.
    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

impl<E> Default for RecordingSubscriber<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for RecordingSubscriber<E> {
    fn clone(&self) -> Self {
        Self {
            received: self.received.clone(),
        }
    }
}

impl<E: Event> EventHandler<E> for RecordingSubscriber<E> {
    async fn handle(&self, event: Arc<E>, _cancel: CancelToken) -> Result<(), BoxError> {
        self.received.lock().unwrap().push(event);
        Ok(())
    }
}

// ============================================================================
// Failing Subscriber
// ============================================================================

/// A subscriber that always fails with the given message.
pub struct FailingSubscriber {
    message: String,
}

impl FailingSubscriber {
    /// Create a subscriber failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<E: Event> EventHandler<E> for FailingSubscriber {
    async fn handle(&self, _event: Arc<E>, _cancel: CancelToken) -> Result<(), BoxError> {
        Err(self.message.clone().into())
    }
}

// ============================================================================
// Map Container
// ============================================================================

/// An in-memory [`HandlerContainer`] backed by two hash maps.
///
/// Stands in for a real DI container in tests of the container boundary.
/// `insert` follows the adapter's own policy for single-handler keys: the
/// last insertion wins (ambiguity handling belongs to the adapter, not the
/// core).
#[derive(Default)]
pub struct MapContainer {
    single: HashMap<MessageKey, ErasedDelegate>,
    multi: HashMap<MessageKey, Vec<ErasedDelegate>>,
}

impl MapContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a single-handler delegate under its key.
    pub fn insert(&mut self, delegate: ErasedDelegate) -> &mut Self {
        self.single.insert(delegate.key(), delegate);
        self
    }

    /// Append a subscriber delegate under its key.
    pub fn push(&mut self, delegate: ErasedDelegate) -> &mut Self {
        self.multi.entry(delegate.key()).or_default().push(delegate);
        self
    }
}

impl HandlerContainer for MapContainer {
    fn resolve_one(&self, key: &MessageKey) -> Option<ErasedDelegate> {
        self.single.get(key).cloned()
    }

    fn resolve_many(&self, key: &MessageKey) -> Vec<ErasedDelegate> {
        self.multi.get(key).cloned().unwrap_or_default()
    }
}
