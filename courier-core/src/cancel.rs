//! Cooperative cancellation.
//!
//! Cancellation in Courier is advisory: the dispatcher hands the token to
//! every delegate it invokes, but never force-aborts an in-flight handler.
//! Handlers that care check the flag and bail out with [`Cancelled`];
//! handlers that ignore it run to completion.
//!
//! [`Cancelled`]: crate::Cancelled

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared cancellation flag passed along every dispatch call.
///
/// Cloning yields a handle to the same flag. The default token is not
/// cancelled.
///
/// # Example
///
/// ```rust,ignore
/// let token = CancelToken::new();
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Idempotent; already-running handlers are only
    /// affected if they check the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Non-blocking cancellation check.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
