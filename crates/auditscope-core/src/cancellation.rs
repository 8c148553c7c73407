//! Cooperative cancellation for async scope operations.
//!
//! A [`Cancellation`] is checked before every provider call issued by
//! `create_async`, `save_async` and `dispose_async`, and is forwarded to the
//! provider. Calls already in flight are not interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: Arc<AtomicBool>,
}

impl Cancellation {
    /// Creates a token in the "not cancelled" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Requests cancellation.
    ///
    /// Returns `true` if this call flipped the flag, `false` if it was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        self.inner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
