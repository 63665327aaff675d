//! Cancellation context threaded from `call` into table callbacks.
use crate::plugin::CallbackError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-call cancellation context handed to every table callback.
///
/// A `CallContext` can be cloned and shared with whoever may need to abort
/// the call: cancelling any clone is visible to all of them. It can also carry
/// a deadline, after which the call counts as cancelled.
///
/// The dispatcher never interrupts a callback; it only passes the context
/// through. Callbacks that do blocking work should poll [`CallContext::check`]
/// and return early once it fails.
///
/// # Example
///
/// ```
/// use osquery_writable_table::CallContext;
/// use std::time::Duration;
///
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
/// let handle = ctx.clone();
///
/// handle.cancel();
/// assert!(ctx.is_cancelled());
/// assert!(ctx.check().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context that expires `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now().checked_add(timeout);
        Self { deadline, ..self }
    }

    pub fn with_deadline(self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Fails with the reason the call should stop, if any.
    ///
    /// An explicit cancellation wins over an expired deadline.
    pub fn check(&self) -> Result<(), CallbackError> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(CallbackError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CallbackError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
