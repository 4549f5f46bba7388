//! Cooperative cancellation shared by the scan and transfer walkers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token for cooperative cancellation of a run.
///
/// Clone is cheap and shares state. Derived tokens ([`child`](Self::child),
/// [`with_deadline`](Self::with_deadline)) observe their parent, but cancelling a
/// derived token never cancels the parent.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested, the deadline has passed, or an
    /// ancestor token is cancelled.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        if self
            .inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Derive a token that is cancelled whenever this one is.
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Derive a token that additionally reports cancelled once `deadline` passes.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline))
    }

    /// Derive a token that additionally reports cancelled after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether the token's own deadline (not an ancestor's) has passed.
    pub fn deadline_elapsed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                deadline,
                parent: Some(self.clone()),
            }),
        }
    }
}
