//! Cooperative cancellation for long-running builds: a deadline plus an
//! explicit cancel flag, polled at coarse boundaries (per-overlay, per
//! component) rather than threaded through every merge step.

use crate::error::{CnsError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Inner {
    deadline: Instant,
    cancelled: AtomicBool,
}

#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken { inner: Arc::new(Inner { deadline: Instant::now() + timeout, cancelled: AtomicBool::new(false) }) }
    }

    /// A token for an inner operation, carved out of the remaining budget
    /// of `self` but never exceeding `timeout`. Used to derive the
    /// builder's internal budget from a caller-supplied external one.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let remaining = self.remaining();
        let bound = remaining.min(timeout);
        CancelToken::with_timeout(bound)
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.inner.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.inner.deadline.saturating_duration_since(Instant::now())
    }

    /// Returns `Err(Timeout)` if cancelled or past deadline; `Ok(())`
    /// otherwise. Callers poll this at overlay/component boundaries during
    /// a build rather than on every merge step.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(CnsError::timeout(format!("build cancelled during {}", stage)).with_stage(stage));
        }
        if self.is_expired() {
            return Err(CnsError::timeout(format!("build exceeded its time budget during {}", stage)).with_stage(stage));
        }
        Ok(())
    }
}
