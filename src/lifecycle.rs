//! Open/Closed lifecycle state with a broadcast-once shutdown signal
//!
//! The guard gates every public facade operation and lets workers observe
//! shutdown cooperatively. Close is one-way and terminal: exactly one
//! caller performs the transition, and the signal fires exactly once.

use crate::error::{MgmtError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Tracks Open → Closed for a facade instance
pub struct LifecycleGuard {
    closed: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl LifecycleGuard {
    /// Create a guard in the Open state
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            closed: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Fail fast with `Closed` if the facade has been closed
    pub fn check(&self) -> Result<()> {
        if self.is_closed() {
            Err(MgmtError::Closed)
        } else {
            Ok(())
        }
    }

    /// Whether close has been observed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Transition to Closed and fire the shutdown signal
    ///
    /// Returns true for the one caller that performed the transition;
    /// every later (or concurrent) call is a no-op returning false.
    pub fn close(&self) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.shutdown_tx.send_replace(true);
        tracing::debug!("Lifecycle closed, shutdown signaled");
        true
    }

    /// Get a receiver for workers to select on
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}
