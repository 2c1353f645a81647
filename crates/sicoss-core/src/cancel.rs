//! # Cooperative Cancellation
//!
//! Each run carries a [`CancelToken`]. The extractor and persister check it
//! at I/O boundaries; CPU stages check it between employees. On cancel the
//! persister transaction rolls back, so no partial period is ever visible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SicossError;

/// Cloneable cancellation flag shared across a run's stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint helper: error out if cancellation was requested.
    pub fn verificar(&self) -> Result<(), SicossError> {
        if self.is_cancelled() {
            Err(SicossError::Cancelled)
        } else {
            Ok(())
        }
    }
}
