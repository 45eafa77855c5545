use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CameraError, Result};

/// Cooperative cancellation shared between a retrieval and whoever wants to
/// stop it (a Ctrl-C handler, another thread). Checked between packages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect before the next package request.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the flag can guard another capture.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CameraError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(flag.check().is_ok());

        handle.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(CameraError::Cancelled)));

        flag.reset();
        assert!(!handle.is_cancelled());
    }
}
