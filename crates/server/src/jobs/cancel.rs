// crates/server/src/jobs/cancel.rs
//! Cooperative cancellation flag for a single run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancel flag. Clones observe the same flag.
///
/// The runner checks it between rows; nothing is interrupted mid-row.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_clear() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let worker_side = token.clone();

        token.request_cancel();
        token.request_cancel();
        assert!(worker_side.is_cancelled());
    }

    #[test]
    fn test_tokens_are_independent() {
        let first = CancelToken::new();
        let second = CancelToken::new();
        first.request_cancel();
        assert!(!second.is_cancelled());
    }
}
