//! Shared abort flag for in-flight requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Once cancelled, every request opened with this token aborts its
/// connection at the transport's next callback, even while blocked waiting
/// for data.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
