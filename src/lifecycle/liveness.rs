use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared alive flag for work that outlives a single call
///
/// Load workers and capture requests hold a clone; once the owner kills the
/// token their results are dropped instead of delivered.
#[derive(Debug, Clone)]
pub struct LivenessToken(Arc<AtomicBool>);

impl LivenessToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the owner dead; irreversible
    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for LivenessToken {
    fn default() -> Self {
        Self::new()
    }
}
