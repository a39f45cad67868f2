//! Process readiness flag.
//!
//! # States
//! ```text
//! Starting (false) → Serving (true) → Draining (false) → Stopped
//! ```
//!
//! Written only by the server shell on bind and on shutdown signal; read
//! concurrently by every `/health` request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared readiness flag, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct HealthFlag {
    healthy: Arc<AtomicBool>,
}

impl HealthFlag {
    /// A flag that starts unhealthy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Listener bound: ready for traffic.
    pub fn mark_serving(&self) {
        self.healthy.store(true, Ordering::SeqCst);
    }

    /// Shutdown signalled: fail health checks from now on.
    pub fn mark_draining(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }
}
