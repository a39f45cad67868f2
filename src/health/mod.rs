//! Service health subsystem.
//!
//! # Data Flow
//! ```text
//! http::server (bind / shutdown signal)
//!     → state.rs (atomic readiness flag)
//!     → GET /health (200 ok / 503 bad)
//!
//! GET /ping answers regardless of the flag: "process alive" versus
//! "process ready".
//! ```

pub mod state;

pub use state::HealthFlag;
