//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build services → Bind listener → Serving
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Health fails → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Ordered shutdown: fail health, stop accept, drain, close
//! - Shutdown has timeout: forced close after the drain window

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
