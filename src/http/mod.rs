//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (reuse or generate X-Request-Id)
//!     → middleware/access_log.rs (one line per request)
//!     → handlers.rs (check, health, ping)
//!     → response.rs (JSON bodies, error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, TimestampRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{bind, AppState, HttpServer, ServerError, Services};
