//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → sections handed to each subsystem's constructor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; read-only after startup
//! - All fields have defaults to allow minimal configs
//! - Credentials may come from the environment instead of the file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AlertingConfig, AppConfig, CheckerConfig, DispatchMode, InfluxDbConfig, LogFormat,
    MailgunConfig, ObservabilityConfig, ServerConfig,
};
