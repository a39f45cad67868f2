//! Check error definitions.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while validating or performing a check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Request body was empty or not the expected JSON shape.
    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    /// Target is not a syntactically valid URL.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Only plain HTTP and HTTPS targets can be checked.
    #[error("unsupported protocol scheme '{0}'")]
    UnsupportedScheme(String),

    /// Name resolution failed or returned nothing.
    #[error("dns lookup for {host} failed: {reason}")]
    Dns { host: String, reason: String },

    /// No resolved address accepted a TCP connection.
    #[error("unable to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS handshake failed.
    #[error("tls handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP protocol error on an established connection.
    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    /// Body could not be read, or exceeded the configured limit.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The overall check deadline elapsed.
    #[error("check timed out after {0:?}")]
    Timeout(Duration),

    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    #[error("invalid redirect location '{0}'")]
    InvalidRedirect(String),

    /// Outbound request could not be assembled.
    #[error("failed to build request: {0}")]
    Build(String),
}

impl CheckError {
    /// True for the errors raised before any network activity.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CheckError::InvalidRequest(_)
                | CheckError::InvalidUrl { .. }
                | CheckError::UnsupportedScheme(_)
        )
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::InvalidRequest(_) => "invalid_request",
            CheckError::InvalidUrl { .. } => "invalid_url",
            CheckError::UnsupportedScheme(_) => "unsupported_scheme",
            CheckError::Dns { .. } => "dns",
            CheckError::Connect { .. } => "connect",
            CheckError::Tls { .. } => "tls",
            CheckError::Http(_) => "http",
            CheckError::Body(_) => "body",
            CheckError::Timeout(_) => "timeout",
            CheckError::TooManyRedirects(_) => "too_many_redirects",
            CheckError::InvalidRedirect(_) => "invalid_redirect",
            CheckError::Build(_) => "build",
        }
    }
}
