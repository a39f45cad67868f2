//! Request identification.
//!
//! # Responsibilities
//! - Reuse an incoming `X-Request-Id`, or generate one
//! - Generated IDs are nanoseconds since the Unix epoch, strictly increasing
//!   within the process
//! - Expose the ID to handlers and middleware through request extensions
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The same header is echoed on every response

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Timestamp-derived request ID generator.
///
/// Clones share the last issued value, so IDs stay unique across every
/// connection served by one router.
#[derive(Debug, Clone, Default)]
pub struct TimestampRequestId {
    last: Arc<AtomicU64>,
}

impl TimestampRequestId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next ID: the current time, bumped past the previous ID if needed.
    pub fn next_id(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let bump = |prev: u64| now.max(prev.saturating_add(1));
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(bump(prev)))
        {
            Ok(prev) | Err(prev) => bump(prev),
        }
    }
}

impl MakeRequestId for TimestampRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = self.next_id().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Layer that stamps missing request IDs.
pub fn set_request_id_layer() -> SetRequestIdLayer<TimestampRequestId> {
    SetRequestIdLayer::new(X_REQUEST_ID, TimestampRequestId::new())
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read the request ID stamped by [`set_request_id_layer`].
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn ids_strictly_increase() {
        let ids = TimestampRequestId::new();
        let mut prev = ids.next_id();
        for _ in 0..1000 {
            let next = ids.next_id();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn clones_share_sequence() {
        let first = TimestampRequestId::new();
        let second = first.clone();
        let a = first.next_id();
        let b = second.next_id();
        assert!(b > a);
    }

    #[test]
    fn made_id_is_numeric_header() {
        let mut ids = TimestampRequestId::new();
        let request = Request::new(Body::empty());
        let id = ids.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(text.parse::<u64>().is_ok());
    }

    #[test]
    fn missing_id_reads_as_dash() {
        let request = Request::new(Body::empty());
        assert_eq!(request.request_id(), "-");
    }
}
