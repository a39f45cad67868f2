//! Access log middleware.
//! Emits exactly one line per request, whatever happens to the handler.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request},
    middleware::Next,
    response::Response,
};

use crate::http::request::RequestIdExt;

pub async fn access_log(req: Request<Body>, next: Next) -> Response {
    let mut entry = AccessEntry::start(&req);
    let response = next.run(req).await;
    entry.status = Some(response.status().as_u16());
    response
}

/// Logged on drop, so cancellation and panics still produce the line.
struct AccessEntry {
    request_id: String,
    method: Method,
    path: String,
    remote_addr: String,
    user_agent: String,
    started: Instant,
    status: Option<u16>,
}

impl AccessEntry {
    fn start(req: &Request<Body>) -> Self {
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        Self {
            request_id: req.request_id().to_string(),
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            remote_addr,
            user_agent,
            started: Instant::now(),
            status: None,
        }
    }
}

impl Drop for AccessEntry {
    fn drop(&mut self) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match self.status {
            Some(status) => tracing::info!(
                target: "urlcheck::access",
                request_id = %self.request_id,
                method = %self.method,
                path = %self.path,
                remote_addr = %self.remote_addr,
                user_agent = %self.user_agent,
                status,
                elapsed_ms,
                "Request completed"
            ),
            None => tracing::warn!(
                target: "urlcheck::access",
                request_id = %self.request_id,
                method = %self.method,
                path = %self.path,
                remote_addr = %self.remote_addr,
                user_agent = %self.user_agent,
                elapsed_ms,
                "Request aborted before a response"
            ),
        }
    }
}
