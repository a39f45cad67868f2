//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, access log, limits, headers)
//! - Bind to a listener and flip the health flag
//! - Drain in-flight requests on shutdown, bounded by the drain window

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::checker::{CheckError, Checker};
use crate::config::{AppConfig, DispatchMode, ServerConfig};
use crate::dispatch::{
    self, AlertDispatch, DispatchWorker, Dispatcher, MetricsSink, Notifier, NotifyError, SinkError,
};
use crate::health::HealthFlag;
use crate::http::handlers::{check_handler, health_handler, not_found, ping_handler};
use crate::http::middleware::access_log;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::lifecycle::shutdown;

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build checker: {0}")]
    Checker(#[from] CheckError),

    #[error("failed to build metrics sink: {0}")]
    Sink(#[from] SinkError),

    #[error("failed to build notifier: {0}")]
    Notifier(#[from] NotifyError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub checker: Arc<Checker>,
    pub dispatch: AlertDispatch,
    pub health: HealthFlag,
}

/// Collaborators the server is built from.
pub struct Services {
    pub checker: Arc<Checker>,
    pub dispatch: AlertDispatch,
    /// Present in queued dispatch mode.
    pub worker: Option<DispatchWorker>,
}

impl Services {
    /// Build the checker and the collaborators named by the config.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServerError> {
        let sink = dispatch::sink_from_config(&config.influxdb)?;
        let notifier = dispatch::notifier_from_config(&config.mailgun)?;
        Self::with_collaborators(config, sink, notifier)
    }

    pub fn with_collaborators(
        config: &AppConfig,
        sink: Arc<dyn MetricsSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ServerError> {
        let dispatcher = Arc::new(Dispatcher::new(&config.alerting, sink, notifier));
        let checker = Checker::new(&config.checker, dispatcher.policy())?;

        let (dispatch, worker) = match config.alerting.dispatch_mode {
            DispatchMode::Inline => (AlertDispatch::inline(dispatcher), None),
            DispatchMode::Queued => {
                let (handle, worker) = AlertDispatch::queued(dispatcher);
                (handle, Some(worker))
            }
        };

        Ok(Self {
            checker: Arc::new(checker),
            dispatch,
            worker,
        })
    }
}

/// HTTP server for the check service.
pub struct HttpServer {
    router: Router,
    health: HealthFlag,
    worker: Option<DispatchWorker>,
    drain: Duration,
}

impl HttpServer {
    pub fn new(config: &AppConfig, services: Services) -> Self {
        let health = HealthFlag::new();
        let state = AppState {
            checker: services.checker,
            dispatch: services.dispatch,
            health: health.clone(),
        };

        Self {
            router: Self::build_router(&config.server, state),
            health,
            worker: services.worker,
            drain: Duration::from_secs(config.server.drain_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request ID, trace span, response headers, access
    /// log, body limit, routes. The timeout wraps every route but `POST /`,
    /// whose check and dispatch carry their own deadlines.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/ping", get(ping_handler))
            .fallback(not_found)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .route("/", post(check_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.max_request_bytes))
            .layer(middleware::from_fn(access_log))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %req.request_id(),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// Readiness flag shared with `/health`.
    pub fn health(&self) -> HealthFlag {
        self.health.clone()
    }

    /// The fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown_rx` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let HttpServer {
            router,
            health,
            worker,
            drain,
        } = self;

        let worker = worker.map(|worker| tokio::spawn(worker.run()));

        health.mark_serving();
        tracing::info!(address = %addr, "HTTP server serving");

        // Set once, when the signal arrives: the end of the drain window.
        let (drain_end_tx, mut drain_end_rx) = watch::channel(None::<Instant>);
        let worker_drain_end = drain_end_rx.clone();
        let signal = {
            let health = health.clone();
            async move {
                shutdown::wait(shutdown_rx).await;
                health.mark_draining();
                tracing::info!(drain_secs = drain.as_secs(), "Shutdown signal received, draining");
                let _ = drain_end_tx.send(Some(Instant::now() + drain));
            }
        };

        let deadline = async move {
            let end = drain_end_rx
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|end| *end);
            match end {
                Some(end) => tokio::time::sleep_until(end).await,
                None => std::future::pending::<()>().await,
            }
        };

        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = deadline => tracing::warn!(
                drain_secs = drain.as_secs(),
                "Drain window expired, closing remaining connections"
            ),
        }

        if let Some(mut worker) = worker {
            // The worker gets what is left of the window, not a new one.
            let end = (*worker_drain_end.borrow()).unwrap_or_else(|| Instant::now() + drain);
            if tokio::time::timeout_at(end, &mut worker).await.is_err() {
                worker.abort();
                tracing::warn!("Dispatch worker still busy at end of drain window, queued alerts dropped");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Bind the listen address, mapping failure to a fatal error.
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })
}
