//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use urlcheck::config::AppConfig;
use urlcheck::dispatch::{MetricPoint, MetricsSink, Notification, Notifier, NotifyError, SinkError};
use urlcheck::health::HealthFlag;
use urlcheck::http::{HttpServer, ServerError, Services};
use urlcheck::lifecycle::Shutdown;

/// Canned response served by a mock backend.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self::status(status, "").header("Location", location)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub head: String,
    pub body: String,
}

/// Raw-TCP HTTP/1.1 backend bound to an ephemeral local port.
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable backend; `f` maps the request path to a response.
pub async fn start_backend<F>(f: F) -> MockBackend
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let (task_hits, task_requests) = (hits.clone(), requests.clone());
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            let hits = task_hits.clone();
            let requests = task_requests.clone();
            tokio::spawn(async move {
                serve_one(socket, f.as_ref(), &hits, &requests).await;
            });
        }
    });

    MockBackend {
        addr,
        hits,
        requests,
    }
}

/// Backend answering every path with the same response.
pub async fn start_fixed_backend(response: MockResponse) -> MockBackend {
    start_backend(move |_| response.clone()).await
}

async fn serve_one<F>(
    mut socket: TcpStream,
    f: &F,
    hits: &AtomicUsize,
    requests: &Mutex<Vec<Recorded>>,
) where
    F: Fn(&str) -> MockResponse,
{
    let Some(recorded) = read_request(&mut socket).await else {
        return;
    };
    hits.fetch_add(1, Ordering::SeqCst);
    let response = f(&recorded.path);
    requests.lock().unwrap().push(recorded);

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let mut raw = format!("HTTP/1.1 {} {}\r\n", response.status, reason(response.status));
    for (name, value) in &response.headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.body.len(),
        response.body
    ));
    let _ = socket.write_all(raw.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let body = String::from_utf8_lossy(&buf[head_end..]).into_owned();
    Some(Recorded {
        method,
        path,
        head,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Server that answers every connection with a plain HTTP response without
/// reading anything, so TLS clients receive a non-TLS record.
pub async fn start_plaintext_responder() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket
                    .write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Metrics sink double that records every point.
#[derive(Default)]
pub struct RecordingSink {
    pub points: Mutex<Vec<MetricPoint>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.points.lock().unwrap().len()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn write(&self, point: &MetricPoint) -> Result<(), SinkError> {
        self.points.lock().unwrap().push(point.clone());
        if self.fail {
            return Err(SinkError::Config("sink down".into()));
        }
        Ok(())
    }
}

/// Notifier double that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<Notification>>,
    pub fail: bool,
    pub delay: Duration,
}

impl RecordingNotifier {
    /// Records the message, then takes `delay` to answer.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &Notification) -> Result<String, NotifyError> {
        self.messages.lock().unwrap().push(message.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(NotifyError::Config("notifier down".into()));
        }
        Ok("<test-id>".to_string())
    }
}

/// A running service on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub health: HealthFlag,
    /// Same router the listener serves, for requests that must not depend on
    /// the listener still accepting.
    pub router: Router,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the service with recording collaborators.
pub async fn start_server(
    config: AppConfig,
    sink: Arc<RecordingSink>,
    notifier: Arc<RecordingNotifier>,
) -> TestServer {
    let services = Services::with_collaborators(&config, sink, notifier).unwrap();
    start_with_services(config, services).await
}

pub async fn start_with_services(config: AppConfig, services: Services) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, services);
    let health = server.health();
    let router = server.router();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        health,
        router,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// POST a check and return the status and parsed body.
pub async fn check(server: &TestServer, url: &str) -> (u16, serde_json::Value) {
    let res = client()
        .post(server.url("/"))
        .body(serde_json::json!({ "url": url }).to_string())
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}
