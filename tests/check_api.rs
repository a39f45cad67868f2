//! End-to-end check scenarios against local mock targets.

use std::sync::Arc;
use std::time::Duration;

use urlcheck::config::AppConfig;

mod common;

use common::{MockResponse, RecordingNotifier, RecordingSink};

async fn start() -> (common::TestServer, Arc<RecordingSink>, Arc<RecordingNotifier>) {
    start_with(AppConfig::default()).await
}

async fn start_with(
    config: AppConfig,
) -> (common::TestServer, Arc<RecordingSink>, Arc<RecordingNotifier>) {
    let sink = Arc::new(RecordingSink::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let server = common::start_server(config, sink.clone(), notifier.clone()).await;
    (server, sink, notifier)
}

#[tokio::test]
async fn test_healthy_target_reports_status_without_dump() {
    let backend = common::start_fixed_backend(MockResponse::ok("hello")).await;
    let (server, sink, notifier) = start().await;
    let link = backend.url("/");

    let (status, body) = common::check(&server, &link).await;

    assert_eq!(status, 200);
    assert_eq!(body["Link"], link);
    assert_eq!(body["StatusCode"], 200);
    assert_eq!(body["RedirectURL"], "");
    assert_eq!(body["Dump"], "");
    assert!(body["Headers"].is_null());
    assert!(body["ResponseTime"].as_u64().is_some());
    assert!(body.get("Error").is_none());
    assert!(body["Timings"]["total"].as_u64().is_some());

    assert_eq!(backend.hits(), 1);
    assert_eq!(sink.count(), 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_not_found_dumps_response_and_alerts_once() {
    let backend = common::start_fixed_backend(
        MockResponse::status(404, "gone").header("X-Backend", "mock"),
    )
    .await;
    let (server, sink, notifier) = start().await;
    let link = backend.url("/missing");

    let (status, body) = common::check(&server, &link).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 404);
    let dump = body["Dump"].as_str().unwrap();
    assert!(dump.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(dump.ends_with("\r\n\r\ngone"));
    assert_eq!(body["Headers"]["x-backend"][0], "mock");

    assert_eq!(sink.count(), 1);
    assert_eq!(notifier.count(), 1);

    let point = sink.points.lock().unwrap()[0].clone();
    assert_eq!(point.series, link);
    assert_eq!(point.tags["url"], link);
    assert_eq!(point.tags["responseCode"], "404");

    let message = notifier.messages.lock().unwrap()[0].clone();
    assert_eq!(message.subject, format!("404 Detected: {link}"));
    assert!(message.body.starts_with(&format!("Link checked: {link}\n\n")));
    assert!(message.body.contains("\"StatusCode\":404"));
}

#[tokio::test]
async fn test_server_errors_are_not_alerted() {
    let backend = common::start_fixed_backend(MockResponse::status(500, "boom")).await;
    let (server, sink, notifier) = start().await;

    let (status, body) = common::check(&server, &backend.url("/")).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 500);
    assert_eq!(body["Dump"], "");
    assert_eq!(sink.count(), 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_collaborator_failures_do_not_change_response() {
    let backend = common::start_fixed_backend(MockResponse::status(404, "")).await;
    let sink = Arc::new(RecordingSink::failing());
    let notifier = Arc::new(RecordingNotifier::failing());
    let server = common::start_server(AppConfig::default(), sink.clone(), notifier.clone()).await;

    let (status, body) = common::check(&server, &backend.url("/")).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 404);
    assert_eq!(sink.count(), 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_redirect_reports_terminal_url() {
    let backend = common::start_backend(|path| match path {
        "/old" => MockResponse::redirect(301, "/new"),
        _ => MockResponse::ok("moved here"),
    })
    .await;
    let (server, _, _) = start().await;

    let (status, body) = common::check(&server, &backend.url("/old")).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 200);
    assert_eq!(body["RedirectURL"], backend.url("/new"));
    assert_eq!(backend.hits(), 2);
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let backend = common::start_fixed_backend(MockResponse::redirect(302, "/loop")).await;
    let mut config = AppConfig::default();
    config.checker.max_redirects = 3;
    let (server, _, notifier) = start_with(config).await;

    let (status, body) = common::check(&server, &backend.url("/loop")).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 0);
    assert!(body["Error"].as_str().unwrap().contains("redirect"));
    assert_eq!(backend.hits(), 4);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_unreachable_target_is_a_completed_check() {
    let addr = common::closed_addr().await;
    let (server, sink, notifier) = start().await;
    let link = format!("http://{addr}/");

    let (status, body) = common::check(&server, &link).await;

    assert_eq!(status, 200);
    assert_eq!(body["Link"], link);
    assert_eq!(body["StatusCode"], 0);
    assert!(body["Error"].as_str().is_some());
    assert_eq!(sink.count(), 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_https_against_plain_http_is_a_tls_failure() {
    let addr = common::start_plaintext_responder().await;
    let (server, _, notifier) = start().await;
    let link = format!("https://{addr}/");

    let (status, body) = common::check(&server, &link).await;

    assert_eq!(status, 200);
    assert_eq!(body["Link"], link);
    assert_eq!(body["StatusCode"], 0);
    assert!(body["Error"].as_str().unwrap().contains("tls"));
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_unresolvable_host_is_a_dns_failure() {
    let (server, _, notifier) = start().await;
    let link = "http://nonexistent.invalid/";

    let (status, body) = common::check(&server, link).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 0);
    assert!(body["Error"].as_str().unwrap().contains("dns"));
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_slow_notifier_does_not_change_response() {
    let backend = common::start_fixed_backend(MockResponse::status(404, "gone")).await;
    let mut config = AppConfig::default();
    config.checker.timeout_secs = 1;
    config.server.request_timeout_secs = 2;
    config.alerting.dispatch_timeout_secs = 1;
    let sink = Arc::new(RecordingSink::default());
    let notifier = Arc::new(RecordingNotifier::slow(Duration::from_secs(3)));
    let server = common::start_server(config, sink.clone(), notifier.clone()).await;

    let started = std::time::Instant::now();
    let (status, body) = common::check(&server, &backend.url("/")).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 404);
    assert!(started.elapsed() < Duration::from_millis(2500));
    assert_eq!(sink.count(), 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_slow_target_times_out() {
    let backend = common::start_fixed_backend(
        MockResponse::ok("late").delay(Duration::from_secs(5)),
    )
    .await;
    let mut config = AppConfig::default();
    config.checker.timeout_secs = 1;
    let (server, _, _) = start_with(config).await;

    let started = std::time::Instant::now();
    let (status, body) = common::check(&server, &backend.url("/")).await;

    assert_eq!(status, 200);
    assert_eq!(body["StatusCode"], 0);
    assert!(body["Error"].as_str().unwrap().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_response_time_grows_with_server_delay() {
    let backend = common::start_backend(|path| match path {
        "/slow" => MockResponse::ok("slow").delay(Duration::from_millis(300)),
        _ => MockResponse::ok("fast"),
    })
    .await;
    let (server, _, _) = start().await;

    let (_, fast) = common::check(&server, &backend.url("/fast")).await;
    let (_, slow) = common::check(&server, &backend.url("/slow")).await;

    let fast = fast["ResponseTime"].as_u64().unwrap();
    let slow = slow["ResponseTime"].as_u64().unwrap();
    assert!(slow >= 300, "slow response took {slow}ms");
    assert!(slow > fast);
}

#[tokio::test]
async fn test_empty_body_is_rejected() {
    let (server, _, _) = start().await;

    let res = common::client().post(server.url("/")).send().await.unwrap();

    assert_eq!(res.status(), 400);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_invalid_urls_are_rejected() {
    let (server, _, _) = start().await;

    for body in [
        r#"{"url": ""}"#,
        r#"{"url": "not a url"}"#,
        r#"{"url": "ftp://example.com/file"}"#,
        r#"{"link": "http://example.com"}"#,
        "not json",
    ] {
        let res = common::client()
            .post(server.url("/"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400, "body {body} should be rejected");
    }
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = AppConfig::default();
    config.server.max_request_bytes = 64;
    let (server, _, _) = start_with(config).await;

    let long = format!(r#"{{"url": "http://example.com/{}"}}"#, "a".repeat(200));
    let res = common::client()
        .post(server.url("/"))
        .body(long)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 413);
}
