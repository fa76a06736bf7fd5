//! End-to-end scenarios against the router with mock capabilities.
//!
//! These cover the full pipeline contract: outcome shapes, notification
//! counts, diagnostic bundles, rate limiting, and async callback delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;

use tubenote_api::notifier::NotificationDispatcher;
use tubenote_api::setup::build_router;
use tubenote_api::state::AppState;
use tubenote_core::models::StructuredSummary;
use tubenote_core::validation::ValidatedVideoUrl;
use tubenote_core::{AppError, Config};
use tubenote_infra::{
    CallbackSender, CallbackSenderConfig, DiagnosticCapture, SlidingWindowLimiter,
};
use tubenote_services::{
    DocumentStore, NotificationAttachment, NotificationChannel, StoreConfig, StoreConfigResolver,
    VideoSummarizer,
};

const VALID_URL: &str = "https://www.youtube.com/watch?v=abc12345678";

struct MockSummarizer {
    calls: AtomicUsize,
    fail: bool,
}

impl MockSummarizer {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait]
impl VideoSummarizer for MockSummarizer {
    async fn summarize(&self, video: &ValidatedVideoUrl) -> Result<StructuredSummary, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Exercises capture-time redaction: this value must never appear in
        // a diagnostic bundle.
        tracing::info!(api_key = "sk-live-0042", "calling summarizer");
        if self.fail {
            return Err(AppError::Summarizer("model unavailable".to_string()));
        }
        Ok(StructuredSummary {
            title: "Test Video".to_string(),
            tags: vec!["testing".to_string()],
            url: video.canonical_url.clone(),
            brief_summary: "A short test summary.".to_string(),
            summary_bullets: vec!["Point one".to_string()],
            tools_and_technologies: vec![],
            raw_response: None,
        })
    }
}

struct MockStore {
    calls: AtomicUsize,
    fail: bool,
}

impl MockStore {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn create_document(
        &self,
        _config: &StoreConfig,
        _summary: &StructuredSummary,
    ) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Store("store returned 500".to_string()));
        }
        Ok("https://store.example/pages/page-1".to_string())
    }
}

#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(String, Option<NotificationAttachment>)>>,
}

impl RecordingChannel {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(
        &self,
        subject: &str,
        _html_body: &str,
        attachment: Option<NotificationAttachment>,
    ) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), attachment));
        Ok(())
    }
}

struct TestHarness {
    router: Router,
    summarizer: Arc<MockSummarizer>,
    store: Arc<MockStore>,
    channel: Arc<RecordingChannel>,
    capture: DiagnosticCapture,
    // Keeps the store-config file alive for the test's duration.
    _config_dir: tempfile::TempDir,
}

fn harness(summarizer_fails: bool, store_fails: bool, rate_limit: usize) -> TestHarness {
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("store_config.json");
    std::fs::write(
        &config_path,
        r#"{
            "database_id": "db-test",
            "content_sections": [
                {"field": "brief_summary", "heading": "Summary"}
            ]
        }"#,
    )
    .unwrap();

    let summarizer = MockSummarizer::new(summarizer_fails);
    let store = MockStore::new(store_fails);
    let channel = Arc::new(RecordingChannel::default());
    let capture = DiagnosticCapture::new();

    let config = Config {
        rate_limit_max_requests: rate_limit,
        store_config_path: config_path,
        ..Config::default()
    };

    let state = AppState {
        config,
        limiter: SlidingWindowLimiter::new(Duration::from_secs(3600), rate_limit),
        capture: capture.clone(),
        summarizer: summarizer.clone(),
        store: store.clone(),
        store_config: Arc::new(StoreConfigResolver::new(
            None,
            config_dir.path().join("store_config.json"),
        )),
        notifier: NotificationDispatcher::new(channel.clone()),
        callbacks: Arc::new(
            CallbackSender::new(CallbackSenderConfig {
                allow_private_hosts: true,
                ..Default::default()
            })
            .unwrap(),
        ),
    };

    TestHarness {
        router: build_router(Arc::new(state)),
        summarizer,
        store,
        channel,
        capture,
        _config_dir: config_dir,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_notifications(channel: &RecordingChannel, expected: usize) {
    for _ in 0..200 {
        if channel.count() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {expected} notifications, saw {}",
        channel.count()
    );
}

/// Scenario A: valid URL, summarizer and store succeed.
#[tokio::test]
async fn sync_success_sends_one_success_notification() {
    let h = harness(false, false, 30);
    let capture_guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(h.capture.layer()));

    let response = h
        .router
        .clone()
        .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["page_url"], "https://store.example/pages/page-1");
    assert_eq!(body["summary"]["title"], "Test Video");

    wait_for_notifications(&h.channel, 1).await;
    let sent = h.channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "Summary Ready: Test Video");
    assert!(sent[0].1.is_none());

    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 1);
    drop(capture_guard);
}

/// Scenario B: store fails after a successful summarization; the outcome is
/// a partial success carrying the summary, and the failure notification
/// carries a redacted, non-empty diagnostic bundle.
#[tokio::test]
async fn store_failure_downgrades_to_partial_success() {
    let h = harness(false, true, 30);
    let capture_guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(h.capture.layer()));

    let response = h
        .router
        .clone()
        .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "partial_success");
    assert_eq!(body["summary"]["title"], "Test Video");
    assert!(body["store_error"]
        .as_str()
        .unwrap()
        .contains("store returned 500"));

    wait_for_notifications(&h.channel, 1).await;
    let sent = h.channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "Video Summary Incomplete: Test Video");

    let report = &sent[0].1.as_ref().expect("bundle attached").body;
    assert!(report.contains("## Runtime Logs"));
    assert!(report.contains("calling summarizer"));
    // Redaction happened before capture.
    assert!(!report.contains("sk-live-0042"));
    assert!(report.contains("[REDACTED]"));
    drop(capture_guard);
}

/// Summarizer failure is fatal: a failure outcome with the stage and kind,
/// one failure notification, and no store call.
#[tokio::test]
async fn summarizer_failure_is_terminal() {
    let h = harness(true, false, 30);
    let capture_guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(h.capture.layer()));

    let response = h
        .router
        .clone()
        .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["status"], "failure");
    assert_eq!(body["stage"], "summarization");
    assert_eq!(body["kind"], "summarizer_error");

    wait_for_notifications(&h.channel, 1).await;
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    drop(capture_guard);
}

/// Scenario C: malicious URL is rejected before any external call and
/// produces no notification.
#[tokio::test]
async fn invalid_url_makes_no_external_calls() {
    let h = harness(false, false, 30);

    let response = h
        .router
        .clone()
        .oneshot(post_json(
            "/api/v0/summarize",
            json!({ "url": "http://evil.com/../x" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "invalid_url");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.channel.count(), 0);
}

/// Malformed body is a 400, not a transport-level rejection.
#[tokio::test]
async fn malformed_body_is_bad_request() {
    let h = harness(false, false, 30);

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v0/summarize")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "invalid_input");
}

/// Scenario D: the request over the limit gets a 429 carrying the window
/// counters, and costs zero external calls.
#[tokio::test]
async fn rate_limit_denies_over_limit_request() {
    let limit = 30;
    let h = harness(false, false, limit);

    for _ in 0..limit {
        let response = h
            .router
            .clone()
            .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = h
        .router
        .clone()
        .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = response_json(response).await;
    assert_eq!(body["code"], "rate_limited");
    assert_eq!(body["requests_in_window"], 30);
    assert_eq!(body["limit"], 30);

    // The denied request made no external calls.
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), limit);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), limit);
}

/// Scenario E: async mode acknowledges immediately and delivers exactly one
/// callback POST once the run reaches a terminal state.
#[tokio::test]
async fn async_mode_delivers_exactly_one_callback() {
    let h = harness(false, false, 30);
    let capture_guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(h.capture.layer()));

    // Local callback receiver on an ephemeral port.
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let callback_url = format!("http://{}/cb", listener.local_addr().unwrap());
    let receiver_state = received.clone();
    tokio::spawn(async move {
        let app = Router::new()
            .route(
                "/cb",
                axum::routing::post(
                    |axum::extract::State(seen): axum::extract::State<Arc<Mutex<Vec<Value>>>>,
                     body: String| async move {
                        let value: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                        seen.lock().unwrap().push(value);
                        StatusCode::OK
                    },
                ),
            )
            .with_state(receiver_state);
        axum::serve(listener, app).await.ok();
    });

    let response = h
        .router
        .clone()
        .oneshot(post_json(
            "/api/v0/summarize/async",
            json!({ "url": VALID_URL, "callback_url": callback_url }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let ack = response_json(response).await;
    assert_eq!(ack["status"], "accepted");
    let request_id = ack["request_id"].as_str().unwrap().to_string();

    // Push-only delivery: wait for the callback to arrive.
    for _ in 0..400 {
        if !received.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(30)).await;

    let posts = received.lock().unwrap().clone();
    assert_eq!(posts.len(), 1, "expected exactly one callback POST");
    assert_eq!(posts[0]["request_id"], request_id.as_str());
    assert_eq!(posts[0]["outcome"]["status"], "success");

    wait_for_notifications(&h.channel, 1).await;
    drop(capture_guard);
}

/// Async pre-admission failures are still synchronous.
#[tokio::test]
async fn async_invalid_url_fails_synchronously() {
    let h = harness(false, false, 30);

    let response = h
        .router
        .clone()
        .oneshot(post_json(
            "/api/v0/summarize/async",
            json!({ "url": "https://evil.com/watch?v=abc12345678" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
}

/// Health endpoint reflects the config cache state.
#[tokio::test]
async fn health_reports_cache_state() {
    let h = harness(false, false, 30);

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v0/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store_config_cached"], false);

    // A successful run populates the cache.
    h.router
        .clone()
        .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v0/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["store_config_cached"], true);
}

/// Config reload clears the cache.
#[tokio::test]
async fn config_reload_clears_cache() {
    let h = harness(false, false, 30);

    h.router
        .clone()
        .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
        .await
        .unwrap();

    let response = h
        .router
        .clone()
        .oneshot(post_json("/api/v0/config/reload", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v0/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["store_config_cached"], false);
}

/// Routes are guarded when a master API key is configured.
#[tokio::test]
async fn auth_guards_summarize_when_key_configured() {
    let h = harness(false, false, 30);
    // Rebuild the router with auth enabled over the same state shape.
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("store_config.json");
    std::fs::write(&config_path, r#"{"database_id": "db-test"}"#).unwrap();

    let state = AppState {
        config: Config {
            master_api_key: Some("master-key-123".to_string()),
            store_config_path: config_path.clone(),
            ..Config::default()
        },
        limiter: SlidingWindowLimiter::new(Duration::from_secs(3600), 30),
        capture: DiagnosticCapture::new(),
        summarizer: h.summarizer.clone(),
        store: h.store.clone(),
        store_config: Arc::new(StoreConfigResolver::new(None, config_path)),
        notifier: NotificationDispatcher::new(h.channel.clone()),
        callbacks: Arc::new(CallbackSender::new(CallbackSenderConfig::default()).unwrap()),
    };
    let router = build_router(Arc::new(state));

    // No key: 401.
    let response = router
        .clone()
        .oneshot(post_json("/api/v0/summarize", json!({ "url": VALID_URL })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong key: 401.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v0/summarize")
                .header("content-type", "application/json")
                .header("Authorization", "Bearer wrong-key")
                .body(Body::from(json!({ "url": VALID_URL }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correct key: admitted.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v0/summarize")
                .header("content-type", "application/json")
                .header("Authorization", "Bearer master-key-123")
                .body(Body::from(json!({ "url": VALID_URL }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Health stays open.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v0/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
