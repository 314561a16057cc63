//! Integration tests for the webhook relay.
//! These drive the axum router end to end with mock collaborators.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use signal_relay::api::{router, AppState};
use signal_relay::error::{CompletionError, RelayError};
use signal_relay::llm::CompletionService;
use signal_relay::messaging::MessageRelay;
use signal_relay::prompt::PromptBuilder;
use signal_relay::{RelayPipeline, SignalDeduplicator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

#[derive(Default)]
struct CountingCompletion {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl CompletionService for CountingCompletion {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Long enough for concurrent requests to overlap.
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            Err(CompletionError::Timeout { secs: 60 })
        } else {
            Ok("SELL XAUUSD - WAIT for M5 confirmation".to_string())
        }
    }
}

#[derive(Default)]
struct CountingRelay {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl MessageRelay for CountingRelay {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn deliver(&self, _text: &str) -> Result<(), RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(RelayError::Other("chat not found".to_string()))
        } else {
            Ok(())
        }
    }
}

fn app(completion: Arc<CountingCompletion>, relay: Arc<CountingRelay>) -> Router {
    let pipeline = RelayPipeline::new(
        Arc::new(SignalDeduplicator::new(Duration::from_secs(5), 1)),
        PromptBuilder::default(),
        completion,
        relay,
    );
    router(Arc::new(AppState { pipeline }))
}

fn post_webhook(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, body: &str) -> (StatusCode, Value) {
    let response = app.clone().oneshot(post_webhook(body)).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

const SIGNAL: &str = r#"{
    "symbol": "XAUUSD",
    "time": "2025-01-01T09:30:00Z",
    "alerts": [
        {"timeframe": "H1", "type": "trend", "pattern": "LL-LH", "price": 2351.2},
        {"timeframe": "M15", "type": "setup", "pattern": "retest", "price": 2349.0}
    ]
}"#;

/// Malformed JSON is a client error and nothing downstream runs
#[tokio::test]
async fn test_malformed_json_returns_400() {
    let completion = Arc::new(CountingCompletion::default());
    let relay = Arc::new(CountingRelay::default());
    let app = app(completion.clone(), relay.clone());

    let (status, body) = send(&app, "{\"symbol\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("not valid JSON"));
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
}

/// Alert-list payload with no alerts is a client error
#[tokio::test]
async fn test_empty_alerts_returns_400() {
    let app = app(Arc::default(), Arc::default());

    let (status, body) = send(&app, r#"{"symbol":"XAUUSD","alerts":[]}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No alerts data found in payload");
}

/// A new signal is completed and relayed once
#[tokio::test]
async fn test_new_signal_returns_200_with_reply() {
    let completion = Arc::new(CountingCompletion::default());
    let relay = Arc::new(CountingRelay::default());
    let app = app(completion.clone(), relay.clone());

    let (status, body) = send(&app, SIGNAL).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "relayed");
    assert_eq!(body["reply"], "SELL XAUUSD - WAIT for M5 confirmation");
    assert_eq!(body["delivered"], true);
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
}

/// A redelivery inside the window is acknowledged but not processed
#[tokio::test]
async fn test_duplicate_returns_200_ignored() {
    let completion = Arc::new(CountingCompletion::default());
    let relay = Arc::new(CountingRelay::default());
    let app = app(completion.clone(), relay.clone());

    send(&app, SIGNAL).await;
    let (status, body) = send(&app, SIGNAL).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["reason"], "duplicate signal");
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
}

/// Same content with keys in a different order is still a duplicate
#[tokio::test]
async fn test_reordered_duplicate_is_ignored() {
    let app = app(Arc::default(), Arc::default());

    send(&app, r#"{"signal":{"side":"buy","price":2350},"symbol":"XAUUSD"}"#).await;
    let (_, body) = send(&app, r#"{"symbol":"XAUUSD","signal":{"price":2350,"side":"buy"}}"#).await;

    assert_eq!(body["status"], "ignored");
}

/// A signal differing in one field is processed
#[tokio::test]
async fn test_changed_signal_is_processed() {
    let completion = Arc::new(CountingCompletion::default());
    let app = app(completion.clone(), Arc::default());

    send(&app, SIGNAL).await;
    let changed = SIGNAL.replace("09:30:00Z", "09:30:01Z");
    let (_, body) = send(&app, &changed).await;

    assert_eq!(body["status"], "relayed");
    assert_eq!(completion.calls.load(Ordering::SeqCst), 2);
}

/// Completion failure is a server error and nothing is relayed
#[tokio::test]
async fn test_completion_failure_returns_500() {
    let completion = Arc::new(CountingCompletion {
        fail: true,
        ..Default::default()
    });
    let relay = Arc::new(CountingRelay::default());
    let app = app(completion, relay.clone());

    let (status, body) = send(&app, SIGNAL).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("timed out"));
    assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
}

/// Non-object payloads pass dedup but cannot be turned into a prompt
#[tokio::test]
async fn test_non_object_payload_returns_500() {
    let completion = Arc::new(CountingCompletion::default());
    let app = app(completion.clone(), Arc::default());

    let (status, body) = send(&app, "\"buy now\"").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("JSON object"));
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
}

/// Messaging failure does not fail the webhook
#[tokio::test]
async fn test_relay_failure_still_returns_200() {
    let relay = Arc::new(CountingRelay {
        fail: true,
        ..Default::default()
    });
    let app = app(Arc::default(), relay.clone());

    let (status, body) = send(&app, SIGNAL).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "relayed");
    assert_eq!(body["reply"], "SELL XAUUSD - WAIT for M5 confirmation");
    assert_eq!(body["delivered"], false);
    assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
}

/// Concurrent redeliveries of one alert are processed exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_processed_once() {
    const REQUESTS: usize = 16;
    let completion = Arc::new(CountingCompletion::default());
    let relay = Arc::new(CountingRelay::default());
    let app = app(completion.clone(), relay.clone());

    let tasks = (0..REQUESTS).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { send(&app, SIGNAL).await })
    });
    let results = futures_util::future::join_all(tasks).await;

    let statuses: Vec<String> = results
        .into_iter()
        .map(|r| {
            let (status, body) = r.unwrap();
            assert_eq!(status, StatusCode::OK);
            body["status"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(statuses.iter().filter(|s| *s == "relayed").count(), 1);
    assert_eq!(statuses.iter().filter(|s| *s == "ignored").count(), REQUESTS - 1);
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
}

/// Health endpoint for keep-alive pings
#[tokio::test]
async fn test_health() {
    let app = app(Arc::default(), Arc::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}
