//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

use instance_store::{InMemoryInstanceStore, InstanceStore};
use orchestrator::{CompletionBridge, EngineConfig};
use payments::services::{
    InMemoryBackOffice, InMemoryCrossBorderBank, InMemoryLedgerDispatcher, InMemoryPaymentGateway,
};
use payments::{BatchScheduler, PaymentEngine, PaymentIntake, Services};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct Fakes {
    ledger: InMemoryLedgerDispatcher,
    bank: InMemoryCrossBorderBank,
}

fn setup() -> axum::Router {
    let state = api::create_default_state(EngineConfig::default());
    api::create_app(state, get_metrics_handle())
}

/// Builds the app around hand-wired fakes so tests can inject failures.
fn setup_with_fakes() -> (axum::Router, Fakes) {
    let store = Arc::new(InMemoryInstanceStore::new()) as Arc<dyn InstanceStore>;
    let bridge = CompletionBridge::new();
    let ledger = InMemoryLedgerDispatcher::new(bridge.clone());
    let bank = InMemoryCrossBorderBank::new();

    let services = Services {
        gateway: Arc::new(InMemoryPaymentGateway::new()),
        ledger: Arc::new(ledger.clone()),
        bank: Arc::new(bank.clone()),
        back_office: Arc::new(InMemoryBackOffice::new()),
    };
    let engine = PaymentEngine::new(store, EngineConfig::default(), services, bridge);
    let scheduler = Arc::new(BatchScheduler::new(
        Arc::clone(&engine) as Arc<dyn PaymentIntake>
    ));
    let state = Arc::new(api::routes::payments::AppState { engine, scheduler });
    (api::create_app(state, get_metrics_handle()), Fakes { ledger, bank })
}

fn payment_body(reference: &str, payment_type: &str) -> String {
    serde_json::to_string(&serde_json::json!({
        "payment_type": payment_type,
        "debtor": { "name": "John Doe", "number": "AU-0001" },
        "creditor": { "name": "Jane Doe", "number": "AU-0002" },
        "amount_cents": 10050,
        "currency": "USD",
        "reference": reference,
    }))
    .unwrap()
}

async fn post_json(app: &axum::Router, uri: &str, body: String) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Polls the status endpoint until the saga reaches a terminal status.
async fn wait_terminal(app: &axum::Router, id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let (status, json) = get_json(app, &format!("/payments/{id}")).await;
        if status == StatusCode::OK
            && matches!(
                json["status"].as_str(),
                Some("completed" | "failed" | "compensated" | "cancelled")
            )
        {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("payment {id} did not reach a terminal status");
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_submit_domestic_payment_and_poll_to_completion() {
    let app = setup();

    let (status, accepted) =
        post_json(&app, "/payments", payment_body("REF-API-1", "domestic")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(accepted["saga_id"], "REF-API-1");

    let snapshot = wait_terminal(&app, "REF-API-1").await;
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["iso_status"], "ACSC");
    assert_eq!(snapshot["payment_type"], "domestic");
    assert_eq!(snapshot["completed_steps"].as_array().unwrap().len(), 10);
    assert!(snapshot["ended_at"].as_str().is_some());
    assert!(snapshot["failure"].is_null());
}

#[tokio::test]
async fn test_duplicate_reference_conflicts() {
    let app = setup();

    let (first, _) = post_json(&app, "/payments", payment_body("REF-API-2", "domestic")).await;
    assert_eq!(first, StatusCode::ACCEPTED);

    let (second, json) = post_json(&app, "/payments", payment_body("REF-API-2", "domestic")).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_invalid_payment_is_a_bad_request() {
    let app = setup();

    let body = serde_json::to_string(&serde_json::json!({
        "payment_type": "domestic",
        "debtor": { "name": "John Doe", "number": "AU-0001" },
        "creditor": { "name": "Jane Doe", "number": "AU-0002" },
        "amount_cents": 0,
        "currency": "USD",
        "reference": "REF-API-3",
    }))
    .unwrap();

    let (status, json) = post_json(&app, "/payments", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid payment"));
}

#[tokio::test]
async fn test_get_nonexistent_payment() {
    let app = setup();
    let (status, _) = get_json(&app, "/payments/REF-MISSING").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejected_cross_border_payment_reports_rjct() {
    let (app, fakes) = setup_with_fakes();
    fakes.bank.set_fail_on(
        "sanctions_check",
        common::ActivityError::validation("hit on sanctions list"),
    );

    let (status, _) = post_json(&app, "/payments", payment_body("XB-API-1", "cross_border")).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let snapshot = wait_terminal(&app, "XB-API-1").await;
    assert_eq!(snapshot["status"], "compensated");
    assert_eq!(snapshot["iso_status"], "RJCT");
    assert_eq!(snapshot["failure"]["step"], "sanctions_check");
    assert_eq!(snapshot["compensations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_signal_and_external_completion_flow() {
    let (app, fakes) = setup_with_fakes();
    fakes.ledger.set_auto_resolve(false);

    let (status, _) = post_json(&app, "/payments", payment_body("REF-API-4", "domestic")).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Wait until the saga parks on the posting token.
    let mut token = None;
    for _ in 0..200 {
        token = fakes.ledger.last_token();
        if token.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let token = token.expect("post was never dispatched");

    let (status, signal) = post_json(
        &app,
        "/payments/REF-API-4/signal",
        serde_json::to_string(&serde_json::json!({ "step": "post_payment" })).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(signal["outcome"], "buffered");

    let (status, completion) = post_json(
        &app,
        "/completions",
        serde_json::to_string(&serde_json::json!({
            "token": token.as_uuid(),
            "outcome": "success",
        }))
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completion["delivery"], "resolved");

    let snapshot = wait_terminal(&app, "REF-API-4").await;
    assert_eq!(snapshot["status"], "completed");
}

#[tokio::test]
async fn test_unknown_completion_token_is_ignored() {
    let app = setup();

    let (status, json) = post_json(
        &app,
        "/completions",
        serde_json::to_string(&serde_json::json!({
            "token": uuid::Uuid::new_v4(),
            "outcome": "success",
        }))
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["delivery"], "ignored");
}

#[tokio::test]
async fn test_cancel_endpoint_accepts() {
    let app = setup();

    let (status, _) = post_json(&app, "/payments", payment_body("REF-API-5", "domestic")).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = post_json(&app, "/payments/REF-API-5/cancel", String::new()).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // The saga ends in a terminal state either way; cancellation is
    // cooperative and may land after completion.
    let snapshot = wait_terminal(&app, "REF-API-5").await;
    assert!(matches!(
        snapshot["status"].as_str(),
        Some("completed" | "cancelled")
    ));
}

#[tokio::test]
async fn test_batch_run_submits_payments() {
    let app = setup();

    let (status, summary) = post_json(&app, "/batch/run", String::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["payment_type"], "domestic");
    let submitted = summary["submitted"].as_u64().unwrap();
    assert!((5..=10).contains(&submitted));
    assert_eq!(summary["failed"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
