//! HTTP API server with observability for the payment saga engine.
//!
//! Provides REST endpoints for payment submission, status, signals and
//! external completions, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use instance_store::{InMemoryInstanceStore, InstanceStore};
use orchestrator::{CompletionBridge, EngineConfig};
use payments::services::{
    InMemoryBackOffice, InMemoryCrossBorderBank, InMemoryLedgerDispatcher, InMemoryPaymentGateway,
};
use payments::{BatchScheduler, PaymentEngine, PaymentIntake, Services};

use routes::payments::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/payments", post(routes::payments::submit))
        .route("/payments/{id}", get(routes::payments::get))
        .route("/payments/{id}/signal", post(routes::payments::signal))
        .route("/payments/{id}/cancel", post(routes::payments::cancel))
        .route("/completions", post(routes::payments::complete))
        .route("/batch/run", post(routes::payments::run_batch))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: in-memory store and collaborators
/// wired to the engine and the batch scheduler.
pub fn create_default_state(engine_config: EngineConfig) -> Arc<AppState> {
    let store = Arc::new(InMemoryInstanceStore::new()) as Arc<dyn InstanceStore>;
    let bridge = CompletionBridge::new();

    let services = Services {
        gateway: Arc::new(InMemoryPaymentGateway::new()),
        ledger: Arc::new(InMemoryLedgerDispatcher::new(bridge.clone())),
        bank: Arc::new(InMemoryCrossBorderBank::new()),
        back_office: Arc::new(InMemoryBackOffice::new()),
    };

    let engine = PaymentEngine::new(store, engine_config, services, bridge);
    let scheduler = Arc::new(BatchScheduler::new(
        Arc::clone(&engine) as Arc<dyn PaymentIntake>
    ));

    Arc::new(AppState { engine, scheduler })
}
