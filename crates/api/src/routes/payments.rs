//! Payment submission, status and completion endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{CompletionToken, SagaId};
use domain::{IsoPaymentStatus, PaymentRequest};
use instance_store::{CompensationRecord, FailureDetail, SagaStatus, SagaType};
use orchestrator::{CompletionOutcome, CompletionResult, Delivery, SignalOutcome, StatusSnapshot};
use payments::{BatchScheduler, BatchSummary, PaymentEngine, PaymentType};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub engine: Arc<PaymentEngine>,
    pub scheduler: Arc<BatchScheduler>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SubmitPaymentRequest {
    pub payment_type: PaymentType,
    #[serde(flatten)]
    pub request: PaymentRequest,
}

#[derive(Deserialize)]
pub struct SignalRequest {
    pub step: String,
}

#[derive(Deserialize)]
pub struct CompletionRequest {
    pub token: CompletionToken,
    pub outcome: CompletionOutcome,
    #[serde(default)]
    pub message: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PaymentAcceptedResponse {
    pub saga_id: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub saga_id: String,
    pub payment_type: SagaType,
    pub status: SagaStatus,
    /// ISO 20022 transaction status derived from the saga status.
    pub iso_status: String,
    pub completed_steps: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<FailureDetail>,
    pub compensations: Vec<CompensationRecord>,
}

#[derive(Serialize)]
pub struct SignalResponse {
    pub outcome: String,
}

#[derive(Serialize)]
pub struct CompletionResponse {
    pub delivery: String,
}

impl From<StatusSnapshot> for PaymentStatusResponse {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self {
            saga_id: snapshot.id.to_string(),
            payment_type: snapshot.saga_type,
            status: snapshot.status,
            iso_status: iso_status(snapshot.status).as_str().to_owned(),
            completed_steps: snapshot.completed_steps,
            started_at: snapshot.started_at,
            ended_at: snapshot.ended_at,
            failure: snapshot.failure,
            compensations: snapshot.compensations,
        }
    }
}

/// Maps the saga status to the ISO status reported to bank-facing callers.
fn iso_status(status: SagaStatus) -> IsoPaymentStatus {
    match status {
        SagaStatus::Completed => IsoPaymentStatus::Acsc,
        SagaStatus::Failed | SagaStatus::Compensated => IsoPaymentStatus::Rjct,
        SagaStatus::Cancelled => IsoPaymentStatus::Canc,
        _ => IsoPaymentStatus::Actc,
    }
}

// -- Handlers --

/// POST /payments — validate a payment request and start its saga.
#[tracing::instrument(skip(state, req))]
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentAcceptedResponse>), ApiError> {
    let handle = state
        .engine
        .start_payment(req.request, req.payment_type)
        .await?;

    // The saga runs asynchronously; callers poll GET /payments/{id}.
    Ok((
        StatusCode::ACCEPTED,
        Json(PaymentAcceptedResponse {
            saga_id: handle.id().to_string(),
            status: handle.status().as_str().to_owned(),
        }),
    ))
}

/// GET /payments/:id — status snapshot of a payment saga.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let snapshot = state.engine.query(&SagaId::new(id)).await?;
    Ok(Json(snapshot.into()))
}

/// POST /payments/:id/signal — deliver an external step-completion signal.
#[tracing::instrument(skip(state, req))]
pub async fn signal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SignalRequest>,
) -> Result<Json<SignalResponse>, ApiError> {
    let outcome = state.engine.signal(&SagaId::new(id), &req.step).await?;
    let outcome = match outcome {
        SignalOutcome::Buffered => "buffered",
        SignalOutcome::AlreadyCompleted => "already_completed",
    };
    Ok(Json(SignalResponse {
        outcome: outcome.to_owned(),
    }))
}

/// POST /payments/:id/cancel — request cooperative cancellation.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.cancel(&SagaId::new(id)).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /completions — resolve a completion token from the external channel.
#[tracing::instrument(skip(state, req))]
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let result = CompletionResult {
        outcome: req.outcome,
        message: req.message,
    };
    let delivery = match state.engine.resolve_completion(req.token, result) {
        Delivery::Resolved => "resolved",
        Delivery::Parked => "parked",
        Delivery::Ignored => "ignored",
    };
    Ok(Json(CompletionResponse {
        delivery: delivery.to_owned(),
    }))
}

/// POST /batch/run — run one synthetic payment batch immediately.
#[tracing::instrument(skip(state))]
pub async fn run_batch(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatchSummary>, ApiError> {
    let summary = state
        .scheduler
        .run_once("domestic")
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(summary))
}
