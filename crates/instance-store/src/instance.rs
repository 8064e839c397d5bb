use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{CompletionToken, ErrorKind, SagaId};

/// The pipeline a saga instance executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaType {
    /// Domestic payment pipeline.
    Domestic,
    /// Cross-border payment pipeline.
    CrossBorder,
    /// Refund pipeline, started when a completed payment must be returned.
    Refund,
    /// Reporting pipeline, chained after a refund finishes.
    Report,
}

impl SagaType {
    /// Returns the snake_case name of the saga type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaType::Domestic => "domestic",
            SagaType::CrossBorder => "cross_border",
            SagaType::Refund => "refund",
            SagaType::Report => "report",
        }
    }
}

impl std::fmt::Display for SagaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a saga instance.
///
/// `Running` with a pending completion token is the suspended form; there is
/// no separate status for it, so a crash while parked restores as `Running`
/// with the token still recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    /// Created but not yet picked up by the driver.
    #[default]
    NotStarted,
    /// Steps are executing (or parked on a completion token).
    Running,
    /// A step failed and recorded compensations are being unwound.
    Compensating,
    /// Every step group committed.
    Completed,
    /// A step failed and there was nothing to compensate.
    Failed,
    /// A step failed and at least one compensation executed.
    Compensated,
    /// Cancelled between step groups; committed work was unwound.
    Cancelled,
}

impl SagaStatus {
    /// Whether the saga has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaStatus::Completed
                | SagaStatus::Failed
                | SagaStatus::Compensated
                | SagaStatus::Cancelled
        )
    }

    /// Returns the snake_case name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::NotStarted => "not_started",
            SagaStatus::Running => "running",
            SagaStatus::Compensating => "compensating",
            SagaStatus::Completed => "completed",
            SagaStatus::Failed => "failed",
            SagaStatus::Compensated => "compensated",
            SagaStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What ended a saga: the step that failed and the classified error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub step: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureDetail {
    pub fn new(step: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of one executed compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// The forward step whose effects were unwound.
    pub step: String,
    /// The compensating action that ran.
    pub action: String,
    /// Error message if the compensation itself failed.
    pub error: Option<String>,
}

impl CompensationRecord {
    pub fn succeeded(step: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            action: action.into(),
            error: None,
        }
    }

    pub fn failed(
        step: impl Into<String>,
        action: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            action: action.into(),
            error: Some(error.into()),
        }
    }

    /// Whether the compensation ran without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Durable record of one saga execution.
///
/// The driver mutates the record through the transition methods and persists
/// it after each; fields are public so stores and read paths can serialize
/// the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaInstance {
    pub id: SagaId,
    pub saga_type: SagaType,
    #[serde(default)]
    pub status: SagaStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Name of the step group member most recently dispatched.
    pub current_step: Option<String>,
    /// Step names in commit order.
    pub completed_steps: Vec<String>,
    /// Token the saga is parked on, cleared when the wait resolves.
    pub pending_token: Option<CompletionToken>,
    pub failure: Option<FailureDetail>,
    /// Compensations in execution order (reverse of commit order).
    pub compensations: Vec<CompensationRecord>,
}

impl SagaInstance {
    /// Creates a fresh instance record in the `NotStarted` state.
    pub fn new(id: SagaId, saga_type: SagaType) -> Self {
        Self {
            id,
            saga_type,
            status: SagaStatus::NotStarted,
            started_at: Utc::now(),
            ended_at: None,
            current_step: None,
            completed_steps: Vec::new(),
            pending_token: None,
            failure: None,
            compensations: Vec::new(),
        }
    }

    /// Marks the instance as picked up by the driver.
    pub fn begin(&mut self) {
        self.status = SagaStatus::Running;
    }

    /// Records the token a step is parked on.
    pub fn suspend(&mut self, token: CompletionToken) {
        self.pending_token = Some(token);
    }

    /// Clears the parked token after the wait resolved.
    pub fn resume(&mut self) {
        self.pending_token = None;
    }

    /// Appends a committed step.
    pub fn record_step(&mut self, step: impl Into<String>) {
        self.completed_steps.push(step.into());
    }

    /// Records the failure that triggered the unwind and enters compensation.
    pub fn begin_compensation(&mut self, failure: FailureDetail) {
        self.failure = Some(failure);
        self.status = SagaStatus::Compensating;
    }

    /// Appends the outcome of one executed compensation.
    pub fn record_compensation(&mut self, record: CompensationRecord) {
        self.compensations.push(record);
    }

    pub fn complete(&mut self) {
        self.finish(SagaStatus::Completed);
    }

    pub fn fail(&mut self) {
        self.finish(SagaStatus::Failed);
    }

    pub fn mark_compensated(&mut self) {
        self.finish(SagaStatus::Compensated);
    }

    pub fn cancel(&mut self) {
        self.finish(SagaStatus::Cancelled);
    }

    /// Whether the saga is parked waiting for an external completion.
    pub fn is_suspended(&self) -> bool {
        self.status == SagaStatus::Running && self.pending_token.is_some()
    }

    fn finish(&mut self, status: SagaStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
        self.current_step = None;
        self.pending_token = None;
    }
}
