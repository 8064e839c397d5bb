//! Back-office trait and in-memory implementation.
//!
//! Clearing, notification, reconciliation, reporting, archival and refunds
//! are downstream back-office systems; the saga only needs a narrow call
//! per step.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::ActivityError;
use domain::PaymentInstruction;

/// Contract of the downstream back-office systems.
#[async_trait]
pub trait BackOffice: Send + Sync {
    async fn clear_and_settle(&self, instruction: &PaymentInstruction)
    -> Result<(), ActivityError>;

    async fn send_notification(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError>;

    async fn reconcile_payment(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError>;

    async fn generate_reports(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError>;

    async fn archive_payment(&self, instruction: &PaymentInstruction)
    -> Result<(), ActivityError>;

    async fn refund_payment(&self, instruction: &PaymentInstruction) -> Result<(), ActivityError>;
}

#[derive(Debug, Default)]
struct InMemoryBackOfficeState {
    fail_with: HashMap<String, ActivityError>,
    invocations: Vec<String>,
}

/// In-memory back office with per-operation failure injection and an
/// ordered invocation log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackOffice {
    state: Arc<RwLock<InMemoryBackOfficeState>>,
}

impl InMemoryBackOffice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes one operation fail with the given error.
    pub fn set_fail_on(&self, operation: &str, error: ActivityError) {
        self.state
            .write()
            .unwrap()
            .fail_with
            .insert(operation.to_owned(), error);
    }

    /// Operations in invocation order, one entry per call.
    pub fn invocations(&self) -> Vec<String> {
        self.state.read().unwrap().invocations.clone()
    }

    /// Number of calls made to one operation.
    pub fn calls_to(&self, operation: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .invocations
            .iter()
            .filter(|op| op.as_str() == operation)
            .count()
    }

    fn call(&self, operation: &str) -> Result<(), ActivityError> {
        let mut state = self.state.write().unwrap();
        state.invocations.push(operation.to_owned());
        match state.fail_with.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BackOffice for InMemoryBackOffice {
    async fn clear_and_settle(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError> {
        self.call("clear_and_settle")
    }

    async fn send_notification(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError> {
        self.call("send_notification")
    }

    async fn reconcile_payment(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError> {
        self.call("reconcile_payment")
    }

    async fn generate_reports(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError> {
        self.call("generate_reports")
    }

    async fn archive_payment(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError> {
        self.call("archive_payment")
    }

    async fn refund_payment(&self, _instruction: &PaymentInstruction) -> Result<(), ActivityError> {
        self.call("refund_payment")
    }
}
