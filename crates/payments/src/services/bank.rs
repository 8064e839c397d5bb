//! Cross-border bank trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use common::ActivityError;
use domain::{IsoPaymentStatus, PaymentInstruction};

/// Contract of the correspondent bank handling cross-border legs.
///
/// Forward operations and their compensations are separate calls; every one
/// answers with an ISO 20022 transaction status.
#[async_trait]
pub trait CrossBorderBank: Send + Sync {
    async fn debit_account(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn debit_compensation(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn reserve_currency(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn release_currency(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn sanctions_check(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn transfer_funds(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn recall_funds(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn credit_beneficiary(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;

    async fn refund_beneficiary(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError>;
}

#[derive(Debug, Default)]
struct InMemoryBankState {
    fail_with: HashMap<String, ActivityError>,
    delay_on: HashMap<String, Duration>,
    invocations: Vec<String>,
}

/// In-memory correspondent bank with per-operation failure injection and an
/// ordered invocation log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCrossBorderBank {
    state: Arc<RwLock<InMemoryBankState>>,
}

impl InMemoryCrossBorderBank {
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

    /// Clears an injected failure.
    pub fn clear_fail_on(&self, operation: &str) {
        self.state.write().unwrap().fail_with.remove(operation);
    }

    /// Holds one operation open for `delay` before it answers.
    pub fn set_delay_on(&self, operation: &str, delay: Duration) {
        self.state
            .write()
            .unwrap()
            .delay_on
            .insert(operation.to_owned(), delay);
    }

    /// Operations in invocation order.
    pub fn invocations(&self) -> Vec<String> {
        self.state.read().unwrap().invocations.clone()
    }

    async fn call(&self, operation: &str) -> Result<IsoPaymentStatus, ActivityError> {
        let delay = {
            let mut state = self.state.write().unwrap();
            state.invocations.push(operation.to_owned());
            if let Some(error) = state.fail_with.get(operation) {
                return Err(error.clone());
            }
            state.delay_on.get(operation).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(IsoPaymentStatus::Acsc)
    }
}

#[async_trait]
impl CrossBorderBank for InMemoryCrossBorderBank {
    async fn debit_account(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("debit_account").await
    }

    async fn debit_compensation(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("debit_compensation").await
    }

    async fn reserve_currency(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("reserve_currency").await
    }

    async fn release_currency(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("release_currency").await
    }

    async fn sanctions_check(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("sanctions_check").await
    }

    async fn transfer_funds(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("transfer_funds").await
    }

    async fn recall_funds(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("recall_funds").await
    }

    async fn credit_beneficiary(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("credit_beneficiary").await
    }

    async fn refund_beneficiary(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<IsoPaymentStatus, ActivityError> {
        self.call("refund_beneficiary").await
    }
}
