//! Payment gateway trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::ActivityError;
use domain::PaymentInstruction;

/// Response from the external order/authorization API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub status: String,
}

impl GatewayResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    /// Whether the gateway accepted the operation.
    ///
    /// The upstream API answers `"completed"` for orders and `"success"` for
    /// authorizations; both are accepted case-insensitively, anything else is
    /// a rejection.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "completed" | "success"
        )
    }
}

/// Contract of the external payment/authorization API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Liveness probe used by the batch scheduler before submitting.
    async fn health_check(&self) -> Result<(), ActivityError>;

    /// Registers the instruction with the gateway.
    async fn initiate_payment(&self, instruction: &PaymentInstruction)
    -> Result<(), ActivityError>;

    /// Places the payment order.
    async fn order_payment(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<GatewayResponse, ActivityError>;

    /// Requests authorization for the payment.
    async fn authorize_payment(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<GatewayResponse, ActivityError>;
}

#[derive(Debug)]
struct InMemoryGatewayState {
    healthy: bool,
    fail_on_initiate: bool,
    order_status: String,
    authorize_status: String,
    initiate_calls: u32,
    order_calls: u32,
    authorize_calls: u32,
}

impl Default for InMemoryGatewayState {
    fn default() -> Self {
        Self {
            healthy: true,
            fail_on_initiate: false,
            order_status: "completed".to_owned(),
            authorize_status: "success".to_owned(),
            initiate_calls: 0,
            order_calls: 0,
            authorize_calls: 0,
        }
    }
}

/// In-memory payment gateway for tests and embedded runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the liveness probe.
    pub fn set_healthy(&self, healthy: bool) {
        self.state.write().unwrap().healthy = healthy;
    }

    /// Makes the next initiate calls fail with a retryable server error.
    pub fn set_fail_on_initiate(&self, fail: bool) {
        self.state.write().unwrap().fail_on_initiate = fail;
    }

    /// Replaces the status returned for orders.
    pub fn set_order_status(&self, status: impl Into<String>) {
        self.state.write().unwrap().order_status = status.into();
    }

    /// Replaces the status returned for authorizations.
    pub fn set_authorize_status(&self, status: impl Into<String>) {
        self.state.write().unwrap().authorize_status = status.into();
    }

    pub fn initiate_calls(&self) -> u32 {
        self.state.read().unwrap().initiate_calls
    }

    pub fn order_calls(&self) -> u32 {
        self.state.read().unwrap().order_calls
    }

    pub fn authorize_calls(&self) -> u32 {
        self.state.read().unwrap().authorize_calls
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn health_check(&self) -> Result<(), ActivityError> {
        if self.state.read().unwrap().healthy {
            Ok(())
        } else {
            Err(ActivityError::unavailable("gateway health check failed"))
        }
    }

    async fn initiate_payment(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<(), ActivityError> {
        let mut state = self.state.write().unwrap();
        state.initiate_calls += 1;
        if state.fail_on_initiate {
            return Err(ActivityError::server("gateway rejected initiation"));
        }
        tracing::debug!(reference = %instruction.reference, "payment initiated");
        Ok(())
    }

    async fn order_payment(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<GatewayResponse, ActivityError> {
        let mut state = self.state.write().unwrap();
        state.order_calls += 1;
        Ok(GatewayResponse::new(state.order_status.clone()))
    }

    async fn authorize_payment(
        &self,
        _instruction: &PaymentInstruction,
    ) -> Result<GatewayResponse, ActivityError> {
        let mut state = self.state.write().unwrap();
        state.authorize_calls += 1;
        Ok(GatewayResponse::new(state.authorize_status.clone()))
    }
}

#[cfg(test)]
mod tests {
    use domain::{Account, PaymentRequest};

    use super::*;

    fn instruction() -> PaymentInstruction {
        PaymentInstruction::from_request(PaymentRequest {
            debtor: Account::new("John Doe", "AU-0001"),
            creditor: Account::new("Jane Doe", "AU-0002"),
            amount_cents: 10000,
            currency: "AUD".to_owned(),
            reference: "REF-1".to_owned(),
            payment_date: None,
            priority: None,
        })
        .unwrap()
    }

    #[test]
    fn accepted_statuses_are_case_insensitive() {
        assert!(GatewayResponse::new("completed").is_accepted());
        assert!(GatewayResponse::new("SUCCESS").is_accepted());
        assert!(GatewayResponse::new("Success").is_accepted());
        assert!(!GatewayResponse::new("rejected").is_accepted());
        assert!(!GatewayResponse::new("").is_accepted());
    }

    #[tokio::test]
    async fn default_gateway_accepts_everything() {
        let gateway = InMemoryPaymentGateway::new();
        let instruction = instruction();

        gateway.health_check().await.unwrap();
        gateway.initiate_payment(&instruction).await.unwrap();
        assert!(gateway.order_payment(&instruction).await.unwrap().is_accepted());
        assert!(
            gateway
                .authorize_payment(&instruction)
                .await
                .unwrap()
                .is_accepted()
        );
        assert_eq!(gateway.initiate_calls(), 1);
        assert_eq!(gateway.order_calls(), 1);
        assert_eq!(gateway.authorize_calls(), 1);
    }

    #[tokio::test]
    async fn configured_rejection_is_not_accepted() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_authorize_status("declined");

        let response = gateway.authorize_payment(&instruction()).await.unwrap();
        assert!(!response.is_accepted());
    }

    #[tokio::test]
    async fn unhealthy_gateway_fails_the_probe() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_healthy(false);
        assert!(gateway.health_check().await.is_err());
    }
}
