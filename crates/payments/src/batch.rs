//! Periodic batch submission of synthetic payments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use common::{ActivityError, SagaId};
use domain::{Account, PaymentRequest};

use crate::engine::{PaymentEngine, PaymentType};

/// Intake seam the batch scheduler submits through.
#[async_trait]
pub trait PaymentIntake: Send + Sync {
    /// Liveness probe run before a batch is generated.
    async fn health_check(&self) -> Result<(), ActivityError>;

    /// Submits one payment and returns the saga id it started.
    async fn submit(&self, request: PaymentRequest) -> Result<SagaId, ActivityError>;
}

#[async_trait]
impl PaymentIntake for PaymentEngine {
    async fn health_check(&self) -> Result<(), ActivityError> {
        self.services().gateway.health_check().await
    }

    async fn submit(&self, request: PaymentRequest) -> Result<SagaId, ActivityError> {
        let handle = self
            .start_payment(request, PaymentType::Domestic)
            .await
            .map_err(|err| ActivityError::server(err.to_string()))?;
        Ok(handle.id().clone())
    }
}

/// Result of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchSummary {
    pub payment_type: String,
    pub submitted: u32,
    pub failed: u32,
}

/// Spawns bounded-random batches of domestic sagas.
///
/// Individual submissions fail independently; a failed child never aborts
/// the batch.
pub struct BatchScheduler {
    intake: Arc<dyn PaymentIntake>,
}

impl BatchScheduler {
    pub fn new(intake: Arc<dyn PaymentIntake>) -> Self {
        Self { intake }
    }

    /// Runs one batch: health-check, then 5 to 10 synthetic payments
    /// submitted concurrently, then the batch notification.
    pub async fn run_once(&self, payment_type: &str) -> Result<BatchSummary, ActivityError> {
        self.intake.health_check().await?;

        let count = rand::thread_rng().gen_range(5..=10);
        let requests: Vec<PaymentRequest> = (0..count).map(|_| synthetic_request()).collect();

        let results = futures_util::future::join_all(
            requests
                .into_iter()
                .map(|request| self.intake.submit(request)),
        )
        .await;

        let mut submitted = 0u32;
        let mut failed = 0u32;
        for result in results {
            match result {
                Ok(id) => {
                    submitted += 1;
                    tracing::debug!(saga_id = %id, "batch payment submitted");
                }
                Err(err) => {
                    failed += 1;
                    tracing::warn!(error = %err, "batch payment rejected");
                }
            }
        }

        metrics::counter!("batch_payments_submitted_total").increment(u64::from(submitted));
        tracing::info!(payment_type, submitted, failed, "batch completed");
        Ok(BatchSummary {
            payment_type: payment_type.to_owned(),
            submitted,
            failed,
        })
    }

    /// Cron-like wiring: runs a batch every `interval`.
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        payment_type: String,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the service
            // settles before the first batch.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once(&payment_type).await {
                    tracing::warn!(error = %err, "scheduled batch skipped");
                }
            }
        })
    }
}

fn synthetic_request() -> PaymentRequest {
    PaymentRequest {
        debtor: Account::new("John Doe", "AU-0001"),
        creditor: Account::new("Jane Doe", "AU-0002"),
        amount_cents: 10000,
        currency: "AUD".to_owned(),
        reference: format!("REF-{}", Uuid::new_v4()),
        payment_date: None,
        priority: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Default)]
    struct RecordingIntake {
        healthy: AtomicBool,
        reject: AtomicBool,
        submitted: Mutex<Vec<String>>,
    }

    impl RecordingIntake {
        fn healthy() -> Arc<Self> {
            let intake = Arc::new(Self::default());
            intake.healthy.store(true, Ordering::SeqCst);
            intake
        }
    }

    #[async_trait]
    impl PaymentIntake for RecordingIntake {
        async fn health_check(&self) -> Result<(), ActivityError> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(ActivityError::unavailable("intake down"))
            }
        }

        async fn submit(&self, request: PaymentRequest) -> Result<SagaId, ActivityError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(ActivityError::server("intake rejected"));
            }
            self.submitted
                .lock()
                .unwrap()
                .push(request.reference.clone());
            Ok(SagaId::new(request.reference))
        }
    }

    #[tokio::test]
    async fn batch_submits_between_five_and_ten_payments() {
        let intake = RecordingIntake::healthy();
        let scheduler = BatchScheduler::new(Arc::clone(&intake) as Arc<dyn PaymentIntake>);

        let summary = scheduler.run_once("domestic").await.unwrap();
        assert!((5..=10).contains(&summary.submitted));
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.payment_type, "domestic");

        let submitted = intake.submitted.lock().unwrap();
        assert_eq!(submitted.len() as u32, summary.submitted);
        // Every synthetic reference is unique.
        let mut unique = submitted.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), submitted.len());
        assert!(submitted.iter().all(|r| r.starts_with("REF-")));
    }

    #[tokio::test]
    async fn failed_health_check_skips_the_batch() {
        let intake = Arc::new(RecordingIntake::default());
        let scheduler = BatchScheduler::new(Arc::clone(&intake) as Arc<dyn PaymentIntake>);

        let err = scheduler.run_once("domestic").await.unwrap_err();
        assert_eq!(err.kind, common::ErrorKind::Unavailable);
        assert!(intake.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_submissions_never_abort_the_batch() {
        let intake = RecordingIntake::healthy();
        intake.reject.store(true, Ordering::SeqCst);
        let scheduler = BatchScheduler::new(Arc::clone(&intake) as Arc<dyn PaymentIntake>);

        let summary = scheduler.run_once("domestic").await.unwrap();
        assert_eq!(summary.submitted, 0);
        assert!((5..=10).contains(&summary.failed));
    }
}
