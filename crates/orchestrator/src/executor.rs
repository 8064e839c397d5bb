//! Single-activity execution: timeouts, heartbeats and transparent retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::time::{Instant, sleep, timeout};

use common::{ActivityError, CompletionToken};

use crate::bridge::CompletionBridge;
use crate::definition::{StepDescriptor, StepOutcome};
use crate::retry::RetryPolicy;

/// Time budgets and retry policy for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityOptions {
    /// How failed attempts are retried.
    pub retry: RetryPolicy,
    /// Wall-clock budget for a single attempt.
    pub start_to_close: Duration,
    /// Overall budget across all attempts, backoff sleeps and suspension.
    pub schedule_to_close: Duration,
    /// Liveness budget for long-running steps; a missed beat fails the
    /// attempt like a crashed worker.
    pub heartbeat_timeout: Option<Duration>,
}

impl Default for ActivityOptions {
    /// Stock payment budgets: 2s per attempt inside an overall 5000s window.
    fn default() -> Self {
        Self {
            retry: RetryPolicy::standard(),
            start_to_close: Duration::from_secs(2),
            schedule_to_close: Duration::from_secs(5000),
            heartbeat_timeout: None,
        }
    }
}

impl ActivityOptions {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_start_to_close(mut self, budget: Duration) -> Self {
        self.start_to_close = budget;
        self
    }

    pub fn with_schedule_to_close(mut self, budget: Duration) -> Self {
        self.schedule_to_close = budget;
        self
    }

    pub fn with_heartbeat_timeout(mut self, budget: Duration) -> Self {
        self.heartbeat_timeout = Some(budget);
        self
    }
}

/// Handle passed to every activity attempt.
#[derive(Clone)]
pub struct ActivityContext {
    heartbeat: Option<mpsc::UnboundedSender<()>>,
    bridge: CompletionBridge,
}

impl ActivityContext {
    pub(crate) fn new(bridge: CompletionBridge, heartbeat: Option<mpsc::UnboundedSender<()>>) -> Self {
        Self { heartbeat, bridge }
    }

    /// Signals liveness to the heartbeat watchdog.
    ///
    /// No-op for steps without a heartbeat timeout.
    pub fn record_heartbeat(&self) {
        if let Some(beats) = &self.heartbeat {
            let _ = beats.send(());
        }
    }

    /// Opens a completion slot and returns its token.
    ///
    /// Return [`StepOutcome::Suspend`] with the token to park the saga on
    /// the slot after the attempt commits.
    pub fn open_completion(&self) -> CompletionToken {
        self.bridge.issue()
    }
}

/// Runs one step to a final verdict, retrying transparently per policy.
///
/// Every attempt holds one worker-pool permit; backoff sleeps and any later
/// suspension do not. Only the final classified error surfaces. `deadline`
/// is the step's schedule-to-close cutoff; the driver keeps the same cutoff
/// for any suspension that follows, so attempts and the wait share one
/// budget.
pub(crate) async fn execute<C: Send + Sync + 'static>(
    step: &StepDescriptor<C>,
    context: &Arc<C>,
    bridge: &CompletionBridge,
    pool: &Arc<Semaphore>,
    deadline: Instant,
) -> Result<StepOutcome, ActivityError> {
    let options = &step.options;
    let mut attempt: u32 = 1;

    loop {
        let permit = Arc::clone(pool)
            .acquire_owned()
            .await
            .map_err(|_| ActivityError::unknown("worker pool closed"))?;

        if Instant::now() >= deadline {
            return Err(ActivityError::timeout(format!(
                "step '{}' exceeded its schedule-to-close budget",
                step.name
            )));
        }

        let result = run_attempt(step, context, bridge).await;
        drop(permit);

        match result {
            Ok(outcome) => return Ok(outcome),
            Err(err) => {
                if !options.retry.permits(err.kind, attempt) {
                    return Err(err);
                }
                metrics::counter!("activity_retries_total").increment(1);
                let delay = options.retry.delay(attempt);
                tracing::debug!(
                    step = step.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying activity"
                );
                if Instant::now() + delay >= deadline {
                    return Err(ActivityError::timeout(format!(
                        "step '{}' exceeded its schedule-to-close budget while backing off",
                        step.name
                    )));
                }
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

async fn run_attempt<C: Send + Sync + 'static>(
    step: &StepDescriptor<C>,
    context: &Arc<C>,
    bridge: &CompletionBridge,
) -> Result<StepOutcome, ActivityError> {
    match step.options.heartbeat_timeout {
        None => {
            let activity = ActivityContext::new(bridge.clone(), None);
            run_timed(step, context, activity).await
        }
        Some(interval) => {
            let (beats_tx, beats_rx) = mpsc::unbounded_channel();
            let activity = ActivityContext::new(bridge.clone(), Some(beats_tx));
            tokio::select! {
                result = run_timed(step, context, activity) => result,
                () = heartbeat_watchdog(interval, beats_rx) => Err(ActivityError::unavailable(
                    format!("step '{}' missed its heartbeat", step.name),
                )),
            }
        }
    }
}

async fn run_timed<C: Send + Sync + 'static>(
    step: &StepDescriptor<C>,
    context: &Arc<C>,
    activity: ActivityContext,
) -> Result<StepOutcome, ActivityError> {
    match timeout(step.options.start_to_close, (step.run)(Arc::clone(context), activity)).await {
        Ok(result) => result,
        Err(_) => Err(ActivityError::timeout(format!(
            "step '{}' exceeded its start-to-close budget",
            step.name
        ))),
    }
}

/// Resolves once `interval` elapses without a heartbeat.
async fn heartbeat_watchdog(interval: Duration, mut beats: mpsc::UnboundedReceiver<()>) {
    loop {
        match timeout(interval, beats.recv()).await {
            Ok(Some(())) => {}
            // Sender gone: either the attempt is finishing, in which case its
            // branch wins the select immediately, or the activity dropped its
            // context while still running and can no longer beat. Let the
            // current countdown run out instead of parking forever.
            Ok(None) => {
                sleep(interval).await;
                return;
            }
            Err(_) => return,
        }
    }
}
