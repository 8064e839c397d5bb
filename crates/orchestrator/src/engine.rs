//! The saga runtime: instance lifecycle, step scheduling and compensation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;

use common::{ActivityError, CompletionToken, ErrorKind, SagaId};
use instance_store::{
    CompensationRecord, FailureDetail, InstanceStore, SagaInstance, SagaStatus, SagaType,
};

use crate::bridge::{CompletionBridge, CompletionResult, Delivery};
use crate::compensation::CompensationStack;
use crate::definition::{SagaDefinition, StepDescriptor, StepOutcome};
use crate::error::{EngineError, Result};
use crate::executor;
use crate::signal::{SignalHub, SignalOutcome};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Concurrent activity attempts across all sagas.
    pub worker_slots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { worker_slots: 16 }
    }
}

/// Read-only view of a saga instance, safe to hand to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub id: SagaId,
    pub saga_type: SagaType,
    pub status: SagaStatus,
    pub completed_steps: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure: Option<FailureDetail>,
    pub compensations: Vec<CompensationRecord>,
}

impl From<SagaInstance> for StatusSnapshot {
    fn from(instance: SagaInstance) -> Self {
        Self {
            id: instance.id,
            saga_type: instance.saga_type,
            status: instance.status,
            completed_steps: instance.completed_steps,
            started_at: instance.started_at,
            ended_at: instance.ended_at,
            failure: instance.failure,
            compensations: instance.compensations,
        }
    }
}

/// Handle to a running saga.
#[derive(Debug, Clone)]
pub struct SagaHandle {
    id: SagaId,
    status: watch::Receiver<SagaStatus>,
}

impl SagaHandle {
    pub fn id(&self) -> &SagaId {
        &self.id
    }

    /// Last status published by the driver.
    pub fn status(&self) -> SagaStatus {
        *self.status.borrow()
    }

    /// Waits until the saga reaches a terminal status.
    pub async fn finished(&self) -> SagaStatus {
        let mut status = self.status.clone();
        loop {
            let current = *status.borrow_and_update();
            if current.is_terminal() {
                return current;
            }
            if status.changed().await.is_err() {
                return *status.borrow();
            }
        }
    }
}

/// Drives saga instances against their definitions.
///
/// One logical task owns each instance; queries and signals go through the
/// store and the signal hub, never through shared mutable instance state.
pub struct Orchestrator {
    store: Arc<dyn InstanceStore>,
    bridge: CompletionBridge,
    signals: Arc<SignalHub>,
    pool: Arc<Semaphore>,
    cancels: Arc<Mutex<HashMap<SagaId, watch::Sender<bool>>>>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn InstanceStore>, config: EngineConfig) -> Self {
        Self::with_bridge(store, config, CompletionBridge::new())
    }

    /// Builds the engine around an existing bridge, shared with whatever
    /// adapter delivers external completions.
    pub fn with_bridge(
        store: Arc<dyn InstanceStore>,
        config: EngineConfig,
        bridge: CompletionBridge,
    ) -> Self {
        Self {
            store,
            bridge,
            signals: Arc::new(SignalHub::new()),
            pool: Arc::new(Semaphore::new(config.worker_slots)),
            cancels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The bridge external completion adapters deliver into.
    pub fn bridge(&self) -> &CompletionBridge {
        &self.bridge
    }

    /// Starts a saga instance and spawns its driver task.
    ///
    /// The id is the payment reference; a second start for the same id is
    /// rejected with [`EngineError::AlreadyStarted`].
    pub async fn start<C>(
        &self,
        definition: Arc<SagaDefinition<C>>,
        id: SagaId,
        context: C,
    ) -> Result<SagaHandle>
    where
        C: Send + Sync + 'static,
    {
        if self.store.load(&id).await?.is_some() {
            return Err(EngineError::AlreadyStarted(id));
        }

        let mut instance = SagaInstance::new(id.clone(), definition.saga_type());
        instance.begin();
        self.store.save(&instance).await?;

        metrics::counter!("saga_started_total", "saga_type" => definition.saga_type().as_str())
            .increment(1);
        tracing::info!(saga_id = %id, saga_type = %definition.saga_type(), "saga started");

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(SagaStatus::Running);
        self.cancels.lock().unwrap().insert(id.clone(), cancel_tx);

        let driver = Driver {
            store: Arc::clone(&self.store),
            bridge: self.bridge.clone(),
            signals: Arc::clone(&self.signals),
            pool: Arc::clone(&self.pool),
            cancels: Arc::clone(&self.cancels),
        };
        let handle = SagaHandle {
            id,
            status: status_rx,
        };
        tokio::spawn(async move {
            driver
                .drive(definition, instance, Arc::new(context), cancel_rx, status_tx)
                .await;
        });
        Ok(handle)
    }

    /// Snapshot of an instance, read from the store.
    pub async fn query(&self, id: &SagaId) -> Result<StatusSnapshot> {
        let instance = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        Ok(instance.into())
    }

    /// Applies an external step-completion signal.
    ///
    /// A signal for a step that already committed, or for a saga that
    /// already finished, is a no-op; anything else is buffered and
    /// acknowledged when the step commits.
    pub async fn signal(&self, id: &SagaId, step: &str) -> Result<SignalOutcome> {
        let instance = self
            .store
            .load(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;

        if instance.status.is_terminal() || instance.completed_steps.iter().any(|s| s == step) {
            return Ok(SignalOutcome::AlreadyCompleted);
        }
        self.signals.buffer(id, step);
        tracing::debug!(saga_id = %id, step, "signal buffered");
        Ok(SignalOutcome::Buffered)
    }

    /// Delivers a completion event from the external channel.
    pub fn resolve(&self, token: CompletionToken, result: CompletionResult) -> Delivery {
        let delivery = self.bridge.resolve(token, result);
        tracing::debug!(%token, ?delivery, "completion delivered");
        delivery
    }

    /// Requests cooperative cancellation.
    ///
    /// The driver checks the flag between step groups; committed work is
    /// unwound and the saga ends `Cancelled`. In-flight attempts are only
    /// stopped by their own timeouts.
    pub async fn cancel(&self, id: &SagaId) -> Result<()> {
        if self.store.load(id).await?.is_none() {
            return Err(EngineError::NotFound(id.clone()));
        }
        if let Some(flag) = self.cancels.lock().unwrap().get(id) {
            let _ = flag.send(true);
            tracing::info!(saga_id = %id, "cancellation requested");
        }
        Ok(())
    }
}

enum ForwardEnd {
    Completed,
    Cancelled,
    Failed(FailureDetail),
}

/// Per-saga execution state shared by the driver task.
struct Driver {
    store: Arc<dyn InstanceStore>,
    bridge: CompletionBridge,
    signals: Arc<SignalHub>,
    pool: Arc<Semaphore>,
    cancels: Arc<Mutex<HashMap<SagaId, watch::Sender<bool>>>>,
}

impl Driver {
    #[tracing::instrument(skip_all, fields(saga_id = %instance.id, saga_type = %instance.saga_type))]
    async fn drive<C: Send + Sync + 'static>(
        self,
        definition: Arc<SagaDefinition<C>>,
        mut instance: SagaInstance,
        context: Arc<C>,
        cancel: watch::Receiver<bool>,
        status_tx: watch::Sender<SagaStatus>,
    ) {
        let started = std::time::Instant::now();
        let mut stack = CompensationStack::new();

        let end = self
            .run_forward(&definition, &mut instance, &context, &mut stack, &cancel)
            .await;

        match end {
            ForwardEnd::Completed => {
                instance.complete();
                metrics::counter!("saga_completed_total").increment(1);
                tracing::info!("saga completed");
            }
            ForwardEnd::Cancelled => {
                self.unwind(&mut instance, &mut stack, &context).await;
                instance.cancel();
                tracing::info!("saga cancelled");
            }
            ForwardEnd::Failed(failure) => {
                let had_compensations = !stack.is_empty();
                instance.begin_compensation(failure);
                self.save(&instance).await;
                self.unwind(&mut instance, &mut stack, &context).await;
                if had_compensations {
                    instance.mark_compensated();
                } else {
                    instance.fail();
                }
                metrics::counter!("saga_failed_total").increment(1);
                tracing::warn!(status = %instance.status, "saga ended in failure");
            }
        }

        self.save(&instance).await;
        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());

        self.signals.clear(&instance.id);
        self.cancels.lock().unwrap().remove(&instance.id);
        let _ = status_tx.send(instance.status);
    }

    async fn run_forward<C: Send + Sync + 'static>(
        &self,
        definition: &SagaDefinition<C>,
        instance: &mut SagaInstance,
        context: &Arc<C>,
        stack: &mut CompensationStack<C>,
        cancel: &watch::Receiver<bool>,
    ) -> ForwardEnd {
        for level in definition.levels() {
            if *cancel.borrow() {
                return ForwardEnd::Cancelled;
            }
            if let Err(failure) = self.run_group(level, instance, context, stack).await {
                return ForwardEnd::Failed(failure);
            }
        }
        ForwardEnd::Completed
    }

    /// Dispatches one parallel group and commits it atomically.
    ///
    /// Fail-fast: the first failure wins; outstanding siblings keep running
    /// detached for observability, their results are ignored. Commit order
    /// follows declaration order, not completion order.
    async fn run_group<C: Send + Sync + 'static>(
        &self,
        group: &[StepDescriptor<C>],
        instance: &mut SagaInstance,
        context: &Arc<C>,
        stack: &mut CompensationStack<C>,
    ) -> std::result::Result<(), FailureDetail> {
        if let Some(first) = group.first() {
            instance.current_step = Some(first.name.to_owned());
        }
        self.save(instance).await;

        let mut results: Vec<Option<StepOutcome>> = Vec::new();
        results.resize_with(group.len(), || None);

        // One schedule-to-close cutoff per step, fixed at dispatch; a later
        // suspension spends whatever the attempts left of the same budget.
        let deadlines: Vec<Instant> = group
            .iter()
            .map(|step| Instant::now() + step.options.schedule_to_close)
            .collect();

        let mut join = JoinSet::new();
        let mut task_steps: HashMap<tokio::task::Id, usize> = HashMap::new();
        for (index, step) in group.iter().enumerate() {
            let step = step.clone();
            let step_context = Arc::clone(context);
            let bridge = self.bridge.clone();
            let pool = Arc::clone(&self.pool);
            let deadline = deadlines[index];
            let task = join.spawn(async move {
                let result = executor::execute(&step, &step_context, &bridge, &pool, deadline).await;
                (index, result)
            });
            task_steps.insert(task.id(), index);
        }

        let mut failed: Option<(usize, ActivityError)> = None;
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((index, Ok(outcome))) => results[index] = Some(outcome),
                Ok((index, Err(err))) => {
                    failed = Some((index, err));
                    break;
                }
                Err(err) => {
                    let index = task_steps.get(&err.id()).copied().unwrap_or(0);
                    failed = Some((
                        index,
                        ActivityError::unknown(format!("step task failed: {err}")),
                    ));
                    break;
                }
            }
        }

        if let Some((index, err)) = failed {
            join.detach_all();
            return Err(self.step_failed(&group[index], err, context).await);
        }

        for (index, step) in group.iter().enumerate() {
            let Some(outcome) = results[index].take() else {
                continue;
            };

            if let StepOutcome::Suspend(token) = outcome
                && let Err(err) = self
                    .await_completion(step, token, instance, deadlines[index])
                    .await
            {
                return Err(self.step_failed(step, err, context).await);
            }

            instance.record_step(step.name);
            if self.signals.acknowledge(&instance.id, step.name) {
                tracing::debug!(step = step.name, "buffered signal acknowledged");
            }
            if let Some(compensation) = &step.compensation {
                stack.push(step.name, compensation.action, Arc::clone(&compensation.run));
            }
            self.save(instance).await;
            tracing::info!(step = step.name, "step committed");
        }
        Ok(())
    }

    /// Parks the saga on a completion token until the external channel
    /// resolves it or the remainder of the step's schedule-to-close budget
    /// elapses.
    async fn await_completion<C>(
        &self,
        step: &StepDescriptor<C>,
        token: CompletionToken,
        instance: &mut SagaInstance,
        deadline: Instant,
    ) -> std::result::Result<(), ActivityError> {
        instance.suspend(token);
        self.save(instance).await;
        tracing::info!(step = step.name, %token, "saga suspended awaiting completion");

        let budget = deadline.saturating_duration_since(Instant::now());
        let result = self.bridge.wait(token, budget).await;
        instance.resume();

        match result {
            Ok(completion) if completion.is_success() => Ok(()),
            Ok(completion) => Err(ActivityError::new(
                ErrorKind::Server,
                completion
                    .message
                    .unwrap_or_else(|| "external completion reported failure".to_owned()),
            )),
            Err(err) => Err(err),
        }
    }

    /// Records a terminal step failure and runs the step's failure hook.
    async fn step_failed<C>(
        &self,
        step: &StepDescriptor<C>,
        err: ActivityError,
        context: &Arc<C>,
    ) -> FailureDetail {
        tracing::warn!(step = step.name, error = %err, "step failed");
        if let Some(hook) = &step.on_failure {
            hook(Arc::clone(context), err.clone()).await;
        }
        FailureDetail::new(step.name, err.kind, err.message)
    }

    /// Drains the compensation stack sequentially in reverse registration
    /// order. A compensation's own failure is recorded and logged but never
    /// halts the unwind.
    async fn unwind<C>(
        &self,
        instance: &mut SagaInstance,
        stack: &mut CompensationStack<C>,
        context: &Arc<C>,
    ) {
        while let Some(entry) = stack.pop() {
            tracing::info!(step = entry.step, action = entry.action, "compensating");
            metrics::counter!("compensations_total").increment(1);

            let record = match entry.run(Arc::clone(context)).await {
                Ok(()) => CompensationRecord::succeeded(entry.step, entry.action),
                Err(err) => {
                    tracing::warn!(
                        step = entry.step,
                        action = entry.action,
                        error = %err,
                        "compensation failed"
                    );
                    CompensationRecord::failed(entry.step, entry.action, err.to_string())
                }
            };
            instance.record_compensation(record);
            self.save(instance).await;
        }
    }

    /// Best-effort save-point; persistence failures are logged, not fatal.
    async fn save(&self, instance: &SagaInstance) {
        if let Err(err) = self.store.save(instance).await {
            tracing::error!(saga_id = %instance.id, error = %err, "failed to persist save-point");
        }
    }
}
