//! Static saga definitions: steps, parallel groups and compensations.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use common::{ActivityError, CompletionToken};
use instance_store::SagaType;

use crate::executor::{ActivityContext, ActivityOptions};

/// What a forward activity asks the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step committed; the driver moves on.
    Done,
    /// The step handed work to an external system; the driver parks the saga
    /// on the token until the completion channel resolves it.
    Suspend(CompletionToken),
}

/// Forward action of a step.
pub type ActivityFn<C> = Arc<
    dyn Fn(Arc<C>, ActivityContext) -> BoxFuture<'static, Result<StepOutcome, ActivityError>>
        + Send
        + Sync,
>;

/// Undo action registered after a step commits.
pub type CompensationFn<C> =
    Arc<dyn Fn(Arc<C>) -> BoxFuture<'static, Result<(), ActivityError>> + Send + Sync>;

/// Hook invoked when a step fails terminally, before the unwind starts.
pub type FailureHook<C> =
    Arc<dyn Fn(Arc<C>, ActivityError) -> BoxFuture<'static, ()> + Send + Sync>;

/// Compensation declared for a step.
pub struct Compensation<C> {
    pub(crate) action: &'static str,
    pub(crate) run: CompensationFn<C>,
}

// Cloning shares the closure; the context type itself is never cloned, so
// no `C: Clone` bound leaks out of a derive.
impl<C> Clone for Compensation<C> {
    fn clone(&self) -> Self {
        Self {
            action: self.action,
            run: Arc::clone(&self.run),
        }
    }
}

/// One named unit of work in a saga.
///
/// Descriptors are defined statically per saga type and cloned into the
/// driver; the closures share ownership through `Arc`.
pub struct StepDescriptor<C> {
    pub(crate) name: &'static str,
    pub(crate) run: ActivityFn<C>,
    pub(crate) options: ActivityOptions,
    pub(crate) compensation: Option<Compensation<C>>,
    pub(crate) on_failure: Option<FailureHook<C>>,
}

impl<C> Clone for StepDescriptor<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            run: Arc::clone(&self.run),
            options: self.options.clone(),
            compensation: self.compensation.clone(),
            on_failure: self.on_failure.clone(),
        }
    }
}

impl<C> StepDescriptor<C> {
    /// Creates a step with default activity options and no compensation.
    pub fn new<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: Fn(Arc<C>, ActivityContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepOutcome, ActivityError>> + Send + 'static,
    {
        Self {
            name,
            run: Arc::new(move |ctx, act| Box::pin(run(ctx, act))),
            options: ActivityOptions::default(),
            compensation: None,
            on_failure: None,
        }
    }

    /// Replaces the step's time budgets and retry policy.
    pub fn with_options(mut self, options: ActivityOptions) -> Self {
        self.options = options;
        self
    }

    /// Declares the undo action for this step.
    ///
    /// The driver registers it only after the forward action has committed.
    pub fn with_compensation<F, Fut>(mut self, action: &'static str, run: F) -> Self
    where
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActivityError>> + Send + 'static,
    {
        self.compensation = Some(Compensation {
            action,
            run: Arc::new(move |ctx| Box::pin(run(ctx))),
        });
        self
    }

    /// Attaches a hook that runs when the step fails terminally.
    ///
    /// Used to chain detached child sagas, e.g. a refund after a failed post.
    pub fn on_failure<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<C>, ActivityError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_failure = Some(Arc::new(move |ctx, err| Box::pin(hook(ctx, err))));
        self
    }

    /// The step's name as recorded in `completed_steps`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether an undo action is declared.
    pub fn has_compensation(&self) -> bool {
        self.compensation.is_some()
    }
}

/// Immutable step graph for one saga type.
///
/// Steps are organized in levels: every step in a level runs concurrently,
/// levels run in order. A single-step level is the sequential case.
pub struct SagaDefinition<C> {
    saga_type: SagaType,
    levels: Vec<Vec<StepDescriptor<C>>>,
}

impl<C> SagaDefinition<C> {
    /// Starts building a definition for the given saga type.
    pub fn builder(saga_type: SagaType) -> SagaDefinitionBuilder<C> {
        SagaDefinitionBuilder {
            saga_type,
            levels: Vec::new(),
        }
    }

    /// The saga type this definition drives.
    pub fn saga_type(&self) -> SagaType {
        self.saga_type
    }

    /// The declared levels, outermost first.
    pub fn levels(&self) -> &[Vec<StepDescriptor<C>>] {
        &self.levels
    }

    /// Every step name in declaration order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.levels
            .iter()
            .flat_map(|level| level.iter().map(|step| step.name))
            .collect()
    }

    /// Total number of declared steps.
    pub fn step_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

/// Builder for [`SagaDefinition`].
pub struct SagaDefinitionBuilder<C> {
    saga_type: SagaType,
    levels: Vec<Vec<StepDescriptor<C>>>,
}

impl<C> SagaDefinitionBuilder<C> {
    /// Appends a sequential step.
    pub fn step(mut self, step: StepDescriptor<C>) -> Self {
        self.levels.push(vec![step]);
        self
    }

    /// Appends a group of steps that run concurrently.
    ///
    /// Commit order within the group follows declaration order, not
    /// completion order, so unwind order stays reproducible.
    pub fn parallel(mut self, steps: impl IntoIterator<Item = StepDescriptor<C>>) -> Self {
        let group: Vec<_> = steps.into_iter().collect();
        assert!(!group.is_empty(), "parallel group must not be empty");
        self.levels.push(group);
        self
    }

    /// Finishes the definition.
    ///
    /// # Panics
    ///
    /// Panics when no step was declared.
    pub fn build(self) -> SagaDefinition<C> {
        assert!(
            !self.levels.is_empty(),
            "saga definition must declare at least one step"
        );
        SagaDefinition {
            saga_type: self.saga_type,
            levels: self.levels,
        }
    }
}
