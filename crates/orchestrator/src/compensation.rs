//! LIFO stack of compensating actions.

use std::sync::Arc;

use crate::definition::CompensationFn;

/// One registered undo action, labelled for the instance record.
pub struct RegisteredCompensation<C> {
    /// Forward step whose effects this undoes.
    pub step: &'static str,
    /// Name of the compensating action.
    pub action: &'static str,
    pub(crate) run: CompensationFn<C>,
}

impl<C> RegisteredCompensation<C> {
    /// Runs the undo action.
    pub async fn run(&self, context: Arc<C>) -> Result<(), common::ActivityError> {
        (self.run)(context).await
    }
}

/// Undo actions for committed steps.
///
/// Append-only during forward execution; a compensation is pushed only after
/// its step committed, so a step that failed mid-flight is never compensated.
/// Drained strictly LIFO, one at a time.
pub struct CompensationStack<C> {
    entries: Vec<RegisteredCompensation<C>>,
}

impl<C> CompensationStack<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers the undo action for a committed step.
    pub fn push(&mut self, step: &'static str, action: &'static str, run: CompensationFn<C>) {
        self.entries.push(RegisteredCompensation { step, action, run });
    }

    /// Removes and returns the most recently registered compensation.
    pub fn pop(&mut self) -> Option<RegisteredCompensation<C>> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> Default for CompensationStack<C> {
    fn default() -> Self {
        Self::new()
    }
}
