//! Buffered external step-completion signals.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use common::SagaId;

/// Outcome of applying a signal to a saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The step has not committed yet; the signal is held until it does.
    Buffered,
    /// The step already committed; the signal is a no-op.
    AlreadyCompleted,
}

/// Per-saga buffer of signals that arrived before their step committed.
///
/// Signals only ever confirm steps; they never create or reorder
/// completed-step entries. The driver acknowledges a buffered signal when
/// the matching step commits and drops the rest when the saga finishes.
#[derive(Default)]
pub struct SignalHub {
    buffered: Mutex<HashMap<SagaId, HashSet<String>>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a signal for a step that has not committed yet.
    pub fn buffer(&self, id: &SagaId, step: &str) {
        self.buffered
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default()
            .insert(step.to_owned());
    }

    /// Consumes a buffered signal when its step commits.
    ///
    /// Returns `true` when a signal was pending for the step.
    pub fn acknowledge(&self, id: &SagaId, step: &str) -> bool {
        let mut buffered = self.buffered.lock().unwrap();
        let Some(steps) = buffered.get_mut(id) else {
            return false;
        };
        let pending = steps.remove(step);
        if steps.is_empty() {
            buffered.remove(id);
        }
        pending
    }

    /// Whether a signal is currently buffered for the step.
    pub fn is_buffered(&self, id: &SagaId, step: &str) -> bool {
        self.buffered
            .lock()
            .unwrap()
            .get(id)
            .is_some_and(|steps| steps.contains(step))
    }

    /// Drops all buffered signals for a finished saga.
    pub fn clear(&self, id: &SagaId) {
        self.buffered.lock().unwrap().remove(id);
    }
}
