//! Suspension slots resolved by external completion events.
//!
//! A step that dispatches work to a downstream system opens a slot, embeds
//! the slot's token in the dispatch and suspends. The external completion
//! channel later delivers `{token, result}` from any task or thread; the
//! bridge fulfils at most one waiter per token and ignores everything else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::timeout;

use common::{ActivityError, CompletionToken};

/// Terminal verdict carried by a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    Success,
    Failure,
}

/// Payload delivered by the completion channel for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub outcome: CompletionOutcome,
    #[serde(default)]
    pub message: Option<String>,
}

impl CompletionResult {
    pub fn success() -> Self {
        Self {
            outcome: CompletionOutcome::Success,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outcome: CompletionOutcome::Failure,
            message: Some(message.into()),
        }
    }

    /// Whether the downstream system reported success.
    pub fn is_success(&self) -> bool {
        self.outcome == CompletionOutcome::Success
    }
}

/// How a delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A parked waiter was woken.
    Resolved,
    /// No waiter yet; the result is held until the saga parks.
    Parked,
    /// Unknown or already-resolved token; dropped without error.
    Ignored,
}

enum Slot {
    /// Issued, no waiter and no result yet.
    Open,
    /// Result arrived before the saga parked.
    Ready(CompletionResult),
    /// Saga is parked on the token.
    Waiting(oneshot::Sender<CompletionResult>),
}

/// Concurrent map of token to single-resolution slot.
///
/// Clones share the same slot map.
#[derive(Clone, Default)]
pub struct CompletionBridge {
    slots: Arc<Mutex<HashMap<CompletionToken, Slot>>>,
}

impl CompletionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh slot and returns its token.
    pub fn issue(&self) -> CompletionToken {
        let token = CompletionToken::new();
        self.slots.lock().unwrap().insert(token, Slot::Open);
        token
    }

    /// Delivers a completion event.
    ///
    /// At most one delivery resolves a token; duplicates and unknown tokens
    /// are accepted and ignored, so at-least-once channels are safe.
    pub fn resolve(&self, token: CompletionToken, result: CompletionResult) -> Delivery {
        let mut slots = self.slots.lock().unwrap();
        match slots.remove(&token) {
            Some(Slot::Waiting(tx)) => {
                let _ = tx.send(result);
                Delivery::Resolved
            }
            Some(Slot::Open) => {
                slots.insert(token, Slot::Ready(result));
                Delivery::Parked
            }
            Some(ready @ Slot::Ready(_)) => {
                slots.insert(token, ready);
                Delivery::Ignored
            }
            None => Delivery::Ignored,
        }
    }

    /// Parks until the token resolves or `budget` elapses.
    ///
    /// Runs on the saga driver task and holds no worker-pool permit. On
    /// timeout the slot is removed so a late delivery becomes a no-op.
    pub async fn wait(
        &self,
        token: CompletionToken,
        budget: Duration,
    ) -> Result<CompletionResult, ActivityError> {
        let rx = {
            let mut slots = self.slots.lock().unwrap();
            match slots.remove(&token) {
                Some(Slot::Ready(result)) => return Ok(result),
                _ => {
                    let (tx, rx) = oneshot::channel();
                    slots.insert(token, Slot::Waiting(tx));
                    rx
                }
            }
        };

        match timeout(budget, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(ActivityError::unknown("completion slot dropped")),
            Err(_) => {
                self.slots.lock().unwrap().remove(&token);
                Err(ActivityError::timeout(
                    "suspended step timed out waiting for external completion",
                ))
            }
        }
    }

    /// Number of tokens with an unconsumed slot.
    pub fn open_slots(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}
