//! Ledger dispatch trait and in-memory implementation.
//!
//! The dispatcher is the message-bus producer seam: execution records and
//! postings are handed to the downstream ledger, which answers out-of-band.
//! Posted steps pass the completion token the ledger must echo back through
//! the completion channel.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::{ActivityError, CompletionToken};
use domain::PaymentInstruction;
use orchestrator::{CompletionBridge, CompletionResult};

/// One recorded hand-off to the ledger channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub reference: String,
    pub step: String,
    pub token: Option<CompletionToken>,
}

/// Contract of the message-bus producer towards the ledger.
#[async_trait]
pub trait LedgerDispatcher: Send + Sync {
    /// Hands the instruction to the downstream channel for `step`.
    ///
    /// Steps that expect an asynchronous confirmation pass a completion
    /// token; fire-and-forget steps pass `None`.
    async fn dispatch(
        &self,
        instruction: &PaymentInstruction,
        step: &str,
        token: Option<CompletionToken>,
    ) -> Result<(), ActivityError>;
}

#[derive(Debug)]
struct InMemoryLedgerState {
    dispatches: Vec<Dispatch>,
    fail_on_dispatch: bool,
    auto_resolve: bool,
    post_result: CompletionResult,
}

impl Default for InMemoryLedgerState {
    fn default() -> Self {
        Self {
            dispatches: Vec::new(),
            fail_on_dispatch: false,
            auto_resolve: true,
            post_result: CompletionResult::success(),
        }
    }
}

/// In-memory ledger that simulates the downstream round trip.
///
/// Token-carrying dispatches are resolved through the bridge on a spawned
/// task, as the real ledger would answer from another process.
#[derive(Clone)]
pub struct InMemoryLedgerDispatcher {
    bridge: CompletionBridge,
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryLedgerDispatcher {
    pub fn new(bridge: CompletionBridge) -> Self {
        Self {
            bridge,
            state: Arc::new(RwLock::new(InMemoryLedgerState::default())),
        }
    }

    /// Makes dispatch calls fail with a retryable server error.
    pub fn set_fail_on_dispatch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_dispatch = fail;
    }

    /// Turns the simulated downstream answer on or off.
    ///
    /// With auto-resolve off the test resolves tokens by hand.
    pub fn set_auto_resolve(&self, auto: bool) {
        self.state.write().unwrap().auto_resolve = auto;
    }

    /// Replaces the result the simulated ledger answers with.
    pub fn set_post_result(&self, result: CompletionResult) {
        self.state.write().unwrap().post_result = result;
    }

    /// All recorded dispatches in order.
    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.state.read().unwrap().dispatches.clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.state.read().unwrap().dispatches.len()
    }

    /// Token of the most recent token-carrying dispatch.
    pub fn last_token(&self) -> Option<CompletionToken> {
        self.state
            .read()
            .unwrap()
            .dispatches
            .iter()
            .rev()
            .find_map(|dispatch| dispatch.token)
    }
}

#[async_trait]
impl LedgerDispatcher for InMemoryLedgerDispatcher {
    async fn dispatch(
        &self,
        instruction: &PaymentInstruction,
        step: &str,
        token: Option<CompletionToken>,
    ) -> Result<(), ActivityError> {
        let (auto_resolve, post_result) = {
            let mut state = self.state.write().unwrap();
            if state.fail_on_dispatch {
                return Err(ActivityError::server("ledger channel unavailable"));
            }
            state.dispatches.push(Dispatch {
                reference: instruction.reference.clone(),
                step: step.to_owned(),
                token,
            });
            (state.auto_resolve, state.post_result.clone())
        };

        if let Some(token) = token
            && auto_resolve
        {
            let bridge = self.bridge.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                bridge.resolve(token, post_result);
            });
        }
        Ok(())
    }
}
