//! Execution context shared by every step of a payment saga.

use std::sync::Arc;

use tokio::sync::mpsc;

use domain::PaymentInstruction;

use crate::services::{BackOffice, CrossBorderBank, LedgerDispatcher, PaymentGateway};

/// The collaborator set a saga executes against.
pub struct Services {
    pub gateway: Arc<dyn PaymentGateway>,
    pub ledger: Arc<dyn LedgerDispatcher>,
    pub bank: Arc<dyn CrossBorderBank>,
    pub back_office: Arc<dyn BackOffice>,
}

/// Child saga to chain off a running parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// Compensating refund pipeline after a failed post.
    Refund,
    /// Reporting pipeline after a completed refund.
    Report,
}

/// Request to start a detached child saga.
pub struct ChainRequest {
    pub kind: ChainKind,
    pub instruction: PaymentInstruction,
}

/// Everything a step closure needs: the immutable instruction, the
/// collaborators and the channel for chaining detached child sagas.
pub struct PaymentContext {
    pub instruction: PaymentInstruction,
    pub services: Arc<Services>,
    chain: mpsc::UnboundedSender<ChainRequest>,
}

impl PaymentContext {
    pub fn new(
        instruction: PaymentInstruction,
        services: Arc<Services>,
        chain: mpsc::UnboundedSender<ChainRequest>,
    ) -> Self {
        Self {
            instruction,
            services,
            chain,
        }
    }

    /// Asks the engine to start a detached child saga for this instruction.
    ///
    /// Delivery is fire-and-forget; the parent never waits on the child.
    pub fn chain(&self, kind: ChainKind) {
        let request = ChainRequest {
            kind,
            instruction: self.instruction.clone(),
        };
        if self.chain.send(request).is_err() {
            tracing::warn!(
                reference = %self.instruction.reference,
                ?kind,
                "chain channel closed, child saga dropped"
            );
        }
    }
}
