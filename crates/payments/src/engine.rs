//! Facade wiring the saga definitions to the orchestration engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use common::{CompletionToken, SagaId};
use domain::{PaymentInstruction, PaymentRequest};
use instance_store::InstanceStore;
use orchestrator::{
    CompletionBridge, CompletionResult, Delivery, EngineConfig, Orchestrator, SagaDefinition,
    SagaHandle, SignalOutcome, StatusSnapshot,
};

use crate::context::{ChainKind, ChainRequest, PaymentContext, Services};
use crate::error::Result;
use crate::sagas;

/// Which pipeline an inbound payment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Domestic,
    CrossBorder,
}

struct Definitions {
    domestic: Arc<SagaDefinition<PaymentContext>>,
    cross_border: Arc<SagaDefinition<PaymentContext>>,
    refund: Arc<SagaDefinition<PaymentContext>>,
    report: Arc<SagaDefinition<PaymentContext>>,
}

/// Entry point for payment processing.
///
/// Owns the orchestrator, the built saga definitions and the chain pump
/// that starts detached child sagas (refund after a failed post, report
/// after a finished refund).
pub struct PaymentEngine {
    orchestrator: Orchestrator,
    services: Arc<Services>,
    definitions: Definitions,
    chain_tx: mpsc::UnboundedSender<ChainRequest>,
}

impl PaymentEngine {
    /// Builds the engine and spawns its chain pump.
    ///
    /// The bridge is shared with the completion adapter that delivers
    /// out-of-band answers, so its tokens reach the sagas parked here.
    pub fn new(
        store: Arc<dyn InstanceStore>,
        config: EngineConfig,
        services: Services,
        bridge: CompletionBridge,
    ) -> Arc<Self> {
        let (chain_tx, chain_rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            orchestrator: Orchestrator::with_bridge(store, config, bridge),
            services: Arc::new(services),
            definitions: Definitions {
                domestic: Arc::new(sagas::domestic::definition()),
                cross_border: Arc::new(sagas::cross_border::definition()),
                refund: Arc::new(sagas::refund::definition()),
                report: Arc::new(sagas::report::definition()),
            },
            chain_tx,
        });
        Arc::clone(&engine).spawn_chain_pump(chain_rx);
        engine
    }

    /// Validates the request and starts the saga for it.
    ///
    /// The payment reference doubles as the saga id, so submitting the same
    /// reference twice is rejected instead of double-executing.
    pub async fn start_payment(
        &self,
        request: PaymentRequest,
        payment_type: PaymentType,
    ) -> Result<SagaHandle> {
        let instruction = PaymentInstruction::from_request(request)?;
        let id = SagaId::new(instruction.reference.clone());
        let definition = match payment_type {
            PaymentType::Domestic => &self.definitions.domestic,
            PaymentType::CrossBorder => &self.definitions.cross_border,
        };
        let context = self.context(instruction);
        let handle = self
            .orchestrator
            .start(Arc::clone(definition), id, context)
            .await?;
        Ok(handle)
    }

    /// Status snapshot of a saga instance.
    pub async fn query(&self, id: &SagaId) -> Result<StatusSnapshot> {
        Ok(self.orchestrator.query(id).await?)
    }

    /// Applies an external step-completion signal.
    pub async fn signal(&self, id: &SagaId, step: &str) -> Result<SignalOutcome> {
        Ok(self.orchestrator.signal(id, step).await?)
    }

    /// Delivers a completion event from the external channel.
    pub fn resolve_completion(&self, token: CompletionToken, result: CompletionResult) -> Delivery {
        self.orchestrator.resolve(token, result)
    }

    /// Requests cooperative cancellation of a saga.
    pub async fn cancel(&self, id: &SagaId) -> Result<()> {
        Ok(self.orchestrator.cancel(id).await?)
    }

    /// The collaborator set sagas execute against.
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    fn context(&self, instruction: PaymentInstruction) -> PaymentContext {
        PaymentContext::new(instruction, Arc::clone(&self.services), self.chain_tx.clone())
    }

    fn spawn_chain_pump(self: Arc<Self>, mut chain_rx: mpsc::UnboundedReceiver<ChainRequest>) {
        tokio::spawn(async move {
            while let Some(request) = chain_rx.recv().await {
                self.start_child(request).await;
            }
        });
    }

    /// Starts a detached child saga; a duplicate child is logged and
    /// dropped, never retried.
    async fn start_child(&self, request: ChainRequest) {
        let (definition, suffix) = match request.kind {
            ChainKind::Refund => (&self.definitions.refund, "refund"),
            ChainKind::Report => (&self.definitions.report, "report"),
        };
        let id = SagaId::new(format!("{}-{suffix}", request.instruction.reference));
        let context = self.context(request.instruction);
        match self
            .orchestrator
            .start(Arc::clone(definition), id.clone(), context)
            .await
        {
            Ok(_handle) => {
                tracing::info!(saga_id = %id, kind = ?request.kind, "child saga started");
            }
            Err(err) => {
                tracing::warn!(saga_id = %id, error = %err, "child saga not started");
            }
        }
    }
}
