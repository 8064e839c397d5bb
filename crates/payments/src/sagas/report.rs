//! The reporting pipeline, chained after a finished refund.

use std::sync::Arc;

use instance_store::SagaType;
use orchestrator::{SagaDefinition, StepDescriptor, StepOutcome};

use crate::context::PaymentContext;
use crate::steps;

/// Builds the reporting pipeline: `generate_reports → archive_payment`.
pub fn definition() -> SagaDefinition<PaymentContext> {
    let reports = StepDescriptor::new(
        steps::GENERATE_REPORTS,
        |ctx: Arc<PaymentContext>, _act| async move {
            ctx.services
                .back_office
                .generate_reports(&ctx.instruction)
                .await?;
            Ok(StepOutcome::Done)
        },
    );

    let archive = StepDescriptor::new(
        steps::ARCHIVE_PAYMENT,
        |ctx: Arc<PaymentContext>, _act| async move {
            ctx.services
                .back_office
                .archive_payment(&ctx.instruction)
                .await?;
            Ok(StepOutcome::Done)
        },
    );

    SagaDefinition::builder(SagaType::Report)
        .step(reports)
        .step(archive)
        .build()
}
