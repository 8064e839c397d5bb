//! The refund pipeline, started as a detached child of a failed payment.

use std::sync::Arc;

use instance_store::SagaType;
use orchestrator::{SagaDefinition, StepDescriptor, StepOutcome};

use crate::context::{ChainKind, PaymentContext};
use crate::steps;

/// Builds the refund pipeline: `refund_payment → reconcile_payment →
/// send_notification`. A finished refund chains a detached reporting saga
/// for the same instruction.
pub fn definition() -> SagaDefinition<PaymentContext> {
    let refund = StepDescriptor::new(
        steps::REFUND_PAYMENT,
        |ctx: Arc<PaymentContext>, _act| async move {
            ctx.services.back_office.refund_payment(&ctx.instruction).await?;
            Ok(StepOutcome::Done)
        },
    );

    let reconcile = StepDescriptor::new(
        steps::RECONCILE_PAYMENT,
        |ctx: Arc<PaymentContext>, _act| async move {
            ctx.services
                .back_office
                .reconcile_payment(&ctx.instruction)
                .await?;
            Ok(StepOutcome::Done)
        },
    );

    let notify = StepDescriptor::new(
        steps::SEND_NOTIFICATION,
        |ctx: Arc<PaymentContext>, _act| async move {
            ctx.services
                .back_office
                .send_notification(&ctx.instruction)
                .await?;
            // Reporting follows every finished refund.
            ctx.chain(ChainKind::Report);
            Ok(StepOutcome::Done)
        },
    );

    SagaDefinition::builder(SagaType::Refund)
        .step(refund)
        .step(reconcile)
        .step(notify)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_the_three_refund_steps() {
        let definition = definition();
        assert_eq!(definition.saga_type(), SagaType::Refund);
        assert_eq!(
            definition.step_names(),
            vec![
                steps::REFUND_PAYMENT,
                steps::RECONCILE_PAYMENT,
                steps::SEND_NOTIFICATION,
            ]
        );
    }
}
