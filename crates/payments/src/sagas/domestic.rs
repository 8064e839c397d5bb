//! The domestic payment pipeline.

use std::sync::Arc;
use std::time::Duration;

use common::ActivityError;
use instance_store::SagaType;
use orchestrator::{ActivityOptions, SagaDefinition, StepDescriptor, StepOutcome};

use crate::context::{ChainKind, PaymentContext};
use crate::steps;

/// Builds the ten-step domestic pipeline:
///
/// `initiate → [manage_order, authorize] → execute → [clear_and_settle,
/// send_notification, reconcile] → post (suspends on the ledger) → reports
/// → archive`.
///
/// The first parallel pair carries no compensation; nothing has committed
/// yet, so a rejection fails the saga immediately. A terminally failed post
/// starts a detached refund child before the parent fails.
pub fn definition() -> SagaDefinition<PaymentContext> {
    let initiate = StepDescriptor::new(
        steps::INITIATE_PAYMENT,
        |ctx: Arc<PaymentContext>, act| async move {
            act.record_heartbeat();
            ctx.services
                .gateway
                .initiate_payment(&ctx.instruction)
                .await?;
            act.record_heartbeat();
            Ok(StepOutcome::Done)
        },
    )
    .with_options(
        ActivityOptions::default()
            .with_start_to_close(Duration::from_secs(30))
            .with_heartbeat_timeout(Duration::from_secs(10)),
    );

    let manage_order = StepDescriptor::new(
        steps::MANAGE_ORDER,
        |ctx: Arc<PaymentContext>, _act| async move {
            let response = ctx.services.gateway.order_payment(&ctx.instruction).await?;
            if response.is_accepted() {
                Ok(StepOutcome::Done)
            } else {
                Err(ActivityError::auth(format!(
                    "order rejected with status '{}'",
                    response.status
                )))
            }
        },
    );

    let authorize = StepDescriptor::new(
        steps::AUTHORIZE_PAYMENT,
        |ctx: Arc<PaymentContext>, _act| async move {
            let response = ctx
                .services
                .gateway
                .authorize_payment(&ctx.instruction)
                .await?;
            if response.is_accepted() {
                Ok(StepOutcome::Done)
            } else {
                Err(ActivityError::auth(format!(
                    "authorization rejected with status '{}'",
                    response.status
                )))
            }
        },
    );

    let execute = StepDescriptor::new(
        steps::EXECUTE_PAYMENT,
        |ctx: Arc<PaymentContext>, _act| async move {
            // The downstream execution confirmation arrives later as a
            // signal; it never gates the pipeline.
            ctx.services
                .ledger
                .dispatch(&ctx.instruction, steps::EXECUTE_PAYMENT, None)
                .await?;
            Ok(StepOutcome::Done)
        },
    );

    let clear = StepDescriptor::new(
        steps::CLEAR_AND_SETTLE,
        |ctx: Arc<PaymentContext>, _act| async move {
            ctx.services
                .back_office
                .clear_and_settle(&ctx.instruction)
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

    let post = StepDescriptor::new(
        steps::POST_PAYMENT,
        |ctx: Arc<PaymentContext>, act| async move {
            if ctx.instruction.is_self_transfer() {
                return Err(ActivityError::validation(
                    "debtor and creditor accounts are identical",
                ));
            }
            let token = act.open_completion();
            ctx.services
                .ledger
                .dispatch(&ctx.instruction, steps::POST_PAYMENT, Some(token))
                .await?;
            Ok(StepOutcome::Suspend(token))
        },
    )
    .on_failure(|ctx: Arc<PaymentContext>, err| async move {
        tracing::warn!(
            reference = %ctx.instruction.reference,
            error = %err,
            "post failed, chaining refund"
        );
        ctx.chain(ChainKind::Refund);
    });

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

    SagaDefinition::builder(SagaType::Domestic)
        .step(initiate)
        .parallel([manage_order, authorize])
        .step(execute)
        .parallel([clear, notify, reconcile])
        .step(post)
        .step(reports)
        .step(archive)
        .build()
}
