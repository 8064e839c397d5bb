//! The cross-border payment pipeline.

use std::sync::Arc;

use common::ActivityError;
use domain::IsoPaymentStatus;
use instance_store::SagaType;
use orchestrator::{ActivityOptions, RetryPolicy, SagaDefinition, StepDescriptor, StepOutcome};

use crate::context::PaymentContext;
use crate::steps;

fn accepted(status: IsoPaymentStatus, operation: &str) -> Result<StepOutcome, ActivityError> {
    if status.is_accepted() {
        Ok(StepOutcome::Done)
    } else {
        Err(ActivityError::server(format!(
            "{operation} answered {status}"
        )))
    }
}

/// Builds the strictly sequential cross-border pipeline:
///
/// `debit(⇄debit_compensation) → reserve_currency(⇄release_currency) →
/// sanctions_check → transfer_funds(⇄recall_funds) →
/// credit_beneficiary(⇄refund_beneficiary)`.
///
/// Any failure unwinds the committed legs in reverse order, one at a time,
/// to preserve conservation of funds. The sanctions check is deliberately
/// non-compensable; a pass is never re-run or invalidated by a later
/// failure.
pub fn definition() -> SagaDefinition<PaymentContext> {
    // Cross-border legs talk to a correspondent bank; the attempt budget is
    // tight compared to the domestic default.
    let options = ActivityOptions::default().with_retry(RetryPolicy::standard().with_max_attempts(5));

    let debit = StepDescriptor::new(
        steps::DEBIT_ACCOUNT,
        |ctx: Arc<PaymentContext>, _act| async move {
            let status = ctx.services.bank.debit_account(&ctx.instruction).await?;
            accepted(status, steps::DEBIT_ACCOUNT)
        },
    )
    .with_options(options.clone())
    .with_compensation(
        steps::DEBIT_COMPENSATION,
        |ctx: Arc<PaymentContext>| async move {
            ctx.services.bank.debit_compensation(&ctx.instruction).await?;
            Ok(())
        },
    );

    let reserve = StepDescriptor::new(
        steps::RESERVE_CURRENCY,
        |ctx: Arc<PaymentContext>, _act| async move {
            let status = ctx.services.bank.reserve_currency(&ctx.instruction).await?;
            accepted(status, steps::RESERVE_CURRENCY)
        },
    )
    .with_options(options.clone())
    .with_compensation(
        steps::RELEASE_CURRENCY,
        |ctx: Arc<PaymentContext>| async move {
            ctx.services.bank.release_currency(&ctx.instruction).await?;
            Ok(())
        },
    );

    let sanctions = StepDescriptor::new(
        steps::SANCTIONS_CHECK,
        |ctx: Arc<PaymentContext>, _act| async move {
            let status = ctx.services.bank.sanctions_check(&ctx.instruction).await?;
            accepted(status, steps::SANCTIONS_CHECK)
        },
    )
    .with_options(options.clone());

    let transfer = StepDescriptor::new(
        steps::TRANSFER_FUNDS,
        |ctx: Arc<PaymentContext>, _act| async move {
            let status = ctx.services.bank.transfer_funds(&ctx.instruction).await?;
            accepted(status, steps::TRANSFER_FUNDS)
        },
    )
    .with_options(options.clone())
    .with_compensation(steps::RECALL_FUNDS, |ctx: Arc<PaymentContext>| async move {
        ctx.services.bank.recall_funds(&ctx.instruction).await?;
        Ok(())
    });

    let credit = StepDescriptor::new(
        steps::CREDIT_BENEFICIARY,
        |ctx: Arc<PaymentContext>, _act| async move {
            let status = ctx
                .services
                .bank
                .credit_beneficiary(&ctx.instruction)
                .await?;
            accepted(status, steps::CREDIT_BENEFICIARY)
        },
    )
    .with_options(options)
    .with_compensation(
        steps::REFUND_BENEFICIARY,
        |ctx: Arc<PaymentContext>| async move {
            ctx.services.bank.refund_beneficiary(&ctx.instruction).await?;
            Ok(())
        },
    );

    SagaDefinition::builder(SagaType::CrossBorder)
        .step(debit)
        .step(reserve)
        .step(sanctions)
        .step(transfer)
        .step(credit)
        .build()
}
