//! End-to-end pipeline tests against the in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use common::{ErrorKind, SagaId};
use domain::{Account, PaymentRequest};
use instance_store::{InMemoryInstanceStore, InstanceStore, SagaStatus, SagaType};
use orchestrator::{CompletionBridge, CompletionResult, EngineConfig, EngineError, StatusSnapshot};
use payments::services::{
    InMemoryBackOffice, InMemoryCrossBorderBank, InMemoryLedgerDispatcher, InMemoryPaymentGateway,
};
use payments::steps;
use payments::{PaymentEngine, PaymentError, PaymentType, Services};

struct Harness {
    engine: Arc<PaymentEngine>,
    store: Arc<InMemoryInstanceStore>,
    gateway: InMemoryPaymentGateway,
    ledger: InMemoryLedgerDispatcher,
    bank: InMemoryCrossBorderBank,
    back_office: InMemoryBackOffice,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryInstanceStore::new());
    let bridge = CompletionBridge::new();
    let gateway = InMemoryPaymentGateway::new();
    let ledger = InMemoryLedgerDispatcher::new(bridge.clone());
    let bank = InMemoryCrossBorderBank::new();
    let back_office = InMemoryBackOffice::new();

    let services = Services {
        gateway: Arc::new(gateway.clone()),
        ledger: Arc::new(ledger.clone()),
        bank: Arc::new(bank.clone()),
        back_office: Arc::new(back_office.clone()),
    };
    let engine = PaymentEngine::new(
        Arc::clone(&store) as Arc<dyn InstanceStore>,
        EngineConfig::default(),
        services,
        bridge,
    );
    Harness {
        engine,
        store,
        gateway,
        ledger,
        bank,
        back_office,
    }
}

fn request(reference: &str) -> PaymentRequest {
    PaymentRequest {
        debtor: Account::new("John Doe", "AU-0001"),
        creditor: Account::new("Jane Doe", "AU-0002"),
        amount_cents: 10050,
        currency: "USD".to_owned(),
        reference: reference.to_owned(),
        payment_date: None,
        priority: None,
    }
}

/// Polls until the saga with `id` reaches a terminal status.
async fn finished(harness: &Harness, id: &str) -> StatusSnapshot {
    let id = SagaId::new(id);
    for _ in 0..200 {
        if let Ok(snapshot) = harness.engine.query(&id).await
            && snapshot.status.is_terminal()
        {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("saga {id} did not finish in time");
}

#[tokio::test]
async fn domestic_happy_path_commits_all_ten_steps_in_order() {
    let harness = harness();

    let handle = harness
        .engine
        .start_payment(request("REF-100"), PaymentType::Domestic)
        .await
        .unwrap();
    assert_eq!(handle.id().as_str(), "REF-100");
    assert_eq!(handle.finished().await, SagaStatus::Completed);

    let snapshot = harness.engine.query(handle.id()).await.unwrap();
    assert_eq!(snapshot.saga_type, SagaType::Domestic);
    assert_eq!(snapshot.completed_steps, steps::DOMESTIC_STEPS.to_vec());
    assert!(snapshot.failure.is_none());
    assert!(snapshot.compensations.is_empty());
    assert!(snapshot.ended_at.is_some());

    // One gateway round per edge step, two ledger hand-offs (execute fire
    // and forget, post with a token).
    assert_eq!(harness.gateway.initiate_calls(), 1);
    assert_eq!(harness.gateway.order_calls(), 1);
    assert_eq!(harness.gateway.authorize_calls(), 1);
    let dispatches = harness.ledger.dispatches();
    assert_eq!(dispatches.len(), 2);
    assert_eq!(dispatches[0].step, steps::EXECUTE_PAYMENT);
    assert!(dispatches[0].token.is_none());
    assert_eq!(dispatches[1].step, steps::POST_PAYMENT);
    assert!(dispatches[1].token.is_some());
}

#[tokio::test]
async fn rejected_authorization_fails_without_compensations() {
    let harness = harness();
    harness.gateway.set_authorize_status("declined");

    let handle = harness
        .engine
        .start_payment(request("REF-101"), PaymentType::Domestic)
        .await
        .unwrap();
    assert_eq!(handle.finished().await, SagaStatus::Failed);

    let snapshot = harness.engine.query(handle.id()).await.unwrap();
    let failure = snapshot.failure.unwrap();
    assert_eq!(failure.step, steps::AUTHORIZE_PAYMENT);
    assert_eq!(failure.kind, ErrorKind::Auth);
    assert!(snapshot.compensations.is_empty());
    // Nothing past the parallel pair ran.
    assert_eq!(harness.ledger.dispatch_count(), 0);
    assert_eq!(harness.back_office.calls_to("clear_and_settle"), 0);
}

#[tokio::test]
async fn failed_post_chains_refund_then_report() {
    let harness = harness();
    harness
        .ledger
        .set_post_result(CompletionResult::failure("insufficient funds"));

    let handle = harness
        .engine
        .start_payment(request("REF-102"), PaymentType::Domestic)
        .await
        .unwrap();
    assert_eq!(handle.finished().await, SagaStatus::Failed);

    let parent = harness.engine.query(handle.id()).await.unwrap();
    assert_eq!(parent.failure.unwrap().step, steps::POST_PAYMENT);
    assert!(!parent.completed_steps.contains(&steps::POST_PAYMENT.to_owned()));

    let refund = finished(&harness, "REF-102-refund").await;
    assert_eq!(refund.saga_type, SagaType::Refund);
    assert_eq!(refund.status, SagaStatus::Completed);
    assert_eq!(
        refund.completed_steps,
        vec![
            steps::REFUND_PAYMENT,
            steps::RECONCILE_PAYMENT,
            steps::SEND_NOTIFICATION,
        ]
    );

    let report = finished(&harness, "REF-102-report").await;
    assert_eq!(report.saga_type, SagaType::Report);
    assert_eq!(report.status, SagaStatus::Completed);

    // Reporting ran for the chained child only, never for the failed parent.
    assert_eq!(harness.back_office.calls_to("refund_payment"), 1);
    assert_eq!(harness.back_office.calls_to("generate_reports"), 1);
    assert_eq!(harness.back_office.calls_to("archive_payment"), 1);
    // Parent and refund child each reconcile and notify once.
    assert_eq!(harness.back_office.calls_to("reconcile_payment"), 2);
    assert_eq!(harness.back_office.calls_to("send_notification"), 2);
}

#[tokio::test]
async fn self_transfer_is_rejected_at_the_posting_step() {
    let harness = harness();
    let mut request = request("REF-103");
    request.creditor = Account::new("John Doe Savings", "AU-0001");

    let handle = harness
        .engine
        .start_payment(request, PaymentType::Domestic)
        .await
        .unwrap();
    assert_eq!(handle.finished().await, SagaStatus::Failed);

    let snapshot = harness.engine.query(handle.id()).await.unwrap();
    let failure = snapshot.failure.unwrap();
    assert_eq!(failure.step, steps::POST_PAYMENT);
    assert_eq!(failure.kind, ErrorKind::Validation);
    // The rejection happens before anything is handed to the ledger.
    assert_eq!(harness.ledger.dispatch_count(), 1);
    assert_eq!(harness.ledger.dispatches()[0].step, steps::EXECUTE_PAYMENT);

    // A failed post still triggers the refund chain.
    let refund = finished(&harness, "REF-103-refund").await;
    assert_eq!(refund.status, SagaStatus::Completed);
}

#[tokio::test]
async fn cross_border_happy_path_runs_the_five_legs() {
    let harness = harness();

    let handle = harness
        .engine
        .start_payment(request("XB-200"), PaymentType::CrossBorder)
        .await
        .unwrap();
    assert_eq!(handle.finished().await, SagaStatus::Completed);

    assert_eq!(
        harness.bank.invocations(),
        vec![
            "debit_account",
            "reserve_currency",
            "sanctions_check",
            "transfer_funds",
            "credit_beneficiary",
        ]
    );
    let snapshot = harness.engine.query(handle.id()).await.unwrap();
    assert_eq!(snapshot.saga_type, SagaType::CrossBorder);
    assert!(snapshot.compensations.is_empty());
}

#[tokio::test]
async fn sanctions_hit_unwinds_committed_legs_in_reverse_order() {
    let harness = harness();
    harness.bank.set_fail_on(
        "sanctions_check",
        common::ActivityError::validation("hit on sanctions list"),
    );

    let handle = harness
        .engine
        .start_payment(request("XB-201"), PaymentType::CrossBorder)
        .await
        .unwrap();
    assert_eq!(handle.finished().await, SagaStatus::Compensated);

    let snapshot = harness.engine.query(handle.id()).await.unwrap();
    let failure = snapshot.failure.unwrap();
    assert_eq!(failure.step, steps::SANCTIONS_CHECK);
    assert_eq!(failure.kind, ErrorKind::Validation);

    // LIFO: the reservation is released before the debit is returned.
    assert_eq!(snapshot.compensations.len(), 2);
    assert_eq!(snapshot.compensations[0].action, steps::RELEASE_CURRENCY);
    assert_eq!(snapshot.compensations[1].action, steps::DEBIT_COMPENSATION);
    assert!(snapshot.compensations.iter().all(|c| c.is_ok()));

    let invocations = harness.bank.invocations();
    assert_eq!(
        invocations,
        vec![
            "debit_account",
            "reserve_currency",
            "sanctions_check",
            "release_currency",
            "debit_compensation",
        ]
    );
    assert!(!invocations.iter().any(|op| op == "transfer_funds"));
    assert!(!invocations.iter().any(|op| op == "credit_beneficiary"));
}

#[tokio::test]
async fn validation_failure_is_never_retried() {
    let harness = harness();
    harness.bank.set_fail_on(
        "sanctions_check",
        common::ActivityError::validation("hit on sanctions list"),
    );

    let handle = harness
        .engine
        .start_payment(request("XB-202"), PaymentType::CrossBorder)
        .await
        .unwrap();
    handle.finished().await;

    let checks = harness
        .bank
        .invocations()
        .iter()
        .filter(|op| op.as_str() == "sanctions_check")
        .count();
    assert_eq!(checks, 1);
}

#[tokio::test]
async fn duplicate_reference_is_rejected() {
    let harness = harness();

    let handle = harness
        .engine
        .start_payment(request("REF-104"), PaymentType::Domestic)
        .await
        .unwrap();

    let err = harness
        .engine
        .start_payment(request("REF-104"), PaymentType::Domestic)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::Engine(EngineError::AlreadyStarted(_))
    ));

    // The original run is unaffected.
    assert_eq!(handle.finished().await, SagaStatus::Completed);
}

#[tokio::test]
async fn invalid_request_is_rejected_before_a_saga_starts() {
    let harness = harness();
    let mut bad = request("REF-105");
    bad.amount_cents = 0;

    let err = harness
        .engine
        .start_payment(bad, PaymentType::Domestic)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Domain(_)));
    assert!(
        harness
            .store
            .load(&SagaId::new("REF-105"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn signal_for_an_open_step_is_buffered_and_acknowledged() {
    let harness = harness();
    harness.ledger.set_auto_resolve(false);

    let handle = harness
        .engine
        .start_payment(request("REF-106"), PaymentType::Domestic)
        .await
        .unwrap();

    // Wait until the saga is parked on the posting token.
    let mut token = None;
    for _ in 0..200 {
        token = harness.ledger.last_token();
        if token.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let token = token.expect("post was never dispatched");

    let outcome = harness
        .engine
        .signal(handle.id(), steps::POST_PAYMENT)
        .await
        .unwrap();
    assert_eq!(outcome, orchestrator::SignalOutcome::Buffered);

    let already = harness
        .engine
        .signal(handle.id(), steps::INITIATE_PAYMENT)
        .await
        .unwrap();
    assert_eq!(already, orchestrator::SignalOutcome::AlreadyCompleted);

    harness
        .engine
        .resolve_completion(token, CompletionResult::success());
    assert_eq!(handle.finished().await, SagaStatus::Completed);
}

#[tokio::test]
async fn cancel_between_levels_unwinds_and_ends_cancelled() {
    let harness = harness();
    harness
        .bank
        .set_delay_on("debit_account", Duration::from_millis(300));

    let handle = harness
        .engine
        .start_payment(request("XB-203"), PaymentType::CrossBorder)
        .await
        .unwrap();

    // Cancel while the first leg is still in flight; the driver honors the
    // flag at the next level boundary, after the leg commits.
    for _ in 0..200 {
        if !harness.bank.invocations().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    harness.engine.cancel(handle.id()).await.unwrap();
    assert_eq!(handle.finished().await, SagaStatus::Cancelled);

    let snapshot = harness.engine.query(handle.id()).await.unwrap();
    assert_eq!(snapshot.completed_steps, vec![steps::DEBIT_ACCOUNT]);
    assert_eq!(snapshot.compensations.len(), 1);
    assert_eq!(snapshot.compensations[0].action, steps::DEBIT_COMPENSATION);
    assert_eq!(
        harness.bank.invocations(),
        vec!["debit_account", "debit_compensation"]
    );
}

#[tokio::test]
async fn unknown_saga_queries_and_signals_are_not_found() {
    let harness = harness();
    let id = SagaId::new("REF-999");

    assert!(matches!(
        harness.engine.query(&id).await.unwrap_err(),
        PaymentError::Engine(EngineError::NotFound(_))
    ));
    assert!(matches!(
        harness.engine.signal(&id, steps::POST_PAYMENT).await.unwrap_err(),
        PaymentError::Engine(EngineError::NotFound(_))
    ));
}
