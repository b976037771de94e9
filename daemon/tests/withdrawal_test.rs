mod common;

use commission_common::{
    account::KycStatus,
    ledger::{EntryKind, LedgerReference},
    withdrawal::{BankDetails, WithdrawalError, WithdrawalStatus},
};
use commission_daemon::core::{
    config::EngineConfig,
    error::{EngineError, ErrorKind},
    storage::SledStorage,
    Engine,
};
use common::*;
use tempdir::TempDir;

fn bank() -> BankDetails {
    BankDetails {
        account_holder: "A. Member".to_owned(),
        account_number: "000123456".to_owned(),
        bank_code: "BANK0001".to_owned(),
    }
}

/// Engine with a 10.00 minimum and user 1 holding 2_800 from released installments
async fn funded_engine(temp_dir: &TempDir) -> Engine<SledStorage> {
    let engine = build_engine_with(
        temp_dir,
        EngineConfig {
            min_withdrawal: 1_000,
            ..Default::default()
        },
    );
    register(&engine, 1, None).await;
    pay(&engine, 100, 1, PACKAGE).await;
    engine
        .release_due_payouts(T0 + 4 * WEEK)
        .await
        .expect("release");
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 2_800);
    engine
}

async fn listed(engine: &Engine<SledStorage>, status: WithdrawalStatus) -> Vec<u64> {
    engine
        .list_withdrawals(Some(status))
        .await
        .expect("list")
        .into_iter()
        .map(|request| request.id)
        .collect()
}

fn withdrawal_error(err: EngineError) -> WithdrawalError {
    match err {
        EngineError::Withdrawal(e) => e,
        other => panic!("expected a withdrawal error, got {}", other),
    }
}

#[tokio::test]
async fn test_request_validation() {
    let temp_dir = TempDir::new("withdrawal_validation").expect("temp dir");
    let engine = funded_engine(&temp_dir).await;
    let now = T0 + 4 * WEEK;

    let err = engine
        .request_withdrawal(1, 0, bank(), now)
        .await
        .expect_err("zero amount");
    assert_eq!(withdrawal_error(err), WithdrawalError::ZeroAmount);

    let err = engine
        .request_withdrawal(1, 5_000, bank(), now)
        .await
        .expect_err("over balance");
    assert!(matches!(
        withdrawal_error(err),
        WithdrawalError::InsufficientBalance {
            requested: 5_000,
            available: 2_800
        }
    ));

    let err = engine
        .request_withdrawal(1, 500, bank(), now)
        .await
        .expect_err("below minimum");
    assert!(matches!(
        withdrawal_error(err),
        WithdrawalError::BelowMinimum { amount: 500, min: 1_000 }
    ));

    engine
        .update_kyc(1, KycStatus::Rejected("blurry document".to_owned()))
        .await
        .expect("update kyc");
    let err = engine
        .request_withdrawal(1, 2_000, bank(), now)
        .await
        .expect_err("kyc rejected");
    assert!(matches!(withdrawal_error(err), WithdrawalError::KycRequired(_)));

    assert!(engine.list_withdrawals(None).await.expect("list").is_empty());
    // Requests never touch the wallet
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 2_800);
}

#[tokio::test]
async fn test_default_minimum_is_three_hundred() {
    let temp_dir = TempDir::new("withdrawal_minimum").expect("temp dir");
    let engine = build_engine(&temp_dir);
    register(&engine, 1, None).await;
    let err = engine
        .request_withdrawal(1, 25_000, bank(), T0)
        .await
        .expect_err("insufficient balance");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(engine.config().withdrawal_rules().min_amount, 30_000);
}

#[tokio::test]
async fn test_approve_complete_lifecycle() {
    let temp_dir = TempDir::new("withdrawal_lifecycle").expect("temp dir");
    let engine = funded_engine(&temp_dir).await;
    let now = T0 + 4 * WEEK;

    let request = engine
        .request_withdrawal(1, 2_000, bank(), now)
        .await
        .expect("request");
    assert_eq!(request.status, WithdrawalStatus::Requested);
    assert_eq!(request.bank_details, bank());

    let approved = engine
        .approve_withdrawal(request.id, Some("checked".to_owned()), now + 60)
        .await
        .expect("approve");
    assert_eq!(approved.status, WithdrawalStatus::Approved);
    assert_eq!(approved.resolved_at, Some(now + 60));
    assert_eq!(approved.admin_notes.as_deref(), Some("checked"));
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 800);

    let page = engine.ledger_history(1, 0, 1).await.expect("ledger");
    assert_eq!(page.entries[0].kind, EntryKind::WithdrawalDebit);
    assert_eq!(page.entries[0].amount, -2_000);
    assert_eq!(
        page.entries[0].reference,
        LedgerReference::Withdrawal(request.id)
    );
    assert_eq!(page.entries[0].balance_after, 800);
    assert!(page.has_more);

    // Approving twice is a conflict and debits nothing
    let err = engine
        .approve_withdrawal(request.id, None, now + 120)
        .await
        .expect_err("already approved");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 800);

    let completed = engine
        .complete_withdrawal(request.id, None, now + 3_600)
        .await
        .expect("complete");
    assert_eq!(completed.status, WithdrawalStatus::Completed);
    assert_eq!(completed.admin_notes.as_deref(), Some("checked"));

    let err = engine
        .reject_withdrawal(request.id, "too late".to_owned(), now + 7_200)
        .await
        .expect_err("already completed");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let reconciliation = engine.reconcile_balance(1).await.expect("reconcile");
    assert!(reconciliation.consistent);
    assert_eq!(reconciliation.ledger_sum, 800);
}

#[tokio::test]
async fn test_reject_and_early_completion() {
    let temp_dir = TempDir::new("withdrawal_reject").expect("temp dir");
    let engine = funded_engine(&temp_dir).await;
    let now = T0 + 4 * WEEK;

    let request = engine
        .request_withdrawal(1, 1_500, bank(), now)
        .await
        .expect("request");

    let err = engine
        .complete_withdrawal(request.id, None, now)
        .await
        .expect_err("complete before approval");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = engine
        .reject_withdrawal(request.id, "  ".to_owned(), now)
        .await
        .expect_err("notes required");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let rejected = engine
        .reject_withdrawal(request.id, "account mismatch".to_owned(), now)
        .await
        .expect("reject");
    assert_eq!(rejected.status, WithdrawalStatus::Rejected);
    assert_eq!(rejected.admin_notes.as_deref(), Some("account mismatch"));
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 2_800);

    let err = engine
        .approve_withdrawal(request.id, None, now)
        .await
        .expect_err("already rejected");
    assert!(matches!(
        withdrawal_error(err),
        WithdrawalError::AlreadyResolved(WithdrawalStatus::Rejected)
    ));

    let err = engine.get_withdrawal(999).await.expect_err("unknown");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_approval_rechecks_balance() {
    let temp_dir = TempDir::new("withdrawal_recheck").expect("temp dir");
    let engine = funded_engine(&temp_dir).await;
    let now = T0 + 4 * WEEK;

    let first = engine
        .request_withdrawal(1, 2_000, bank(), now)
        .await
        .expect("first request");
    let second = engine
        .request_withdrawal(1, 2_000, bank(), now)
        .await
        .expect("second request");

    engine
        .approve_withdrawal(first.id, None, now)
        .await
        .expect("approve first");
    let err = engine
        .approve_withdrawal(second.id, None, now)
        .await
        .expect_err("balance is gone");
    assert!(matches!(
        withdrawal_error(err),
        WithdrawalError::InsufficientBalance {
            requested: 2_000,
            available: 800
        }
    ));

    let requested = engine
        .list_withdrawals(Some(WithdrawalStatus::Requested))
        .await
        .expect("requested");
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].id, second.id);
    let approved = engine
        .list_withdrawals(Some(WithdrawalStatus::Approved))
        .await
        .expect("approved");
    assert_eq!(approved.len(), 1);
    assert_eq!(engine.list_withdrawals(None).await.expect("all").len(), 2);
}

#[tokio::test]
async fn test_status_listing_follows_transitions() {
    let temp_dir = TempDir::new("withdrawal_listing").expect("temp dir");
    let engine = funded_engine(&temp_dir).await;
    let now = T0 + 4 * WEEK;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let request = engine
            .request_withdrawal(1, 1_000, bank(), now)
            .await
            .expect("request");
        ids.push(request.id);
    }

    engine
        .approve_withdrawal(ids[0], None, now)
        .await
        .expect("approve");
    engine
        .complete_withdrawal(ids[0], Some("wired".to_owned()), now + DAY)
        .await
        .expect("complete");
    engine
        .reject_withdrawal(ids[1], "duplicate".to_owned(), now)
        .await
        .expect("reject");
    let fourth = engine
        .request_withdrawal(1, 1_000, bank(), now + DAY)
        .await
        .expect("fourth request");

    assert_eq!(listed(&engine, WithdrawalStatus::Requested).await, vec![ids[2], fourth.id]);
    assert!(listed(&engine, WithdrawalStatus::Approved).await.is_empty());
    assert_eq!(listed(&engine, WithdrawalStatus::Completed).await, vec![ids[0]]);
    assert_eq!(listed(&engine, WithdrawalStatus::Rejected).await, vec![ids[1]]);
    assert_eq!(engine.list_withdrawals(None).await.expect("all").len(), 4);
}
