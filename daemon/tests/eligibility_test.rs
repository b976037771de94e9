mod common;

use commission_common::{account::KycStatus, eligibility::IneligibilityReason};
use commission_daemon::core::{error::ErrorKind, storage::SledStorage, Engine};
use common::*;
use tempdir::TempDir;

/// User 1 with directs 2, 3 and 4, each of them sponsoring three users
async fn three_by_three(engine: &Engine<SledStorage>) {
    register(engine, 1, None).await;
    register_directs(engine, 1, 2, 3).await;
    let mut next = 5;
    for direct in 2..=4 {
        register_directs(engine, direct, next, 3).await;
        next += 3;
    }
}

#[tokio::test]
async fn test_eligible_with_monthly_purchases() {
    let temp_dir = TempDir::new("eligibility_ok").expect("temp dir");
    let engine = build_engine(&temp_dir);
    three_by_three(&engine).await;

    for order in 100..103 {
        pay(&engine, order, 1, PACKAGE).await;
    }

    let report = engine.evaluate_eligibility(1, T0).await.expect("evaluate");
    assert_eq!(report.month, 202403);
    assert_eq!(report.inputs.direct_referrals, 3);
    assert_eq!(report.inputs.referrals_of_directs, vec![3, 3, 3]);
    assert_eq!(report.inputs.month_purchase_total, 60_000);
    assert!(report.eligibility.joining_eligible);
    assert!(report.eligibility.repurchase_eligible);
    assert!(report.eligibility.reasons.is_empty());
}

#[tokio::test]
async fn test_purchases_of_another_month_do_not_count() {
    let temp_dir = TempDir::new("eligibility_month").expect("temp dir");
    let engine = build_engine(&temp_dir);
    three_by_three(&engine).await;

    for order in 100..103 {
        pay(&engine, order, 1, PACKAGE).await;
    }

    // 2024-04-08
    let report = engine
        .evaluate_eligibility(1, T0 + 30 * DAY)
        .await
        .expect("evaluate");
    assert_eq!(report.month, 202404);
    assert_eq!(report.inputs.month_purchase_total, 0);
    assert!(!report.eligibility.repurchase_eligible);
    assert_eq!(
        report.eligibility.reasons,
        vec![IneligibilityReason::MonthlyPurchaseBelowThreshold {
            total: 0,
            threshold: 50_000
        }]
    );
}

#[tokio::test]
async fn test_reports_missing_referrals_and_kyc() {
    let temp_dir = TempDir::new("eligibility_reasons").expect("temp dir");
    let engine = build_engine(&temp_dir);
    register(&engine, 1, None).await;
    register_directs(&engine, 1, 2, 2).await;
    register_directs(&engine, 2, 10, 3).await;
    engine
        .update_kyc(1, KycStatus::Pending)
        .await
        .expect("update kyc");

    let report = engine.evaluate_eligibility(1, T0).await.expect("evaluate");
    assert_eq!(report.inputs.referrals_of_directs, vec![3, 0]);
    assert!(!report.eligibility.joining_eligible);
    assert_eq!(
        report.eligibility.reasons,
        vec![
            IneligibilityReason::KycNotApproved,
            IneligibilityReason::InsufficientDirectReferrals { have: 2, need: 3 },
            IneligibilityReason::InsufficientQualifiedDirects { have: 1, need: 3 },
            IneligibilityReason::MonthlyPurchaseBelowThreshold {
                total: 0,
                threshold: 50_000
            },
        ]
    );

    // Evaluation is a pure read
    let user = engine.get_user(1).await.expect("user");
    assert_eq!(user.kyc_status, KycStatus::Pending);
    assert_eq!(user.wallet_balance, 0);
}

#[tokio::test]
async fn test_unknown_user() {
    let temp_dir = TempDir::new("eligibility_unknown").expect("temp dir");
    let engine = build_engine(&temp_dir);
    let err = engine
        .evaluate_eligibility(42, T0)
        .await
        .expect_err("unknown user");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
