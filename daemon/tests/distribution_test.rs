mod common;

use commission_common::{
    ledger::{EntryKind, LedgerReference},
    level::Level,
    pool::{CreditStatus, RunStatus},
};
use commission_daemon::core::{
    error::ErrorKind,
    storage::{PoolProvider, SledStorage, UserProvider},
    Engine,
};
use common::*;
use tempdir::TempDir;

/// User 1 leads one team of 2, 3 and 4. Pool holds 3 * 11_200.
async fn one_leader(engine: &Engine<SledStorage>) {
    register(engine, 1, None).await;
    register_directs(engine, 1, 2, 3).await;
    for user in 2..=4 {
        pay(engine, 100 + user, user, PACKAGE).await;
    }
}

#[tokio::test]
async fn test_distribution_credits_active_leaders() {
    let temp_dir = TempDir::new("distribution").expect("temp dir");
    let engine = build_engine(&temp_dir);
    one_leader(&engine).await;
    assert_eq!(engine.get_pool().await.expect("pool").balance, 33_600);

    let summary = engine.distribute_pool(None, T0).await.expect("distribute");
    assert!(!summary.resumed);
    assert_eq!(summary.run.key, "2024-03-09");
    assert_eq!(summary.run.status, RunStatus::Completed);
    assert_eq!(summary.credited_count, 1);
    // L1 weighs 30%, the other levels have no recipient
    assert_eq!(summary.run.plan.per_user(Level::L1), 10_080);
    assert_eq!(summary.run.plan.total_distributed, 10_080);
    assert_eq!(summary.run.plan.remainder, 23_520);
    assert_eq!(summary.run.credited, 10_080);
    assert_eq!(summary.pool.balance, 23_520);
    assert_eq!(summary.pool.total_distributed, 10_080);
    assert_eq!(summary.pool.last_distribution_at, Some(T0));

    let page = engine.ledger_history(1, 0, 10).await.expect("ledger");
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].kind, EntryKind::TurnoverDistribution);
    assert_eq!(
        page.entries[0].reference,
        LedgerReference::DistributionRun("2024-03-09".to_owned())
    );
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 10_080);

    // L0 users get nothing
    assert_eq!(engine.get_user(2).await.expect("user").wallet_balance, 0);
}

#[tokio::test]
async fn test_same_key_is_not_distributed_twice() {
    let temp_dir = TempDir::new("distribution_replay").expect("temp dir");
    let engine = build_engine(&temp_dir);
    one_leader(&engine).await;

    engine
        .distribute_pool(Some("weekly-10".to_owned()), T0)
        .await
        .expect("distribute");
    let replay = engine
        .distribute_pool(Some(" weekly-10 ".to_owned()), T0 + DAY)
        .await
        .expect("replay");
    assert!(replay.resumed);
    assert_eq!(replay.credited_count, 0);
    assert_eq!(replay.run.completed_at, Some(T0));
    assert_eq!(replay.pool.balance, 23_520);
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 10_080);

    // A new key distributes from the remaining balance
    let next = engine
        .distribute_pool(Some("weekly-11".to_owned()), T0 + WEEK)
        .await
        .expect("distribute");
    assert_eq!(next.run.plan.pool_balance, 23_520);
    assert_eq!(next.run.credited, 7_056);
    assert_eq!(engine.get_distribution_runs().await.expect("runs").len(), 2);
}

#[tokio::test]
async fn test_interrupted_run_resumes_and_returns_inactive_shares() {
    let temp_dir = TempDir::new("distribution_resume").expect("temp dir");
    let engine = build_engine(&temp_dir);
    one_leader(&engine).await;

    // Plan written and pool debited, then the process stops before any credit
    let recipients = engine
        .storage()
        .get_active_users_by_level()
        .await
        .expect("recipients");
    let run = engine
        .storage()
        .start_distribution_run("2024-03-09", &recipients, T0)
        .await
        .expect("start run");
    assert_eq!(run.status, RunStatus::InProgress);
    assert_eq!(engine.get_pool().await.expect("pool").balance, 23_520);

    // The leader is deactivated before the run is resumed
    engine.set_user_active(1, false).await.expect("deactivate");

    let summary = engine.distribute_pool(None, T0 + 60).await.expect("resume");
    assert!(summary.resumed);
    assert_eq!(summary.returned_count, 1);
    assert_eq!(summary.run.status, RunStatus::Completed);
    assert_eq!(summary.run.returned, 10_080);
    assert_eq!(summary.run.credited, 0);
    assert_eq!(summary.pool.balance, 33_600);
    assert_eq!(summary.pool.total_distributed, 0);

    let credits = engine
        .storage()
        .get_distribution_credits("2024-03-09")
        .await
        .expect("credits");
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].status, CreditStatus::Returned);
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 0);
}

#[tokio::test]
async fn test_applied_credit_is_a_conflict() {
    let temp_dir = TempDir::new("distribution_conflict").expect("temp dir");
    let engine = build_engine(&temp_dir);
    one_leader(&engine).await;
    engine.distribute_pool(None, T0).await.expect("distribute");

    let err = engine
        .storage()
        .apply_distribution_credit("2024-03-09", 1, T0)
        .await
        .expect_err("credit already applied");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = engine
        .storage()
        .apply_distribution_credit("2024-03-09", 2, T0)
        .await
        .expect_err("no credit for an L0 user");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(engine.get_user(1).await.expect("user").wallet_balance, 10_080);
}

#[tokio::test]
async fn test_empty_pool_and_invalid_keys() {
    let temp_dir = TempDir::new("distribution_empty").expect("temp dir");
    let engine = build_engine(&temp_dir);
    register(&engine, 1, None).await;

    let summary = engine
        .distribute_pool(Some("empty".to_owned()), T0)
        .await
        .expect("distribute");
    assert_eq!(summary.run.status, RunStatus::Completed);
    assert_eq!(summary.run.plan.total_distributed, 0);
    assert_eq!(summary.credited_count, 0);

    let err = engine
        .distribute_pool(Some("   ".to_owned()), T0)
        .await
        .expect_err("blank key");
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = engine
        .get_distribution_run("missing")
        .await
        .expect_err("unknown run");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
