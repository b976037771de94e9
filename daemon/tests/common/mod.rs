// Shared fixtures for the engine integration tests
#![allow(dead_code)]

use commission_common::{
    account::{KycStatus, User, UserId},
    config::SECONDS_PER_DAY,
    order::{OrderId, PaymentEvent},
    time::TimestampSeconds,
};
use commission_daemon::core::{
    config::EngineConfig, storage::SledStorage, Engine, PaymentReceipt, Registration, SponsorRef,
};
use tempdir::TempDir;

// 2024-03-09T16:00:00Z
pub const T0: TimestampSeconds = 1_710_000_000;
pub const DAY: u64 = SECONDS_PER_DAY;
pub const WEEK: u64 = 7 * DAY;

// Standard 200.00 package
pub const PACKAGE: u64 = 20_000;

pub fn build_engine(temp_dir: &TempDir) -> Engine<SledStorage> {
    build_engine_with(temp_dir, EngineConfig::default())
}

pub fn build_engine_with(temp_dir: &TempDir, config: EngineConfig) -> Engine<SledStorage> {
    let storage =
        SledStorage::new(&temp_dir.path().to_string_lossy()).expect("open sled storage");
    Engine::new(storage, config)
}

pub async fn register(engine: &Engine<SledStorage>, id: UserId, sponsor: Option<UserId>) -> User {
    engine
        .register_user(
            Registration {
                id,
                sponsor: sponsor.map(SponsorRef::Id),
                kyc_status: KycStatus::Approved,
            },
            T0,
        )
        .await
        .expect("register user")
}

pub fn event(order: OrderId, user: UserId, amount: u64, paid_at: TimestampSeconds) -> PaymentEvent {
    PaymentEvent {
        order_id: order,
        user_id: user,
        amount,
        paid_at,
    }
}

pub async fn pay(
    engine: &Engine<SledStorage>,
    order: OrderId,
    user: UserId,
    amount: u64,
) -> PaymentReceipt {
    engine
        .process_payment(event(order, user, amount, T0), T0)
        .await
        .expect("process payment")
}

/// Register `count` users under `sponsor`, ids starting at `first`
pub async fn register_directs(
    engine: &Engine<SledStorage>,
    sponsor: UserId,
    first: UserId,
    count: u64,
) -> Vec<UserId> {
    let mut ids = Vec::new();
    for id in first..first + count {
        register(engine, id, Some(sponsor)).await;
        ids.push(id);
    }
    ids
}
