pub mod config;
pub mod error;
pub mod storage;

mod distribution;
mod engine;
mod eligibility;
mod ledger;
mod payment;
mod payout_release;
mod registration;
mod withdrawal;

pub use distribution::*;
pub use engine::*;
pub use eligibility::*;
pub use ledger::*;
pub use payment::*;
pub use payout_release::*;
pub use registration::*;
pub use withdrawal::*;
