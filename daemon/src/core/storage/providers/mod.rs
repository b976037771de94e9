mod ledger;
mod order;
mod payout;
mod pool;
mod referral;
mod user;
mod withdrawal;

pub use self::{
    ledger::*, order::*, payout::*, pool::*, referral::*, user::*, withdrawal::*,
};
