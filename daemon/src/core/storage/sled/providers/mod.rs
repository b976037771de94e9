mod ledger;
mod order;
mod payout;
mod pool;
mod referral;
mod user;
mod withdrawal;
