use strum::{AsRefStr, Display, EnumIter};

// All ids are stored big-endian so that prefix scans return rows in id order
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, EnumIter, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    // {user_id} => {user}
    Users,
    // {referral_code} => {user_id}
    ReferralCodes,
    // Adjacency index of the sponsor tree
    // {sponsor_id}{user_id} => {}
    DirectReferrals,
    // {user_id} => {downline progress}
    DownlineProgress,
    // {leader_id}{team_sequence} => {team}
    Teams,

    // {order_id} => {order}
    Orders,
    // {user_id}{order_id} => {}
    UserOrders,
    // {user_id}{yyyymm} => {total}
    MonthlyTotals,

    // Append-only wallet ledger
    // {user_id}{sequence} => {entry}
    Ledger,
    // One entry per cause and user
    // {user_id}{reference} => {sequence}
    LedgerReferences,

    // {order_id}{installment} => {payout}
    Payouts,
    // Scheduled payouts ordered by due date
    // {due_at}{order_id}{installment} => {}
    PayoutsDue,

    // {run_key} => {run}
    DistributionRuns,
    // {run_key_len}{run_key}{user_id} => {credit}
    DistributionCredits,

    // {withdrawal_id} => {request}
    Withdrawals,
    // Requests grouped by their current status
    // {status}{withdrawal_id} => {}
    WithdrawalsByStatus,

    // Misc data with no specific rules
    Common,
}
