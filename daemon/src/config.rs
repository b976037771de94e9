use lazy_static::lazy_static;

// RPC is bound to localhost by default
// Admin endpoints (payout release, pool distribution, withdrawal approval) should not be
// exposed without a bearer token, set --admin-token before binding to 0.0.0.0
pub const DEFAULT_RPC_BIND_ADDRESS: &str = "127.0.0.1:8180";

// Default path of the sled database
pub const DEFAULT_DB_PATH: &str = "commission_db/";

// Route of the Prometheus exporter when enabled
pub const DEFAULT_PROMETHEUS_ROUTE: &str = "/metrics";

// Default page size for ledger and referral listings
pub const DEFAULT_PAGE_SIZE: u32 = 50;

// Maximum number of ledger entries returned per page
pub const MAX_LEDGER_PAGE_SIZE: u32 = 1000;

// Upline levels returned by the referral summary when none is requested
pub const DEFAULT_UPLINE_LEVELS: u8 = 10;

// Maximum length of a distribution run idempotency key
pub const MAX_RUN_KEY_LEN: usize = 64;

lazy_static! {
    /// Number of HTTP workers when none is configured
    pub static ref DEFAULT_RPC_THREADS: usize = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
}

pub fn default_rpc_threads() -> usize {
    *DEFAULT_RPC_THREADS
}
