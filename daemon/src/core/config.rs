use crate::config::{
    default_rpc_threads, DEFAULT_DB_PATH, DEFAULT_PROMETHEUS_ROUTE, DEFAULT_RPC_BIND_ADDRESS,
};
use clap::{Parser, ValueEnum};
use commission_common::{
    config::{
        DEFAULT_MAX_SPONSOR_DEPTH, DEFAULT_MIN_WITHDRAWAL, DEFAULT_MONTHLY_PURCHASE_THRESHOLD,
        DEFAULT_REQUIRED_DIRECT_REFERRALS, DEFAULT_REQUIRED_REFERRALS_PER_DIRECT,
        UPCOMING_PAYOUT_WINDOW_SECS, VERSION,
    },
    eligibility::EligibilityRules,
    withdrawal::WithdrawalRules,
};
use serde::{Deserialize, Serialize};
use strum::Display;

// Functions Helpers
fn default_rpc_bind_address() -> String {
    DEFAULT_RPC_BIND_ADDRESS.to_owned()
}

fn default_prometheus_route() -> String {
    DEFAULT_PROMETHEUS_ROUTE.to_owned()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_owned()
}

fn default_min_withdrawal() -> u64 {
    DEFAULT_MIN_WITHDRAWAL
}

fn default_monthly_purchase_threshold() -> u64 {
    DEFAULT_MONTHLY_PURCHASE_THRESHOLD
}

fn default_max_sponsor_depth() -> u32 {
    DEFAULT_MAX_SPONSOR_DEPTH
}

fn default_required_direct_referrals() -> u32 {
    DEFAULT_REQUIRED_DIRECT_REFERRALS
}

fn default_required_referrals_per_direct() -> u32 {
    DEFAULT_REQUIRED_REFERRALS_PER_DIRECT
}

fn default_upcoming_window_secs() -> u64 {
    UPCOMING_PAYOUT_WINDOW_SECS
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

// This struct is used to configure the HTTP server
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct RPCConfig {
    /// RPC bind address to listen for HTTP requests
    #[clap(long = "rpc-bind-address", default_value_t = default_rpc_bind_address())]
    #[serde(default = "default_rpc_bind_address")]
    pub bind_address: String,
    /// Number of workers to spawn for the HTTP server
    #[clap(long = "rpc-threads", default_value_t = default_rpc_threads())]
    #[serde(default = "default_rpc_threads")]
    pub threads: usize,
    /// Bearer token required on admin and scheduler endpoints
    /// If not set, these endpoints are open
    #[clap(long = "admin-token")]
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for RPCConfig {
    fn default() -> Self {
        Self {
            bind_address: default_rpc_bind_address(),
            threads: default_rpc_threads(),
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Enable Prometheus metrics server
    /// This only works if the RPC server is enabled.
    #[clap(long = "prometheus-enable")]
    #[serde(default)]
    pub enable: bool,
    /// Route for the Prometheus metrics export
    #[clap(long = "prometheus-route", default_value_t = default_prometheus_route())]
    #[serde(default = "default_prometheus_route")]
    pub route: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enable: false,
            route: default_prometheus_route(),
        }
    }
}

/// Business rules of the engine, all amounts in minor currency units
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum amount of a withdrawal request
    #[clap(long, default_value_t = DEFAULT_MIN_WITHDRAWAL)]
    #[serde(default = "default_min_withdrawal")]
    pub min_withdrawal: u64,
    /// Purchases needed in the current month for repurchase eligibility
    #[clap(long, default_value_t = DEFAULT_MONTHLY_PURCHASE_THRESHOLD)]
    #[serde(default = "default_monthly_purchase_threshold")]
    pub monthly_purchase_threshold: u64,
    /// Maximum number of sponsors walked by a single team formation cascade
    #[clap(long, default_value_t = DEFAULT_MAX_SPONSOR_DEPTH)]
    #[serde(default = "default_max_sponsor_depth")]
    pub max_sponsor_depth: u32,
    /// Direct referrals needed by the 3-3 rule
    #[clap(long, default_value_t = DEFAULT_REQUIRED_DIRECT_REFERRALS)]
    #[serde(default = "default_required_direct_referrals")]
    pub required_direct_referrals: u32,
    /// Referrals each direct referral needs under the 3-3 rule
    #[clap(long, default_value_t = DEFAULT_REQUIRED_REFERRALS_PER_DIRECT)]
    #[serde(default = "default_required_referrals_per_direct")]
    pub required_referrals_per_direct: u32,
    /// Window of the upcoming payouts report, in seconds
    #[clap(long, default_value_t = UPCOMING_PAYOUT_WINDOW_SECS)]
    #[serde(default = "default_upcoming_window_secs")]
    pub upcoming_window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_withdrawal: DEFAULT_MIN_WITHDRAWAL,
            monthly_purchase_threshold: DEFAULT_MONTHLY_PURCHASE_THRESHOLD,
            max_sponsor_depth: DEFAULT_MAX_SPONSOR_DEPTH,
            required_direct_referrals: DEFAULT_REQUIRED_DIRECT_REFERRALS,
            required_referrals_per_direct: DEFAULT_REQUIRED_REFERRALS_PER_DIRECT,
            upcoming_window_secs: UPCOMING_PAYOUT_WINDOW_SECS,
        }
    }
}

impl EngineConfig {
    pub fn withdrawal_rules(&self) -> WithdrawalRules {
        WithdrawalRules {
            min_amount: self.min_withdrawal,
        }
    }

    pub fn eligibility_rules(&self) -> EligibilityRules {
        EligibilityRules {
            required_direct_referrals: self.required_direct_referrals,
            required_referrals_per_direct: self.required_referrals_per_direct,
            monthly_purchase_threshold: self.monthly_purchase_threshold,
        }
    }
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[clap(
    version = VERSION,
    about = "Commission settlement engine: wallet ledger, self payouts, team formation and turnover pool"
)]
#[command(styles = commission_common::get_cli_styles())]
pub struct Config {
    /// RPC configuration
    #[clap(flatten)]
    #[serde(default)]
    pub rpc: RPCConfig,
    /// Prometheus configuration
    #[clap(flatten)]
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    /// Engine rules
    #[clap(flatten)]
    #[serde(default)]
    pub engine: EngineConfig,
    /// Set the path for the database
    #[clap(long, default_value_t = default_db_path())]
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Set log level, overridden by RUST_LOG when set
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub log_level: LogLevel,
    /// JSON File to load the configuration from
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub config_file: Option<String>,
    /// Generate the template at the `config_file` path
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub generate_config_template: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse_from(["commission_daemon"]);
        assert_eq!(config.rpc.bind_address, DEFAULT_RPC_BIND_ADDRESS);
        assert!(config.rpc.admin_token.is_none());
        assert!(!config.prometheus.enable);
        assert_eq!(config.engine.min_withdrawal, 30_000);
        assert_eq!(config.engine.monthly_purchase_threshold, 50_000);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_parse_flags() {
        let config = Config::parse_from([
            "commission_daemon",
            "--rpc-bind-address",
            "0.0.0.0:9000",
            "--admin-token",
            "secret",
            "--prometheus-enable",
            "--min-withdrawal",
            "100",
            "--log-level",
            "debug",
        ]);
        assert_eq!(config.rpc.bind_address, "0.0.0.0:9000");
        assert_eq!(config.rpc.admin_token.as_deref(), Some("secret"));
        assert!(config.prometheus.enable);
        assert_eq!(config.engine.withdrawal_rules().min_amount, 100);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_config_file_defaults() {
        let config: Config = serde_json::from_str("{\"engine\": {\"min_withdrawal\": 500}}").unwrap();
        assert_eq!(config.engine.min_withdrawal, 500);
        assert_eq!(config.engine.max_sponsor_depth, DEFAULT_MAX_SPONSOR_DEPTH);
        assert_eq!(config.rpc.bind_address, DEFAULT_RPC_BIND_ADDRESS);
        assert_eq!(config.db_path, DEFAULT_DB_PATH);
    }
}
