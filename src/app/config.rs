//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides. Account ids come from the environment only; keys never
//! appear here because signing happens in the external signer relay.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use crate::error::{ConfigError, Result};

/// NEAR allows at most 300 Tgas per function call.
pub const MAX_GAS: u64 = 300_000_000_000_000;

/// Largest accepted retry backoff multiplier.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

const NETWORK_IDS: [&str; 4] = ["mainnet", "testnet", "betanet", "localnet"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Quote and log events without submitting responses.
    #[serde(default)]
    pub dry_run: bool,
    /// Path to a JSON status snapshot rewritten on every status tick.
    #[serde(default)]
    pub status_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_network_id")]
    pub network_id: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Relay that signs and broadcasts function calls for the agent account.
    #[serde(default = "default_signer_url")]
    pub signer_url: String,
    /// Finality used for every view call, events and reserves alike.
    #[serde(default = "default_finality")]
    pub finality: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_network_id() -> String {
    "mainnet".into()
}

fn default_rpc_url() -> String {
    "https://rpc.mainnet.near.org".into()
}

fn default_signer_url() -> String {
    "http://127.0.0.1:3030".into()
}

fn default_finality() -> String {
    "final".into()
}

const fn default_timeout_ms() -> u64 {
    5_000
}

const fn default_connect_timeout_ms() -> u64 {
    2_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network_id: default_network_id(),
            rpc_url: default_rpc_url(),
            signer_url: default_signer_url(),
            finality: default_finality(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Contract addresses and method names.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    /// Contract that emits swap-request events and receives responses.
    #[serde(default = "default_watched_contract")]
    pub watched: String,
    /// Contract that exposes pool balances.
    #[serde(default = "default_pool_contract")]
    pub pool: String,
    #[serde(default = "default_event_kind")]
    pub event_kind: String,
    #[serde(default = "default_events_method")]
    pub events_method: String,
    #[serde(default = "default_balances_method")]
    pub balances_method: String,
    #[serde(default = "default_response_method")]
    pub response_method: String,
}

fn default_watched_contract() -> String {
    "amm.iqai.near".into()
}

fn default_pool_contract() -> String {
    "amm-iqai.near".into()
}

fn default_event_kind() -> String {
    crate::domain::SWAP_REQUEST_EVENT.into()
}

fn default_events_method() -> String {
    "get_events".into()
}

fn default_balances_method() -> String {
    "get_swap_balances".into()
}

fn default_response_method() -> String {
    "agent_response".into()
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            watched: default_watched_contract(),
            pool: default_pool_contract(),
            event_kind: default_event_kind(),
            events_method: default_events_method(),
            balances_method: default_balances_method(),
            response_method: default_response_method(),
        }
    }
}

/// Gas and deposit attached to response submissions.
#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    /// Kept as a string in the file to match the `NEAR_GAS_LIMIT` env var.
    #[serde(default = "default_gas_limit")]
    pub limit: String,
    /// Deposit in yoctoNEAR, as a string for the same reason.
    #[serde(default = "default_deposit")]
    pub response_deposit: String,
}

fn default_deposit() -> String {
    "0".into()
}

fn default_gas_limit() -> String {
    MAX_GAS.to_string()
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            limit: default_gas_limit(),
            response_deposit: default_deposit(),
        }
    }
}

impl GasConfig {
    /// Parsed gas limit. Valid once [`Config::load`] has succeeded.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.trim().parse().unwrap_or(MAX_GAS)
    }

    /// Parsed response deposit. Valid once [`Config::load`] has succeeded.
    #[must_use]
    pub fn response_deposit(&self) -> u128 {
        self.response_deposit.trim().parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Fast trigger: watch for events and respond.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
    /// Slow trigger: aggregate status report.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Upper bound on one event's quote + submit.
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,
    /// Cursor to start from when the process boots.
    #[serde(default)]
    pub start_cursor: u64,
    /// How many submitted correlation ids to remember.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

const fn default_watch_interval_ms() -> u64 {
    1_000
}

const fn default_status_interval_ms() -> u64 {
    30_000
}

const fn default_page_size() -> u32 {
    50
}

const fn default_max_pages() -> u32 {
    20
}

const fn default_event_timeout_ms() -> u64 {
    15_000
}

const fn default_dedup_capacity() -> usize {
    10_000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            watch_interval_ms: default_watch_interval_ms(),
            status_interval_ms: default_status_interval_ms(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            event_timeout_ms: default_event_timeout_ms(),
            start_cursor: 0,
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub const fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    #[must_use]
    pub const fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    #[must_use]
    pub const fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }
}

/// Retry policy for reads inside a single tick. Submissions never retry.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    200
}

const fn default_max_backoff_ms() -> u64 {
    2_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeMode {
    /// Quote service runs as a task in this process.
    #[default]
    Local,
    /// Quote service runs elsewhere and is reached over TCP.
    Tcp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub mode: BridgeMode,
    #[serde(default = "default_bridge_address")]
    pub address: String,
    #[serde(default = "default_bridge_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_bridge_queue")]
    pub queue_capacity: usize,
}

fn default_bridge_address() -> String {
    "127.0.0.1:7400".into()
}

const fn default_bridge_timeout_ms() -> u64 {
    10_000
}

const fn default_bridge_queue() -> usize {
    64
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: BridgeMode::default(),
            address: default_bridge_address(),
            timeout_ms: default_bridge_timeout_ms(),
            queue_capacity: default_bridge_queue(),
        }
    }
}

impl BridgeConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_bind")]
    pub bind: String,
}

const fn default_true() -> bool {
    true
}

fn default_health_bind() -> String {
    "0.0.0.0:8080".into()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_health_bind(),
        }
    }
}

/// Accounts. Loaded from `AGENT_ACCOUNT_ID` / `USER_ACCOUNT_ID` at runtime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConfig {
    /// Account that submits quote responses.
    #[serde(skip)]
    pub agent_account_id: Option<String>,
    /// Account used by the operator `swap` and `balances` commands.
    #[serde(skip)]
    pub user_account_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            contracts: ContractsConfig::default(),
            gas: GasConfig::default(),
            polling: PollingConfig::default(),
            retry: RetryConfig::default(),
            bridge: BridgeConfig::default(),
            health: HealthConfig::default(),
            account: AccountConfig::default(),
            logging: LoggingConfig::default(),
            dry_run: false,
            status_file: None,
        }
    }
}

impl Config {
    /// Load from a TOML file, apply environment overrides, then validate.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML content, apply environment overrides, then validate.
    #[allow(clippy::result_large_err)]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a closure so tests do not touch process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NEAR_NETWORK_ID") {
            self.network.network_id = v;
        }
        if let Some(v) = lookup("NEAR_NODE_URL") {
            self.network.rpc_url = v;
        }
        if let Some(v) = lookup("NEAR_SIGNER_URL") {
            self.network.signer_url = v;
        }
        if let Some(v) = lookup("NEAR_GAS_LIMIT") {
            self.gas.limit = v;
        }
        if let Some(port) = lookup("PORT") {
            let host = self
                .health
                .bind
                .rsplit_once(':')
                .map_or("0.0.0.0", |(host, _)| host)
                .to_string();
            self.health.bind = format!("{host}:{port}");
        }
        if lookup("DEBUG").is_some_and(|v| matches!(v.as_str(), "1" | "true" | "TRUE")) {
            self.logging.level = "debug".into();
        }
        self.account.agent_account_id = lookup("AGENT_ACCOUNT_ID");
        self.account.user_account_id = lookup("USER_ACCOUNT_ID");
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if !NETWORK_IDS.contains(&self.network.network_id.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "network_id",
                reason: format!("expected one of {NETWORK_IDS:?}"),
            }
            .into());
        }
        validate_url("rpc_url", &self.network.rpc_url)?;
        validate_url("signer_url", &self.network.signer_url)?;
        if !matches!(self.network.finality.as_str(), "final" | "optimistic") {
            return Err(ConfigError::InvalidValue {
                field: "finality",
                reason: "expected \"final\" or \"optimistic\"".into(),
            }
            .into());
        }

        for (field, value) in [
            ("watched", &self.contracts.watched),
            ("pool", &self.contracts.pool),
        ] {
            if !is_valid_account_id(value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{value:?} is not a valid account id"),
                }
                .into());
            }
        }
        for (field, value) in [
            ("event_kind", &self.contracts.event_kind),
            ("events_method", &self.contracts.events_method),
            ("balances_method", &self.contracts.balances_method),
            ("response_method", &self.contracts.response_method),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField { field }.into());
            }
        }

        match self.gas.limit.trim().parse::<u64>() {
            Ok(gas) if gas > 0 && gas <= MAX_GAS => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "gas_limit",
                    reason: format!("{:?} must be an integer in 1..={MAX_GAS}", self.gas.limit),
                }
                .into())
            }
        }

        if self.gas.response_deposit.trim().parse::<u128>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "response_deposit",
                reason: format!("{:?} is not an integer yoctoNEAR amount", self.gas.response_deposit),
            }
            .into());
        }

        for (field, value) in [
            ("watch_interval_ms", self.polling.watch_interval_ms),
            ("status_interval_ms", self.polling.status_interval_ms),
            ("event_timeout_ms", self.polling.event_timeout_ms),
            ("timeout_ms", self.network.timeout_ms),
            ("bridge_timeout_ms", self.bridge.timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".into(),
                }
                .into());
            }
        }
        if self.polling.page_size == 0 || self.polling.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: "page_size and max_pages must be greater than zero".into(),
            }
            .into());
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "at least one attempt is required".into(),
            }
            .into());
        }
        let multiplier = self.retry.backoff_multiplier;
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: format!("{multiplier} must be in 1.0..={MAX_BACKOFF_MULTIPLIER}"),
            }
            .into());
        }
        if self.bridge.mode == BridgeMode::Tcp {
            self.bridge
                .address
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "bridge.address",
                    reason: e.to_string(),
                })?;
        }
        if self.health.enabled {
            self.health
                .bind
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "health.bind",
                    reason: e.to_string(),
                })?;
        }
        if let Some(account) = &self.account.agent_account_id {
            if !is_valid_account_id(account) {
                return Err(ConfigError::InvalidValue {
                    field: "AGENT_ACCOUNT_ID",
                    reason: format!("{account:?} is not a valid account id"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Agent account id, required for anything that submits responses.
    #[allow(clippy::result_large_err)]
    pub fn agent_account(&self) -> Result<&str> {
        self.account
            .agent_account_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                field: "AGENT_ACCOUNT_ID",
            }
            .into())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

fn validate_url(field: &'static str, value: &str) -> std::result::Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(())
}

/// NEAR account id rules: 2-64 chars of `a-z0-9._-`.
#[must_use]
pub fn is_valid_account_id(id: &str) -> bool {
    (2..=64).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::Error;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("NEAR_NETWORK_ID", "testnet"),
            ("NEAR_GAS_LIMIT", "100000000000000"),
            ("AGENT_ACCOUNT_ID", "agent.testnet"),
            ("PORT", "9090"),
            ("DEBUG", "true"),
        ]));

        assert_eq!(config.network.network_id, "testnet");
        assert_eq!(config.gas.limit(), 100_000_000_000_000);
        assert_eq!(config.agent_account().unwrap(), "agent.testnet");
        assert_eq!(config.health.bind, "0.0.0.0:9090");
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_network() {
        let mut config = Config::default();
        config.network.network_id = "devnet".into();
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "network_id",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_gas_above_protocol_limit() {
        let mut config = Config::default();
        config.gas.limit = "300000000000001".into();
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "gas_limit",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_zero_intervals() {
        let mut config = Config::default();
        config.polling.status_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "status_interval_ms",
                ..
            }))
        ));
    }

    #[test]
    fn missing_agent_account_is_reported() {
        let config = Config::default();
        assert!(matches!(
            config.agent_account(),
            Err(Error::Config(ConfigError::MissingField {
                field: "AGENT_ACCOUNT_ID"
            }))
        ));
    }

    #[test]
    fn account_id_rules() {
        assert!(is_valid_account_id("amm.iqai.near"));
        assert!(!is_valid_account_id("Upper.near"));
        assert!(!is_valid_account_id("a"));
    }
}
