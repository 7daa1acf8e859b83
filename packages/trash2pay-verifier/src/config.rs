//! Verifier configuration.
//!
//! Loaded from an optional `trash2pay.toml` and `TRASH2PAY_*` environment
//! variables. A single `_` follows the prefix and `__` separates nested keys:
//! `TRASH2PAY_BIND_ADDRESS`, `TRASH2PAY_SETTLEMENT__MODE`.

use serde::Deserialize;
use std::time::Duration;

use crate::channel::{ScanParameters, ScanSource};
use crate::settlement::SettlementPolicy;

/// Configuration for the verifier service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    /// Required on mutating routes when set.
    #[serde(default = "defaults::api_key")]
    pub api_key: Option<String>,

    #[serde(default = "defaults::max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub settlement: SettlementConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

const ENV_PREFIX: &str = "TRASH2PAY";

impl Config {
    /// Read `trash2pay.toml` (if present) and the process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_env(None)
    }

    /// As [`Config::load`], with `env` standing in for the process
    /// environment when given.
    pub fn load_with_env(
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("trash2pay").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: defaults::bind_address(),
            api_key: defaults::api_key(),
            max_concurrent_requests: defaults::max_concurrent_requests(),
            wallet: WalletConfig::default(),
            settlement: SettlementConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

/// HandCash wallet API access.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "defaults::handcash_api_url")]
    pub api_url: String,

    #[serde(default = "defaults::handcash_connect_url")]
    pub connect_url: String,

    #[serde(default = "defaults::handcash_app_id")]
    pub app_id: Option<String>,

    #[serde(default = "defaults::handcash_app_secret")]
    pub app_secret: Option<String>,

    /// Handle receiving registration fees.
    #[serde(default = "defaults::platform_wallet")]
    pub platform_wallet: String,

    #[serde(default = "defaults::registration_fee_satoshis")]
    pub registration_fee_satoshis: u64,

    /// Currency code used when paying out rewards.
    #[serde(default = "defaults::reward_currency_code")]
    pub reward_currency_code: String,

    #[serde(default = "defaults::explorer_tx_url")]
    pub explorer_tx_url: String,

    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::handcash_api_url(),
            connect_url: defaults::handcash_connect_url(),
            app_id: defaults::handcash_app_id(),
            app_secret: defaults::handcash_app_secret(),
            platform_wallet: defaults::platform_wallet(),
            registration_fee_satoshis: defaults::registration_fee_satoshis(),
            reward_currency_code: defaults::reward_currency_code(),
            explorer_tx_url: defaults::explorer_tx_url(),
            request_timeout_ms: defaults::request_timeout_ms(),
        }
    }
}

/// Which backend distributes rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementMode {
    /// Waits `simulated_delay_ms` and reports success without moving funds.
    Simulated,
    /// Pays both shares from the platform wallet through the HandCash Pay API.
    Handcash,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    #[serde(default = "defaults::settlement_mode")]
    pub mode: SettlementMode,

    /// Per-attempt deadline.
    #[serde(default = "defaults::settlement_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "defaults::settlement_max_retries")]
    pub max_retries: u32,

    #[serde(default = "defaults::settlement_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "defaults::simulated_delay_ms")]
    pub simulated_delay_ms: u64,

    /// Platform wallet auth token used to pay rewards in `handcash` mode.
    #[serde(default = "defaults::platform_auth_token")]
    pub auth_token: Option<String>,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            mode: defaults::settlement_mode(),
            timeout_ms: defaults::settlement_timeout_ms(),
            max_retries: defaults::settlement_max_retries(),
            base_delay_ms: defaults::settlement_base_delay_ms(),
            simulated_delay_ms: defaults::simulated_delay_ms(),
            auth_token: defaults::platform_auth_token(),
        }
    }
}

impl SettlementConfig {
    pub fn policy(&self) -> SettlementPolicy {
        SettlementPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Reject unreadable codes instead of substituting the demo record.
    #[serde(default)]
    pub strict_decoding: bool,

    #[serde(default = "defaults::scan_source")]
    pub source: ScanSource,

    #[serde(default = "defaults::scan_fps")]
    pub fps: u32,

    #[serde(default = "defaults::scan_box_size")]
    pub box_size: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            strict_decoding: false,
            source: defaults::scan_source(),
            fps: defaults::scan_fps(),
            box_size: defaults::scan_box_size(),
        }
    }
}

impl ScanConfig {
    pub fn parameters(&self) -> ScanParameters {
        ScanParameters {
            fps: self.fps,
            box_width: self.box_size,
            box_height: self.box_size,
        }
    }
}

mod defaults {
    use super::SettlementMode;
    use crate::channel::ScanSource;

    fn non_empty_env(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    pub fn bind_address() -> String {
        "0.0.0.0:3050".into()
    }

    pub fn api_key() -> Option<String> {
        non_empty_env("TRASH2PAY_API_KEY")
    }

    pub fn max_concurrent_requests() -> usize {
        256
    }

    pub fn handcash_api_url() -> String {
        "https://cloud.handcash.io".into()
    }

    pub fn handcash_connect_url() -> String {
        "https://app.handcash.io".into()
    }

    pub fn handcash_app_id() -> Option<String> {
        non_empty_env("HANDCASH_APP_ID")
    }

    pub fn handcash_app_secret() -> Option<String> {
        non_empty_env("HANDCASH_APP_SECRET")
    }

    pub fn platform_wallet() -> String {
        "trash2pay".into()
    }

    pub fn registration_fee_satoshis() -> u64 {
        100
    }

    pub fn reward_currency_code() -> String {
        "SAT".into()
    }

    pub fn explorer_tx_url() -> String {
        "https://whatsonchain.com/tx".into()
    }

    pub fn request_timeout_ms() -> u64 {
        10_000
    }

    pub fn settlement_mode() -> SettlementMode {
        SettlementMode::Simulated
    }

    pub fn settlement_timeout_ms() -> u64 {
        15_000
    }

    pub fn settlement_max_retries() -> u32 {
        2
    }

    pub fn settlement_base_delay_ms() -> u64 {
        200
    }

    pub fn simulated_delay_ms() -> u64 {
        1_500
    }

    pub fn platform_auth_token() -> Option<String> {
        non_empty_env("HANDCASH_PLATFORM_AUTH_TOKEN")
    }

    pub fn scan_source() -> ScanSource {
        ScanSource::Environment
    }

    pub fn scan_fps() -> u32 {
        10
    }

    pub fn scan_box_size() -> u32 {
        250
    }
}
