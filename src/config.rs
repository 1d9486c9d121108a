//! Configuration for the vault test client
//!
//! Loaded from a TOML file, with `.env` support and environment variable
//! overrides. Every section has defaults that target a local test validator,
//! so a missing file is not an error.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::types::{ActorRole, DEFAULT_EXPIRY_MARGIN, LAMPORTS_PER_SOL};
use crate::vault::TRADING_VAULT_PROGRAM_ID;

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub submission: SubmissionConfig,

    #[serde(default)]
    pub funding: FundingConfig,

    #[serde(default)]
    pub keys: KeysConfig,

    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Cluster RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Commitment for blockhash and block height queries
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Commitment for balance and account reads and for preflight
    /// simulation; must observe writes the poll loop has just confirmed
    #[serde(default = "default_read_commitment")]
    pub read_commitment: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Delay between signature status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Blocks subtracted from the blockhash validity bound
    #[serde(default = "default_expiry_margin")]
    pub expiry_margin: u64,

    /// Skip preflight simulation when submitting
    #[serde(default)]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingConfig {
    /// Airdrop size in SOL
    #[serde(default = "default_airdrop_sol")]
    pub airdrop_sol: u64,

    /// Minimum balance in SOL an actor must hold before a scenario runs
    #[serde(default = "default_min_balance_sol")]
    pub min_balance_sol: u64,

    /// Upper bound on airdrop requests per funding call
    #[serde(default = "default_max_airdrops")]
    pub max_attempts: u32,
}

/// Paths to serialized secret keys, one per actor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    pub payer: Option<PathBuf>,
    pub leader: Option<PathBuf>,
    pub user: Option<PathBuf>,
    pub backend_wallet: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Deployed trading_vault program id (base58)
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// Strategy id passed to `initialize`
    #[serde(default = "default_strategy_id")]
    pub strategy_id: String,

    /// Initial deposit in pay-token UI units
    #[serde(default = "default_initial_deposit")]
    pub initial_deposit_ui: u64,

    /// Decimals of the pay token mint created for scenarios
    #[serde(default = "default_decimals")]
    pub pay_token_decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,

    #[serde(default = "default_true")]
    pub with_target: bool,
}

// Default value functions
fn default_rpc_url() -> String { "http://127.0.0.1:8899".to_string() }
fn default_commitment() -> String { "finalized".to_string() }
fn default_read_commitment() -> String { "confirmed".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_poll_interval_ms() -> u64 { 2500 }
fn default_expiry_margin() -> u64 { DEFAULT_EXPIRY_MARGIN }
fn default_airdrop_sol() -> u64 { 10 }
fn default_min_balance_sol() -> u64 { 1 }
fn default_max_airdrops() -> u32 { 16 }
fn default_program_id() -> String { TRADING_VAULT_PROGRAM_ID.to_string() }
fn default_strategy_id() -> String { "strategy-localnet".to_string() }
fn default_initial_deposit() -> u64 { 10 }
fn default_decimals() -> u8 { 6 }
fn default_log_filter() -> String { "trading_vault_client=info,vault_client=info,warn".to_string() }
fn default_true() -> bool { true }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            read_commitment: default_read_commitment(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            expiry_margin: default_expiry_margin(),
            skip_preflight: false,
        }
    }
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            airdrop_sol: default_airdrop_sol(),
            min_balance_sol: default_min_balance_sol(),
            max_attempts: default_max_airdrops(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            strategy_id: default_strategy_id(),
            initial_deposit_ui: default_initial_deposit(),
            pay_token_decimals: default_decimals(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
            with_target: default_true(),
        }
    }
}

impl RpcConfig {
    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        parse_commitment(&self.commitment)
    }

    pub fn read_commitment_config(&self) -> Result<CommitmentConfig> {
        parse_commitment(&self.read_commitment)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_commitment(level: &str) -> Result<CommitmentConfig> {
    CommitmentConfig::from_str(level).map_err(|e| anyhow!("Invalid commitment '{}': {:?}", level, e))
}

impl SubmissionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl FundingConfig {
    pub fn airdrop_lamports(&self) -> u64 {
        self.airdrop_sol.saturating_mul(LAMPORTS_PER_SOL)
    }

    pub fn min_balance_lamports(&self) -> u64 {
        self.min_balance_sol.saturating_mul(LAMPORTS_PER_SOL)
    }
}

impl KeysConfig {
    /// Configured key paths by role
    pub fn paths(&self) -> HashMap<ActorRole, PathBuf> {
        let mut paths = HashMap::new();
        let entries = [
            (ActorRole::Payer, &self.payer),
            (ActorRole::Leader, &self.leader),
            (ActorRole::User, &self.user),
            (ActorRole::BackendWallet, &self.backend_wallet),
        ];
        for (role, path) in entries {
            if let Some(path) = path {
                paths.insert(role, path.clone());
            }
        }
        paths
    }
}

impl VaultConfig {
    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .with_context(|| format!("Invalid vault program id: {}", self.program_id))
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists (defaults otherwise), then apply `.env`
    /// and environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::from_file_or_default(path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Parse `path`, or fall back to defaults when it does not exist
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path.as_ref())
        } else {
            tracing::warn!(
                "Config file '{}' not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// Environment variables override file values
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("VAULT_RPC_URL") {
            self.rpc.url = url;
        }

        if let Some(commitment) = lookup("VAULT_COMMITMENT") {
            self.rpc.commitment = commitment;
        }

        if let Some(commitment) = lookup("VAULT_READ_COMMITMENT") {
            self.rpc.read_commitment = commitment;
        }

        if let Some(interval) = lookup("VAULT_POLL_INTERVAL_MS") {
            self.submission.poll_interval_ms = interval
                .parse()
                .map_err(|e| anyhow!("Invalid VAULT_POLL_INTERVAL_MS: {}", e))?;
        }

        if let Some(program_id) = lookup("VAULT_PROGRAM_ID") {
            self.vault.program_id = program_id;
        }

        self.validate()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.rpc.url.starts_with("http://") && !self.rpc.url.starts_with("https://") {
            return Err(anyhow!("rpc.url must be an http(s) URL, got {}", self.rpc.url));
        }
        self.rpc.commitment_config()?;
        self.rpc.read_commitment_config()?;
        if self.rpc.timeout_secs == 0 {
            return Err(anyhow!("rpc.timeout_secs must be > 0"));
        }
        if self.submission.poll_interval_ms == 0 {
            return Err(anyhow!("submission.poll_interval_ms must be > 0"));
        }
        if self.funding.airdrop_sol == 0 {
            return Err(anyhow!("funding.airdrop_sol must be > 0"));
        }
        if self.funding.max_attempts == 0 {
            return Err(anyhow!("funding.max_attempts must be > 0"));
        }
        if self.vault.pay_token_decimals > 18 {
            return Err(anyhow!("vault.pay_token_decimals must be <= 18"));
        }
        self.vault.program_id()?;
        Ok(())
    }
}
