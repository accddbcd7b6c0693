//! Configuration for the worker loop and the blockchain boundary.
//!
//! Both configs can be loaded through the `config` crate. Environment
//! variables use the `STORYMINT_` prefix, e.g. `STORYMINT_RPC_URL`,
//! `STORYMINT_SIGNER_KEY`, `STORYMINT_CONTRACT_ADDRESS`,
//! `STORYMINT_POLL_INTERVAL_MS`, `STORYMINT_MAX_ATTEMPTS`.

use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use crate::chain::{is_address, is_prefixed_hex, AdapterError};

pub const ENV_PREFIX: &str = "STORYMINT";

/// Settings of a [`MintWorker`](crate::MintWorker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Used in logs to tell concurrent workers apart.
    pub worker_id: String,
    /// Fixed delay between ticks.
    pub poll_interval: Duration,
    /// Poison threshold: an event fails permanently once its attempt
    /// counter reaches this value on a terminal error.
    pub max_attempts: u32,
    /// Stored error text is truncated to this many characters.
    pub max_error_len: usize,
    /// Requeue events left in `processing` for longer than this. Must exceed
    /// the longest adapter call, see [`WorkerConfig::with_reclaim_after`].
    /// `None` leaves stalled events for an operator.
    pub reclaim_after: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("mint-worker-{}", std::process::id()),
            poll_interval: Duration::from_secs(2),
            max_attempts: 20,
            max_error_len: 500,
            reclaim_after: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WorkerSettings {
    worker_id: Option<String>,
    poll_interval_ms: Option<u64>,
    max_attempts: Option<u32>,
    max_error_len: Option<usize>,
    reclaim_after_secs: Option<u64>,
}

impl WorkerConfig {
    /// Set the worker ID.
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    /// Set the delay between ticks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the maximum number of attempts before failing an event.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Set the maximum stored length of error text.
    pub fn with_max_error_len(mut self, len: usize) -> Self {
        self.max_error_len = len;
        self
    }

    /// Reclaim events stuck in `processing` for longer than `after`.
    ///
    /// `after` must exceed the longest adapter call. A claimer still inside a
    /// slow `submit_mint` leaves its intent `pending`, and a worker that
    /// reclaims the event meanwhile will submit the mint a second time.
    pub fn with_reclaim_after(mut self, after: Duration) -> Self {
        self.reclaim_after = Some(after);
        self
    }

    /// Load from `STORYMINT_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Self::from_config(&settings)
    }

    /// Read worker keys from an already built `Config`; missing keys keep defaults.
    pub fn from_config(settings: &Config) -> Result<Self, config::ConfigError> {
        let raw: WorkerSettings = settings.clone().try_deserialize()?;
        let mut worker = Self::default();
        if let Some(id) = raw.worker_id {
            worker = worker.with_worker_id(id);
        }
        if let Some(ms) = raw.poll_interval_ms {
            worker = worker.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(max) = raw.max_attempts {
            worker = worker.with_max_attempts(max);
        }
        if let Some(len) = raw.max_error_len {
            worker = worker.with_max_error_len(len);
        }
        if let Some(secs) = raw.reclaim_after_secs {
            worker = worker.with_reclaim_after(Duration::from_secs(secs));
        }
        Ok(worker)
    }
}

/// Connection settings for the blockchain adapter.
#[derive(Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub signer_key: String,
    pub contract_address: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("signer_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl ChainConfig {
    /// Load and validate from `STORYMINT_*` environment variables.
    pub fn from_env() -> Result<Self, AdapterError> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|e| AdapterError::Misconfigured(e.to_string()))?;
        Self::from_config(&settings)
    }

    /// Read and validate from an already built `Config`.
    pub fn from_config(settings: &Config) -> Result<Self, AdapterError> {
        let chain: ChainConfig = settings
            .clone()
            .try_deserialize()
            .map_err(|e| AdapterError::Misconfigured(e.to_string()))?;
        chain.validate()?;
        Ok(chain)
    }

    /// Check every field eagerly so a bad deployment fails on first use.
    pub fn validate(&self) -> Result<(), AdapterError> {
        let rpc_url = self.rpc_url.trim();
        if rpc_url.is_empty() {
            return Err(AdapterError::Misconfigured("missing rpc_url".into()));
        }
        if !["http://", "https://"]
            .iter()
            .any(|scheme| rpc_url.starts_with(scheme))
        {
            return Err(AdapterError::Misconfigured(format!(
                "rpc_url must be an http(s) endpoint, got '{}'",
                rpc_url
            )));
        }

        if self.signer_key.trim().is_empty() {
            return Err(AdapterError::Misconfigured("missing signer_key".into()));
        }
        let key = self.signer_key.trim();
        let prefixed = if key.starts_with("0x") {
            key.to_string()
        } else {
            format!("0x{}", key)
        };
        if !is_prefixed_hex(&prefixed, 32) {
            return Err(AdapterError::Misconfigured(
                "signer_key must be a 32-byte hex private key".into(),
            ));
        }

        if self.contract_address.trim().is_empty() {
            return Err(AdapterError::Misconfigured("missing contract_address".into()));
        }
        if !is_address(self.contract_address.trim()) {
            return Err(AdapterError::Misconfigured(format!(
                "invalid contract address format '{}'",
                self.contract_address
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn chain() -> ChainConfig {
        ChainConfig {
            rpc_url: "http://127.0.0.1:8545".into(),
            signer_key: KEY.into(),
            contract_address: CONTRACT.into(),
            chain_id: Some(31337),
        }
    }

    #[test]
    fn worker_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 20);
        assert_eq!(config.max_error_len, 500);
        assert_eq!(config.reclaim_after, None);
    }

    #[test]
    fn worker_builder() {
        let config = WorkerConfig::default()
            .with_worker_id("test-worker")
            .with_poll_interval(Duration::from_millis(10))
            .with_max_attempts(3)
            .with_reclaim_after(Duration::from_secs(600));

        assert_eq!(config.worker_id, "test-worker");
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.reclaim_after, Some(Duration::from_secs(600)));
    }

    #[test]
    fn worker_from_config_overrides_defaults() {
        let settings = Config::builder()
            .set_override("poll_interval_ms", 250)
            .unwrap()
            .set_override("max_attempts", 5)
            .unwrap()
            .build()
            .unwrap();

        let config = WorkerConfig::from_config(&settings).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.max_error_len, 500);
    }

    #[test]
    fn valid_chain_config() {
        assert!(chain().validate().is_ok());

        let mut bare_key = chain();
        bare_key.signer_key = KEY.trim_start_matches("0x").into();
        assert!(bare_key.validate().is_ok());
    }

    #[test]
    fn chain_config_rejects_bad_values() {
        let mut missing_url = chain();
        missing_url.rpc_url = String::new();
        assert!(matches!(
            missing_url.validate(),
            Err(AdapterError::Misconfigured(_))
        ));

        let mut ws_url = chain();
        ws_url.rpc_url = "ws://127.0.0.1:8546".into();
        assert!(ws_url.validate().is_err());

        let mut short_key = chain();
        short_key.signer_key = "0x1234".into();
        assert!(short_key.validate().is_err());

        let mut bad_contract = chain();
        bad_contract.contract_address = "0xnope".into();
        let err = bad_contract.validate().unwrap_err();
        assert!(err.to_string().contains("invalid contract address"));
    }

    #[test]
    fn chain_from_config_requires_every_key() {
        let settings = Config::builder()
            .set_override("rpc_url", "http://127.0.0.1:8545")
            .unwrap()
            .build()
            .unwrap();

        let err = ChainConfig::from_config(&settings).unwrap_err();
        assert!(matches!(err, AdapterError::Misconfigured(_)));
    }

    #[test]
    fn debug_redacts_signer_key() {
        let rendered = format!("{:?}", chain());
        assert!(!rendered.contains(KEY));
        assert!(rendered.contains("<redacted>"));
    }
}
