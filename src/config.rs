//! Configuration management with validation and defaults
//!
//! Settings come from an optional TOML file, then environment overrides, then
//! validation. Everything has a default so an empty config runs every chain in
//! simulation mode.

use crate::chains::ChainKind;
use crate::errors::{ConfigurationError, GambaResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Top level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GambaConfig {
    pub chains: ChainsConfig,
    pub simulation: SimulationConfig,
    pub transaction: TransactionConfig,
    pub logging: LoggingConfig,
}

/// Per-chain overrides of the built-in tables
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainsConfig {
    pub solana: ChainSettings,
    pub ethereum: ChainSettings,
    pub bnb: ChainSettings,
}

impl ChainsConfig {
    pub fn get(&self, chain: ChainKind) -> &ChainSettings {
        match chain {
            ChainKind::Solana => &self.solana,
            ChainKind::Ethereum => &self.ethereum,
            ChainKind::Bnb => &self.bnb,
        }
    }

    pub fn get_mut(&mut self, chain: ChainKind) -> &mut ChainSettings {
        match chain {
            ChainKind::Solana => &mut self.solana,
            ChainKind::Ethereum => &mut self.ethereum,
            ChainKind::Bnb => &mut self.bnb,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChainKind, &ChainSettings)> + '_ {
        ChainKind::ALL.into_iter().map(move |chain| (chain, self.get(chain)))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// Replaces the built-in RPC endpoint
    pub rpc_endpoint: Option<String>,
    /// Hex address of the deployed betting contract (EVM chains only)
    pub betting_contract: Option<String>,
}

/// Artificial stage latencies of the simulated betting path
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimulationConfig {
    pub simulating_ms: u64,
    pub signing_ms: u64,
    pub processing_ms: u64,
    pub settling_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulating_ms: 500,
            signing_ms: 800,
            processing_ms: 1000,
            settling_ms: 500,
        }
    }
}

impl SimulationConfig {
    /// No delays at all (tests, headless use)
    pub fn instant() -> Self {
        Self {
            simulating_ms: 0,
            signing_ms: 0,
            processing_ms: 0,
            settling_ms: 0,
        }
    }

    pub fn simulating(&self) -> Duration {
        Duration::from_millis(self.simulating_ms)
    }

    pub fn signing(&self) -> Duration {
        Duration::from_millis(self.signing_ms)
    }

    pub fn processing(&self) -> Duration {
        Duration::from_millis(self.processing_ms)
    }

    pub fn settling(&self) -> Duration {
        Duration::from_millis(self.settling_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Blocks to wait for before a bet transaction counts as confirmed
    pub confirmations: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self { confirmations: 1 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "gamba_betting=info,gamba=info".to_string(),
        }
    }
}

impl GambaConfig {
    /// Configuration for tests: no artificial latency
    pub fn instant() -> Self {
        Self {
            simulation: SimulationConfig::instant(),
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> GambaResult<()> {
        if self.transaction.confirmations == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "transaction.confirmations".to_string(),
                value: "0".to_string(),
                reason: "must wait for at least one confirmation".to_string(),
            }
            .into());
        }

        if self.chains.solana.betting_contract.is_some() {
            return Err(ConfigurationError::ValidationFailed(
                "solana has no EVM betting contract; remove chains.solana.betting_contract".to_string(),
            )
            .into());
        }

        for (chain, settings) in self.chains.iter() {
            if let Some(endpoint) = &settings.rpc_endpoint {
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(ConfigurationError::InvalidValue {
                        field: format!("chains.{}.rpc_endpoint", chain),
                        value: endpoint.clone(),
                        reason: "expected an http(s) URL".to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> GambaResult<GambaConfig> {
        let mut config = match &self.config_path {
            Some(path) => Self::load_from_file(path)?,
            None => GambaConfig::default(),
        };

        Self::apply_env_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(path: &str) -> GambaResult<GambaConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Apply overrides read through `lookup` (the process environment in `load`)
    pub fn apply_env_overrides<F>(config: &mut GambaConfig, lookup: F) -> GambaResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("GAMBA_ETHEREUM_BETTING_CONTRACT") {
            config.chains.ethereum.betting_contract = Some(addr);
        }
        if let Some(addr) = lookup("GAMBA_BSC_BETTING_CONTRACT") {
            config.chains.bnb.betting_contract = Some(addr);
        }

        for (chain, key) in [
            (ChainKind::Solana, "GAMBA_SOLANA_RPC_ENDPOINT"),
            (ChainKind::Ethereum, "GAMBA_ETHEREUM_RPC_ENDPOINT"),
            (ChainKind::Bnb, "GAMBA_BNB_RPC_ENDPOINT"),
        ] {
            if let Some(endpoint) = lookup(key) {
                config.chains.get_mut(chain).rpc_endpoint = Some(endpoint);
            }
        }

        if let Some(confirmations) = lookup("GAMBA_CONFIRMATIONS") {
            config.transaction.confirmations = confirmations.parse().map_err(|_| {
                ConfigurationError::InvalidValue {
                    field: "GAMBA_CONFIRMATIONS".to_string(),
                    value: confirmations.clone(),
                    reason: "Invalid block count".to_string(),
                }
            })?;
        }

        if let Some(level) = lookup("GAMBA_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GambaConfig::default().validate().is_ok());
        assert!(GambaConfig::instant().validate().is_ok());
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        let mut config = GambaConfig::default();
        config.transaction.confirmations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_rpc_endpoint_rejected() {
        let mut config = GambaConfig::default();
        config.chains.bnb.rpc_endpoint = Some("bsc-dataseed1.binance.org".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_conversions() {
        let sim = SimulationConfig::default();
        assert_eq!(sim.signing(), Duration::from_millis(800));
        assert_eq!(sim.settling(), Duration::from_millis(500));
        assert_eq!(SimulationConfig::instant().processing(), Duration::ZERO);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GAMBA_BSC_BETTING_CONTRACT", "0x1111111111111111111111111111111111111111"),
            ("GAMBA_ETHEREUM_RPC_ENDPOINT", "http://localhost:8545"),
            ("GAMBA_CONFIRMATIONS", "3"),
        ]
        .into_iter()
        .collect();

        let mut config = GambaConfig::default();
        ConfigLoader::apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(
            config.chains.bnb.betting_contract.as_deref(),
            Some("0x1111111111111111111111111111111111111111")
        );
        assert_eq!(config.chains.ethereum.rpc_endpoint.as_deref(), Some("http://localhost:8545"));
        assert_eq!(config.transaction.confirmations, 3);
        assert!(config.chains.ethereum.betting_contract.is_none());
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = GambaConfig::default();
        let result = ConfigLoader::apply_env_overrides(&mut config, |key| {
            (key == "GAMBA_CONFIRMATIONS").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[chains.ethereum]
betting_contract = "0x2222222222222222222222222222222222222222"

[simulation]
signing_ms = 10

[transaction]
confirmations = 2
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path().to_str().unwrap()).expect("config should parse");
        assert_eq!(config.simulation.signing_ms, 10);
        assert_eq!(config.simulation.settling_ms, 500);
        assert_eq!(config.transaction.confirmations, 2);
        assert!(config.chains.ethereum.betting_contract.is_some());
    }
}
