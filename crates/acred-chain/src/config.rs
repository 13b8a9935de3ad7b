//! Chain client configuration.
//!
//! Loaded from environment variables or a YAML file. Contract addresses
//! are a per-network table keyed by logical contract name; ABIs are read
//! from `{abi_dir}/{ContractName}.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::tx::is_valid_eth_address;

/// Default request timeout for contract calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for liveness probes.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;

/// Gas limit attached to every contract write.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

const GWEI: u128 = 1_000_000_000;

/// The four registry contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractName {
    #[serde(rename = "DIDRegistry")]
    DidRegistry,
    #[serde(rename = "TrustRegistry")]
    TrustRegistry,
    #[serde(rename = "CredentialAnchor")]
    CredentialAnchor,
    #[serde(rename = "RevocationRegistry")]
    RevocationRegistry,
}

impl ContractName {
    pub const ALL: [ContractName; 4] = [
        Self::DidRegistry,
        Self::TrustRegistry,
        Self::CredentialAnchor,
        Self::RevocationRegistry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DidRegistry => "DIDRegistry",
            Self::TrustRegistry => "TrustRegistry",
            Self::CredentialAnchor => "CredentialAnchor",
            Self::RevocationRegistry => "RevocationRegistry",
        }
    }

    /// Environment variable holding the deployed address.
    pub fn address_env_var(&self) -> &'static str {
        match self {
            Self::DidRegistry => "DIDREGISTRY_ADDRESS",
            Self::TrustRegistry => "TRUSTREGISTRY_ADDRESS",
            Self::CredentialAnchor => "CREDENTIALANCHOR_ADDRESS",
            Self::RevocationRegistry => "REVOCATIONREGISTRY_ADDRESS",
        }
    }
}

impl std::fmt::Display for ContractName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target network. Profiles differ only in chain-id source and gas price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProfile {
    /// Local development node. Chain id is read from the node; 20 gwei.
    Ganache,
    /// Polygon. Chain id from configuration; 30 gwei.
    Polygon,
    /// Hyperledger Besu. Chain id from configuration; gas price from the
    /// node (`eth_gasPrice`), which is zero on free-gas networks.
    Besu,
}

/// Where the gas price for a write comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPricePolicy {
    Fixed(u128),
    Node,
}

impl NetworkProfile {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ganache" => Some(Self::Ganache),
            "polygon" => Some(Self::Polygon),
            "besu" => Some(Self::Besu),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ganache => "ganache",
            Self::Polygon => "polygon",
            Self::Besu => "besu",
        }
    }

    /// Whether the chain id is taken from the node rather than configuration.
    pub fn chain_id_from_node(&self) -> bool {
        matches!(self, Self::Ganache)
    }

    pub fn gas_price(&self) -> GasPricePolicy {
        match self {
            Self::Ganache => GasPricePolicy::Fixed(20 * GWEI),
            Self::Polygon => GasPricePolicy::Fixed(30 * GWEI),
            Self::Besu => GasPricePolicy::Node,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("unknown network {0:?} (expected ganache, polygon or besu)")]
    UnknownNetwork(String),
    #[error("{0} must be set for network {1}")]
    MissingChainId(&'static str, &'static str),
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
    #[error("cannot read config file {path}: {reason}")]
    File { path: String, reason: String },
}

/// Chain client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: Url,
    pub network: NetworkProfile,
    /// Required for Polygon and Besu.
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_abi_dir")]
    pub abi_dir: PathBuf,
    #[serde(default)]
    pub addresses: BTreeMap<ContractName, String>,
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_abi_dir() -> PathBuf {
    PathBuf::from("abis")
}

impl ChainConfig {
    /// A config with defaults and no contract addresses.
    pub fn new(rpc_url: Url, network: NetworkProfile) -> Self {
        Self {
            rpc_url,
            network,
            chain_id: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            abi_dir: default_abi_dir(),
            addresses: BTreeMap::new(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ACRED_RPC_URL` (default: `http://127.0.0.1:8545`)
    /// - `ACRED_NETWORK` (default: `ganache`)
    /// - `ACRED_CHAIN_ID` (required for `polygon` and `besu`)
    /// - `ACRED_ABI_DIR` (default: `abis`)
    /// - `ACRED_RPC_TIMEOUT_SECS` (default: 30)
    /// - `DIDREGISTRY_ADDRESS`, `TRUSTREGISTRY_ADDRESS`,
    ///   `CREDENTIALANCHOR_ADDRESS`, `REVOCATIONREGISTRY_ADDRESS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = env_url("ACRED_RPC_URL", "http://127.0.0.1:8545")?;
        let network_raw = std::env::var("ACRED_NETWORK").unwrap_or_else(|_| "ganache".to_string());
        let network = NetworkProfile::parse(&network_raw).ok_or(ConfigError::UnknownNetwork(network_raw))?;

        let mut config = Self::new(rpc_url, network);
        config.chain_id = env_parse("ACRED_CHAIN_ID")?;
        if let Some(secs) = env_parse("ACRED_RPC_TIMEOUT_SECS")? {
            config.timeout_secs = secs;
        }
        if let Ok(dir) = std::env::var("ACRED_ABI_DIR") {
            config.abi_dir = PathBuf::from(dir);
        }
        for name in ContractName::ALL {
            if let Ok(addr) = std::env::var(name.address_env_var()) {
                if !addr.trim().is_empty() {
                    config.addresses.insert(name, addr.trim().to_string());
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw).map_err(|e| ConfigError::File {
            path: "<yaml>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check addresses and the chain-id requirement of the profile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.network.chain_id_from_node() && self.chain_id.is_none() {
            return Err(ConfigError::MissingChainId("ACRED_CHAIN_ID", self.network.as_str()));
        }
        for (name, addr) in &self.addresses {
            if !is_valid_eth_address(addr) {
                return Err(ConfigError::InvalidValue {
                    var: name.address_env_var().to_string(),
                    reason: format!("{addr:?} is not a 0x-prefixed 20-byte address"),
                });
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn abi_path(&self, name: ContractName) -> PathBuf {
        self.abi_dir.join(format!("{}.json", name.as_str()))
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_parse(var: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}
