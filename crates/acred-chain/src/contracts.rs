//! Registry contract table: ABI and deployed address per logical contract.

use std::collections::BTreeMap;

use crate::abi::{AbiFunction, ContractAbi};
use crate::config::{ChainConfig, ContractName};
use crate::error::ChainError;
use crate::tx::parse_address;

/// Method names on the registry contracts.
pub mod methods {
    pub const REGISTER_DID: &str = "registerDID";
    pub const RESOLVE_DID: &str = "resolveDID";
    pub const IS_DID_REGISTERED: &str = "isDIDRegistered";
    pub const SET_ISSUER_TRUST_STATUS: &str = "setIssuerTrustStatus";
    pub const IS_ISSUER_TRUSTED: &str = "isIssuerTrusted";
    pub const STORE_PROOF: &str = "storeProof";
    pub const VERIFY_PROOF: &str = "verifyProof";
    pub const REVOKE_CREDENTIAL: &str = "revokeCredential";
    pub const IS_REVOKED: &str = "isRevoked";
}

/// One deployed contract.
#[derive(Debug, Clone)]
pub struct DeployedContract {
    pub abi: ContractAbi,
    pub address: [u8; 20],
}

impl DeployedContract {
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }
}

/// ABI and address for each contract that could be resolved.
///
/// Missing entries are not an error at load time; calls against them fail
/// with [`ChainError::Contract`].
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    entries: BTreeMap<ContractName, DeployedContract>,
    problems: BTreeMap<ContractName, String>,
}

impl ContractRegistry {
    /// Resolve every contract named in `config`.
    pub fn load(config: &ChainConfig) -> Self {
        let mut registry = Self::default();
        for name in ContractName::ALL {
            let Some(addr) = config.addresses.get(&name) else {
                registry
                    .problems
                    .insert(name, format!("address not set ({})", name.address_env_var()));
                continue;
            };
            let Some(address) = parse_address(addr) else {
                registry.problems.insert(name, format!("invalid address {addr}"));
                continue;
            };
            let path = config.abi_path(name);
            match ContractAbi::load(&path) {
                Ok(abi) => {
                    registry.entries.insert(name, DeployedContract { abi, address });
                }
                Err(e) => {
                    tracing::warn!(contract = %name, path = %path.display(), error = %e, "contract ABI not loaded");
                    registry.problems.insert(name, e.to_string());
                }
            }
        }
        registry
    }

    pub fn insert(&mut self, name: ContractName, abi: ContractAbi, address: [u8; 20]) {
        self.problems.remove(&name);
        self.entries.insert(name, DeployedContract { abi, address });
    }

    pub fn get(&self, name: ContractName) -> Result<&DeployedContract, ChainError> {
        self.entries.get(&name).ok_or_else(|| {
            let reason = self
                .problems
                .get(&name)
                .cloned()
                .unwrap_or_else(|| "contract not configured".to_string());
            ChainError::contract(name.as_str(), "*", reason)
        })
    }

    /// Resolve contract and function together.
    pub fn function(&self, name: ContractName, method: &str) -> Result<(&DeployedContract, &AbiFunction), ChainError> {
        let contract = self.get(name)?;
        let function = contract
            .abi
            .function(method)
            .map_err(|e| ChainError::contract(name.as_str(), method, e.to_string()))?;
        Ok((contract, function))
    }

    pub fn is_complete(&self) -> bool {
        ContractName::ALL.iter().all(|n| self.entries.contains_key(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkProfile;

    const ANCHOR_ABI: &str = r#"[
        {"type": "function", "name": "storeProof", "stateMutability": "nonpayable",
         "inputs": [{"name": "hash", "type": "bytes32"}], "outputs": []},
        {"type": "function", "name": "verifyProof", "stateMutability": "view",
         "inputs": [{"name": "hash", "type": "bytes32"}], "outputs": [{"name": "", "type": "bool"}]}
    ]"#;

    #[test]
    fn loads_available_contracts_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CredentialAnchor.json"), ANCHOR_ABI).unwrap();

        let mut config = ChainConfig::new("http://127.0.0.1:8545".parse().unwrap(), NetworkProfile::Ganache);
        config.abi_dir = dir.path().to_path_buf();
        config
            .addresses
            .insert(ContractName::CredentialAnchor, "0x00000000000000000000000000000000000000aa".into());
        config
            .addresses
            .insert(ContractName::RevocationRegistry, "0x00000000000000000000000000000000000000bb".into());

        let registry = ContractRegistry::load(&config);
        let (contract, f) = registry
            .function(ContractName::CredentialAnchor, methods::STORE_PROOF)
            .unwrap();
        assert_eq!(contract.address_hex(), "0x00000000000000000000000000000000000000aa");
        assert_eq!(f.signature().unwrap(), "storeProof(bytes32)");
        assert!(!registry.is_complete());

        let missing_addr = registry.get(ContractName::DidRegistry).unwrap_err();
        assert!(missing_addr.to_string().contains("DIDREGISTRY_ADDRESS"));
        let missing_abi = registry.get(ContractName::RevocationRegistry).unwrap_err();
        assert!(matches!(missing_abi, ChainError::Contract { .. }));
        assert!(matches!(
            registry.function(ContractName::CredentialAnchor, "burn"),
            Err(ChainError::Contract { .. })
        ));
    }
}
