//! # JSON-RPC Chain Client
//!
//! [`RpcChainClient`] talks to an EVM node over HTTP JSON-RPC. Reads use
//! `eth_call`; writes are signed locally (see [`crate::tx`]) and sent with
//! `eth_sendRawTransaction`.
//!
//! ## Nonce Ordering
//!
//! Nonce acquisition, signing and submission for one sending account run
//! under a per-account async mutex. The next nonce is the larger of the
//! node's `pending` count and the last nonce this process used plus one,
//! so concurrent writers from the same account never collide.
//!
//! ## Timeouts
//!
//! Every request carries the configured timeout (30 s by default);
//! [`ChainClient::connect()`] uses the shorter probe timeout (2 s).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::{Mutex, OnceCell};

use acred_crypto::PrivateKey;

use crate::abi::Token;
use crate::client::{ChainClient, NodeInfo, Receipt, TxHash};
use crate::config::{ChainConfig, ContractName, GasPricePolicy};
use crate::contracts::ContractRegistry;
use crate::error::ChainError;
use crate::tx::LegacyTransaction;

#[derive(Debug, Default)]
struct AccountNonce {
    next: Option<u64>,
}

/// JSON-RPC implementation of [`ChainClient`].
#[derive(Debug)]
pub struct RpcChainClient {
    http: reqwest::Client,
    probe: reqwest::Client,
    config: ChainConfig,
    contracts: ContractRegistry,
    chain_id: OnceCell<u64>,
    accounts: DashMap<String, Arc<Mutex<AccountNonce>>>,
    request_id: AtomicU64,
}

impl RpcChainClient {
    /// Build a client, loading contract ABIs from the configured directory.
    pub fn new(config: ChainConfig) -> Result<Self, ChainError> {
        let contracts = ContractRegistry::load(&config);
        Self::with_contracts(config, contracts)
    }

    /// Build a client with an explicit contract table.
    pub fn with_contracts(config: ChainConfig, contracts: ContractRegistry) -> Result<Self, ChainError> {
        let endpoint = config.rpc_url.to_string();
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ChainError::connection(&endpoint, format!("failed to build HTTP client: {e}")))?;
        let probe = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .connect_timeout(config.probe_timeout())
            .build()
            .map_err(|e| ChainError::connection(&endpoint, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            probe,
            config,
            contracts,
            chain_id: OnceCell::new(),
            accounts: DashMap::new(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn contracts(&self) -> &ContractRegistry {
        &self.contracts
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        self.rpc_call_with(&self.http, method, params).await
    }

    /// Send a JSON-RPC request and return the `result` member.
    async fn rpc_call_with(&self, client: &reqwest::Client, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });
        let endpoint = self.config.rpc_url.as_str();

        let resp = client
            .post(self.config.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::connection(endpoint, format!("{method} timed out"))
                } else {
                    ChainError::connection(endpoint, e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(ChainError::connection(endpoint, format!("HTTP {}", resp.status())));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ChainError::rpc(method, format!("invalid JSON response: {e}")))?;

        if let Some(error) = json.get("error") {
            let msg = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            return Err(ChainError::rpc(method, msg));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| ChainError::rpc(method, "response missing 'result' field"))
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        if !self.config.network.chain_id_from_node() {
            return self
                .config
                .chain_id
                .ok_or_else(|| ChainError::rpc("eth_chainId", "chain id not configured"));
        }
        self.chain_id
            .get_or_try_init(|| async {
                let v = self.rpc_call("eth_chainId", json!([])).await?;
                parse_quantity("eth_chainId", &v)
            })
            .await
            .copied()
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        match self.config.network.gas_price() {
            GasPricePolicy::Fixed(p) => Ok(p),
            GasPricePolicy::Node => {
                let v = self.rpc_call("eth_gasPrice", json!([])).await?;
                parse_quantity("eth_gasPrice", &v).map(u128::from)
            }
        }
    }

    fn account_lock(&self, account: &str) -> Arc<Mutex<AccountNonce>> {
        self.accounts.entry(account.to_string()).or_default().clone()
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn connect(&self) -> Result<NodeInfo, ChainError> {
        let chain_id = self.rpc_call_with(&self.probe, "eth_chainId", json!([])).await?;
        let block = self.rpc_call_with(&self.probe, "eth_blockNumber", json!([])).await?;
        let info = NodeInfo {
            chain_id: parse_quantity("eth_chainId", &chain_id)?,
            block_number: parse_quantity("eth_blockNumber", &block)?,
        };
        tracing::debug!(chain_id = info.chain_id, block = info.block_number, "chain node reachable");
        Ok(info)
    }

    async fn read_contract(&self, contract: ContractName, method: &str, args: &[Token]) -> Result<Vec<Token>, ChainError> {
        let (deployed, function) = self.contracts.function(contract, method)?;
        let data = function
            .encode_call(args)
            .map_err(|e| ChainError::contract(contract.as_str(), method, e.to_string()))?;
        let call = json!({
            "to": deployed.address_hex(),
            "data": format!("0x{}", hex::encode(data)),
        });
        let result = self
            .rpc_call("eth_call", json!([call, "latest"]))
            .await
            .map_err(|e| match e {
                ChainError::Rpc { message, .. } => ChainError::contract(contract.as_str(), method, message),
                other => other,
            })?;
        let bytes = parse_hex_data("eth_call", &result)?;
        function
            .decode_output(&bytes)
            .map_err(|e| ChainError::contract(contract.as_str(), method, e.to_string()))
    }

    async fn write_contract(
        &self,
        contract: ContractName,
        method: &str,
        args: &[Token],
        signer: &PrivateKey,
    ) -> Result<TxHash, ChainError> {
        let (deployed, function) = self.contracts.function(contract, method)?;
        let data = function
            .encode_call(args)
            .map_err(|e| ChainError::contract(contract.as_str(), method, e.to_string()))?;
        let chain_id = self.chain_id().await?;
        let gas_price = self.gas_price().await?;
        let sender = signer.account_address_hex();

        let lock = self.account_lock(&sender);
        let mut account = lock.lock().await;

        let pending = self
            .rpc_call("eth_getTransactionCount", json!([sender, "pending"]))
            .await?;
        let node_nonce = parse_quantity("eth_getTransactionCount", &pending)?;
        let nonce = account.next.map_or(node_nonce, |n| n.max(node_nonce));

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.config.gas_limit,
            to: deployed.address,
            value: 0,
            data,
            chain_id,
        };
        let signed = tx.sign(signer)?;

        match self
            .rpc_call("eth_sendRawTransaction", json!([signed.raw_hex()]))
            .await
        {
            Ok(result) => {
                account.next = Some(nonce + 1);
                let tx_hash = match result.as_str() {
                    Some(s) => {
                        TxHash::new(s).map_err(|e| ChainError::rpc("eth_sendRawTransaction", e.to_string()))?
                    }
                    None => TxHash::from_bytes(signed.hash),
                };
                tracing::info!(
                    contract = %contract,
                    method,
                    nonce,
                    tx_hash = %tx_hash,
                    "transaction submitted"
                );
                Ok(tx_hash)
            }
            Err(ChainError::Rpc { message, .. }) => {
                // The node rejected it; resync the nonce from the node next time.
                account.next = None;
                if message.to_ascii_lowercase().contains("revert") {
                    Err(ChainError::contract(contract.as_str(), method, message))
                } else {
                    Err(ChainError::rpc("eth_sendRawTransaction", message))
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, ChainError> {
        let receipt = self
            .rpc_call("eth_getTransactionReceipt", json!([tx_hash.as_str()]))
            .await?;
        if receipt.is_null() {
            return Ok(None);
        }
        let status = match receipt.get("status") {
            Some(v) if !v.is_null() => Some(parse_quantity("eth_getTransactionReceipt", v)? == 1),
            _ => None,
        };
        let block_number = match receipt.get("blockNumber") {
            Some(v) if !v.is_null() => Some(parse_quantity("eth_getTransactionReceipt", v)?),
            _ => None,
        };
        if block_number.is_none() {
            return Ok(None);
        }
        Ok(Some(Receipt {
            tx_hash: tx_hash.clone(),
            status,
            block_number,
        }))
    }
}

/// Parse a hex quantity such as `"0x1a"`.
fn parse_quantity(method: &str, v: &Value) -> Result<u64, ChainError> {
    let s = v
        .as_str()
        .ok_or_else(|| ChainError::rpc(method, format!("expected hex quantity, got {v}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| ChainError::rpc(method, format!("bad quantity {s:?}: {e}")))
}

fn parse_hex_data(method: &str, v: &Value) -> Result<Vec<u8>, ChainError> {
    let s = v
        .as_str()
        .ok_or_else(|| ChainError::rpc(method, format!("expected hex data, got {v}")))?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| ChainError::rpc(method, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("m", &json!("0x1a")).unwrap(), 26);
        assert_eq!(parse_quantity("m", &json!("0x")).unwrap(), 0);
        assert!(parse_quantity("m", &json!(26)).is_err());
        assert!(parse_quantity("m", &json!("0xzz")).is_err());
    }

    #[test]
    fn hex_data() {
        assert_eq!(parse_hex_data("m", &json!("0x0102")).unwrap(), vec![1, 2]);
        assert_eq!(parse_hex_data("m", &json!("0x")).unwrap(), Vec::<u8>::new());
    }
}
