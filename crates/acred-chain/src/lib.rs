//! # acred-chain — Registry Chain Client
//!
//! Access to the four registry contracts (DID registry, trust registry,
//! credential anchor, revocation registry) through the [`ChainClient`]
//! trait.
//!
//! - [`RpcChainClient`]: JSON-RPC over HTTP. One implementation serves all
//!   [`NetworkProfile`]s; profiles differ only in chain-id source and gas
//!   price. Transactions are signed locally with the operator key.
//! - [`InMemoryChain`]: deterministic in-process chain with fault injection.
//!
//! ## Errors
//!
//! [`ChainError::Connection`] is the only transient class. Contract and
//! RPC errors are definite answers and are not worth retrying.

pub mod abi;
pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod memory;
pub mod rpc;
pub mod tx;

pub use abi::{AbiError, ContractAbi, Token};
pub use client::{ChainClient, NodeInfo, Receipt, TxHash};
pub use config::{ChainConfig, ConfigError, ContractName, NetworkProfile};
pub use contracts::{methods, ContractRegistry};
pub use error::ChainError;
pub use memory::InMemoryChain;
pub use rpc::RpcChainClient;
