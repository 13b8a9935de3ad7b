//! Shared wiring for chain-facing subcommands: network selection, operator
//! key, ledger snapshot, task runner.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use zeroize::Zeroizing;

use acred_chain::{ChainClient, ChainConfig, InMemoryChain, NetworkProfile, RpcChainClient};
use acred_crypto::PrivateKey;
use acred_ledger::{BlockchainService, LedgerSnapshot, MemoryLedger};
use acred_tasks::{CredentialWorkflow, FallbackRunner, QueueConfig, QueuedRunner, RetryPolicy, TaskExecutor, WorkerPool};

/// Environment variable holding the operator's signing key (hex or base64).
pub const OPERATOR_KEY_ENV: &str = "ACRED_OPERATOR_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkArg {
    Ganache,
    Polygon,
    Besu,
    /// In-process chain; nothing leaves the machine.
    Memory,
}

impl NetworkArg {
    fn profile(self) -> Option<NetworkProfile> {
        match self {
            Self::Ganache => Some(NetworkProfile::Ganache),
            Self::Polygon => Some(NetworkProfile::Polygon),
            Self::Besu => Some(NetworkProfile::Besu),
            Self::Memory => None,
        }
    }
}

/// Options shared by every chain-facing subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Target network. Defaults to `ACRED_NETWORK`, then ganache.
    #[arg(long, global = true, value_enum)]
    pub network: Option<NetworkArg>,

    /// Chain configuration YAML. Environment variables are used otherwise.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON file holding the local ledger between runs.
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Seconds between retries of a failed chain write.
    #[arg(long, global = true, default_value_t = 30)]
    pub retry_delay_secs: u64,
}

pub struct AppContext {
    pub network: Option<NetworkProfile>,
    pub service: BlockchainService,
    pub ledger: Arc<MemoryLedger>,
    pub retry: RetryPolicy,
    ledger_path: Option<PathBuf>,
}

impl AppContext {
    pub fn build(opts: &GlobalOpts) -> Result<Self> {
        let memory = opts.network == Some(NetworkArg::Memory);
        let (chain, network): (Arc<dyn ChainClient>, Option<NetworkProfile>) = if memory {
            (Arc::new(InMemoryChain::new()), None)
        } else {
            let config = load_chain_config(opts)?;
            let network = config.network;
            let client = RpcChainClient::new(config).context("failed to build chain client")?;
            (Arc::new(client), Some(network))
        };

        let ledger = Arc::new(match &opts.ledger {
            Some(path) => load_ledger(path)?,
            None => MemoryLedger::new(),
        });
        let operator = operator_key(memory)?;
        tracing::debug!(operator = %operator.account_address_hex(), "operator account");

        Ok(Self {
            network,
            service: BlockchainService::new(chain, ledger.clone(), operator),
            ledger,
            retry: RetryPolicy {
                delay: Duration::from_secs(opts.retry_delay_secs),
                ..RetryPolicy::default()
            },
            ledger_path: opts.ledger.clone(),
        })
    }

    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor::new(self.service.clone(), self.retry)
    }

    /// Queued runner with direct fallback, plus the pool serving it.
    pub fn runner(&self) -> (FallbackRunner, WorkerPool) {
        let executor = self.executor();
        let (queued, pool) = QueuedRunner::start(executor.clone(), QueueConfig::default());
        (FallbackRunner::queued(queued, executor), pool)
    }

    /// Workflow backed by a fresh worker pool. Call [`finish()`] before
    /// exiting so queued tasks complete.
    pub fn workflow(&self) -> (CredentialWorkflow, WorkerPool) {
        let (runner, pool) = self.runner();
        (CredentialWorkflow::new(self.service.clone(), runner), pool)
    }

    /// Write the ledger snapshot back, if one was given.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.ledger_path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(&self.ledger.snapshot())?;
        std::fs::write(path, json).with_context(|| format!("failed to write ledger: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "ledger saved");
        Ok(())
    }
}

/// Drop the workflow and wait for queued tasks to finish.
pub async fn finish(workflow: CredentialWorkflow, pool: WorkerPool) {
    drop(workflow);
    pool.join().await;
}

fn load_chain_config(opts: &GlobalOpts) -> Result<ChainConfig> {
    let mut config = match &opts.config {
        Some(path) => ChainConfig::from_yaml_file(path)?,
        None => ChainConfig::from_env()?,
    };
    if let Some(profile) = opts.network.and_then(NetworkArg::profile) {
        config.network = profile;
        config.validate()?;
    }
    Ok(config)
}

pub fn load_ledger(path: &Path) -> Result<MemoryLedger> {
    if !path.exists() {
        return Ok(MemoryLedger::new());
    }
    let raw = std::fs::read(path).with_context(|| format!("failed to read ledger: {}", path.display()))?;
    let snapshot: LedgerSnapshot =
        serde_json::from_slice(&raw).with_context(|| format!("malformed ledger file: {}", path.display()))?;
    Ok(MemoryLedger::from_snapshot(snapshot))
}

fn operator_key(memory: bool) -> Result<PrivateKey> {
    match std::env::var(OPERATOR_KEY_ENV) {
        Ok(raw) => {
            let raw = Zeroizing::new(raw);
            PrivateKey::parse(raw.trim()).with_context(|| format!("{OPERATOR_KEY_ENV} is not a valid key"))
        }
        Err(_) if memory => {
            tracing::warn!("{OPERATOR_KEY_ENV} not set; using a throwaway operator key");
            Ok(PrivateKey::generate())
        }
        Err(_) => bail!("{OPERATOR_KEY_ENV} must be set for chain writes"),
    }
}

/// Read a private key (hex or base64) from a file.
pub fn read_private_key(path: &Path) -> Result<PrivateKey> {
    let raw = Zeroizing::new(
        std::fs::read_to_string(path).with_context(|| format!("failed to read key file: {}", path.display()))?,
    );
    PrivateKey::parse(raw.trim()).with_context(|| format!("invalid key in {}", path.display()))
}
