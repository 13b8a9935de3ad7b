//! # Registry Subcommands
//!
//! Issuer-side chain operations. Writes go through the task runner, so a
//! failing node is retried before the command reports failure. Each write
//! leaves a PENDING transaction in the ledger; `acred admin reconcile`
//! settles it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Deserialize;
use serde_json::{Map, Value};

use acred_core::{ContentHash, CredentialId, Did, Timestamp};
use acred_crypto::PublicKey;
use acred_ledger::{LedgerStore, TaskStatus};
use acred_tasks::{ChainTask, Submission};
use acred_vc::{CredentialDocument, CredentialRecord, CredentialSchema};

use crate::context::{finish, read_private_key, AppContext};
use crate::keys::read_document;
use crate::print_json;

#[derive(Args, Debug)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistryCommand,
}

#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// Probe the node: chain id and latest block.
    Status,

    /// Register an issuer DID and its public key.
    RegisterDid {
        did: String,

        /// Compressed secp256k1 public key, hex or base64.
        #[arg(long)]
        public_key: String,

        /// Record the issuer without trusting it.
        #[arg(long)]
        untrusted: bool,
    },

    /// Register every issuer listed in a YAML or JSON file.
    RegisterDids { file: PathBuf },

    /// Set an issuer's trust flag on-chain.
    ApproveIssuer {
        did: String,

        /// Clear the flag instead of setting it.
        #[arg(long)]
        distrust: bool,
    },

    /// Anchor a content hash, or the hash of a credential document.
    Anchor {
        #[arg(required_unless_present = "document", conflicts_with = "document")]
        hash: Option<String>,

        #[arg(long)]
        document: Option<PathBuf>,
    },

    /// Build, sign and issue a credential, then anchor it.
    Issue {
        /// JSON request: `credential_type`, `holder`, `claims`, optional
        /// `expiration_date`.
        #[arg(long)]
        request: PathBuf,

        /// Issuer DID.
        #[arg(long)]
        issuer: String,

        /// Issuer private key file.
        #[arg(long)]
        key_file: PathBuf,

        /// Claim schema (YAML) the claims must satisfy.
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Write the signed credential here.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Revoke a credential.
    Revoke {
        credential_id: String,

        #[arg(long, default_value = "revoked by issuer")]
        reason: String,
    },
}

/// One entry of a bulk registration file.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuerEntry {
    pub did: Did,
    pub public_key: PublicKey,
    #[serde(default = "default_trusted")]
    pub trusted: bool,
}

fn default_trusted() -> bool {
    true
}

/// Issuance request body.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub credential_type: String,
    pub holder: Did,
    #[serde(default)]
    pub claims: Map<String, Value>,
    #[serde(default)]
    pub expiration_date: Option<Timestamp>,
}

pub async fn run_registry(args: &RegistryArgs, ctx: &AppContext) -> Result<u8> {
    match &args.command {
        RegistryCommand::Status => {
            let info = ctx.service.status().await.context("node unreachable")?;
            print_json(&serde_json::json!({
                "network": ctx.network.map(|n| n.as_str()).unwrap_or("memory"),
                "chain_id": info.chain_id,
                "block_number": info.block_number,
                "operator": ctx.service.operator_address(),
            }))?;
            Ok(0)
        }

        RegistryCommand::RegisterDid {
            did,
            public_key,
            untrusted,
        } => {
            let did = Did::new(did.as_str())?;
            let public_key = PublicKey::parse(public_key).context("invalid public key")?;
            let (workflow, pool) = ctx.workflow();
            let submission = workflow.register_issuer(&did, &public_key, !untrusted).await;
            finish(workflow, pool).await;
            let submission = submission?;
            print_json(&submission)?;
            Ok(task_exit_code(ctx, &submission))
        }

        RegistryCommand::RegisterDids { file } => {
            let entries = read_issuer_entries(file)?;
            let issuers: Vec<_> = entries
                .into_iter()
                .map(|e| (e.did, e.public_key, e.trusted))
                .collect();
            let (workflow, pool) = ctx.workflow();
            let report = workflow.register_issuers(&issuers).await;
            finish(workflow, pool).await;
            print_json(&report)?;
            Ok(if report.failed.is_empty() { 0 } else { 1 })
        }

        RegistryCommand::ApproveIssuer { did, distrust } => {
            let did = Did::new(did.as_str())?;
            let (workflow, pool) = ctx.workflow();
            let result = workflow.approve_issuer(&did, !distrust).await;
            finish(workflow, pool).await;
            println!("{}", result?);
            Ok(0)
        }

        RegistryCommand::Anchor { hash, document } => {
            let hash = match (hash, document) {
                (Some(hex), _) => ContentHash::from_hex(hex.trim()).context("invalid content hash")?,
                (None, Some(path)) => read_document(path)?.content_hash()?,
                (None, None) => bail!("a hash or --document is required"),
            };
            let credential_id = ctx.ledger.find_credential_by_hash(&hash).map(|r| r.id);
            let (runner, pool) = ctx.runner();
            let submission = runner
                .submit(ChainTask::AnchorCredential { credential_id, hash })
                .await;
            drop(runner);
            pool.join().await;
            let submission = submission?;
            print_json(&submission)?;
            Ok(task_exit_code(ctx, &submission))
        }

        RegistryCommand::Issue {
            request,
            issuer,
            key_file,
            schema,
            out,
        } => {
            let request = read_issue_request(request)?;
            let issuer = Did::new(issuer.as_str())?;
            let key = read_private_key(key_file)?;
            let claims = match schema {
                Some(path) => read_schema(path)?
                    .validate(&request.claims)
                    .context("claims do not match the schema")?,
                None => request.claims,
            };

            let id = CredentialId::generate();
            let document = CredentialDocument::new(
                id.as_str(),
                request.credential_type,
                issuer,
                &request.holder,
                claims,
                Timestamp::now(),
                request.expiration_date,
            )?;
            let record = CredentialRecord::draft(id, document)?;

            let (workflow, pool) = ctx.workflow();
            let issued = async {
                let id = workflow.store_draft(record)?;
                workflow.issue(&id, &key).await
            }
            .await;
            finish(workflow, pool).await;
            let issued = issued?;

            if let Some(path) = out {
                if let Some(record) = ctx.ledger.get_credential(&issued.credential_id) {
                    std::fs::write(path, serde_json::to_vec_pretty(&record.document().to_value()?)?)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                }
            }
            print_json(&issued)?;
            Ok(task_exit_code(ctx, &issued.submission))
        }

        RegistryCommand::Revoke { credential_id, reason } => {
            let id = CredentialId::new(credential_id.as_str())?;
            let submission = if ctx.ledger.get_credential(&id).is_some() {
                let (workflow, pool) = ctx.workflow();
                let result = workflow.revoke(&id, reason).await;
                finish(workflow, pool).await;
                result?
            } else {
                tracing::info!(credential_id = %id, "no local record, revoking on-chain only");
                let (runner, pool) = ctx.runner();
                let result = runner
                    .submit(ChainTask::RevokeCredential { credential_id: id })
                    .await;
                drop(runner);
                pool.join().await;
                result?
            };
            print_json(&submission)?;
            Ok(task_exit_code(ctx, &submission))
        }
    }
}

/// Exit code 1 if the submitted task ended FAILED.
fn task_exit_code(ctx: &AppContext, submission: &Submission) -> u8 {
    match ctx.ledger.get_task(&submission.handle) {
        Some(task) if task.status == TaskStatus::Failed => {
            tracing::error!(
                task_id = %task.id,
                kind = %task.kind,
                attempts = task.attempts,
                error = task.last_error.as_deref().unwrap_or("unknown"),
                "task failed"
            );
            1
        }
        _ => 0,
    }
}

fn read_issuer_entries(path: &Path) -> Result<Vec<IssuerEntry>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    // YAML is a superset of JSON.
    serde_yaml::from_str(&raw).with_context(|| format!("malformed issuer list: {}", path.display()))
}

fn read_issue_request(path: &Path) -> Result<IssueRequest> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("malformed issuance request: {}", path.display()))
}

fn read_schema(path: &Path) -> Result<CredentialSchema> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("malformed schema: {}", path.display()))
}
