//! # acred CLI entry point
//!
//! Parses arguments, sets up logging, and dispatches to subcommand
//! handlers. Offline commands run synchronously; chain-facing commands get
//! a tokio runtime and an [`AppContext`], and save the ledger afterwards.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use acred_cli::admin::{run_admin, AdminArgs};
use acred_cli::context::{AppContext, GlobalOpts};
use acred_cli::keys::{
    run_hash, run_keygen, run_sign, run_verify_signature, HashArgs, KeygenArgs, SignArgs, VerifySignatureArgs,
};
use acred_cli::registry::{run_registry, RegistryArgs};
use acred_cli::verify::{run_verify, VerifyArgs};

/// AuthentiCred operator CLI.
///
/// Issues verifiable credentials, anchors and revokes them on an EVM
/// registry, and verifies them against chain and local state.
#[derive(Parser, Debug)]
#[command(name = "acred", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a secp256k1 key pair and a DID.
    Keygen(KeygenArgs),

    /// Sign a credential document.
    Sign(SignArgs),

    /// Print a credential's content hash.
    Hash(HashArgs),

    /// Check a credential's proof against a public key.
    VerifySignature(VerifySignatureArgs),

    /// DID registration, issuer trust, issuance, anchoring, revocation.
    Registry(RegistryArgs),

    /// Verify a credential by content hash or document.
    Verify(VerifyArgs),

    /// Reconciliation and ledger maintenance.
    Admin(AdminArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!("acred CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Sign(args) => run_sign(args),
        Commands::Hash(args) => run_hash(args),
        Commands::VerifySignature(args) => run_verify_signature(args),
        Commands::Registry(args) => run_online(&cli.global, Online::Registry(args)),
        Commands::Verify(args) => run_online(&cli.global, Online::Verify(args)),
        Commands::Admin(args) => run_online(&cli.global, Online::Admin(args)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Commands that need a chain connection and the ledger.
enum Online<'a> {
    Registry(&'a RegistryArgs),
    Verify(&'a VerifyArgs),
    Admin(&'a AdminArgs),
}

fn run_online(global: &GlobalOpts, command: Online<'_>) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        let ctx = AppContext::build(global)?;
        let result = match command {
            Online::Registry(args) => run_registry(args, &ctx).await,
            Online::Verify(args) => run_verify(args, &ctx).await,
            Online::Admin(args) => run_admin(args, &ctx).await,
        };
        // Keep whatever reached the ledger, even on failure.
        ctx.save()?;
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use acred_cli::admin::AdminCommand;
    use acred_cli::context::NetworkArg;
    use acred_cli::registry::RegistryCommand;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_keygen_defaults() {
        let cli = Cli::try_parse_from(["acred", "keygen"]).unwrap();
        if let Commands::Keygen(args) = cli.command {
            assert!(args.out.is_none());
            assert_eq!(args.name, "issuer");
        } else {
            panic!("expected keygen");
        }
    }

    #[test]
    fn cli_parse_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "acred",
            "verify",
            "--network",
            "memory",
            "--ledger",
            "ledger.json",
            "--requester",
            "acme-hr",
            "ab",
        ])
        .unwrap();
        assert_eq!(cli.global.network, Some(NetworkArg::Memory));
        assert_eq!(cli.global.ledger, Some(PathBuf::from("ledger.json")));
        assert_eq!(cli.global.retry_delay_secs, 30);
        if let Commands::Verify(args) = cli.command {
            assert_eq!(args.requester.as_deref(), Some("acme-hr"));
            assert_eq!(args.input.as_deref(), Some("ab"));
        } else {
            panic!("expected verify");
        }
    }

    #[test]
    fn cli_verify_requires_input() {
        assert!(Cli::try_parse_from(["acred", "verify"]).is_err());
        assert!(Cli::try_parse_from(["acred", "verify", "ab", "--document", "x.json"]).is_err());
    }

    #[test]
    fn cli_parse_register_did() {
        let cli = Cli::try_parse_from([
            "acred",
            "registry",
            "register-did",
            "did:authenticred:uni",
            "--public-key",
            "02ab",
            "--untrusted",
        ])
        .unwrap();
        let Commands::Registry(args) = cli.command else {
            panic!("expected registry");
        };
        match args.command {
            RegistryCommand::RegisterDid {
                did,
                public_key,
                untrusted,
            } => {
                assert_eq!(did, "did:authenticred:uni");
                assert_eq!(public_key, "02ab");
                assert!(untrusted);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cli_parse_worker_intervals() {
        let cli = Cli::try_parse_from(["acred", "-vv", "admin", "worker", "--monitor-secs", "5"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Admin(args) = cli.command else {
            panic!("expected admin");
        };
        match args.command {
            AdminCommand::Worker {
                monitor_secs,
                trust_secs,
                save_secs,
            } => {
                assert_eq!(monitor_secs, 5);
                assert_eq!(trust_secs, 300);
                assert_eq!(save_secs, 60);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cli_parse_unknown_network_fails() {
        assert!(Cli::try_parse_from(["acred", "--network", "mainnet", "admin", "reconcile"]).is_err());
    }
}
