//! # Admin Subcommands
//!
//! - `reconcile` — run both sweeps once.
//! - `worker` — run the sweeps on their schedule until interrupted.
//! - `show` — dump one ledger table.
//! - `reset`, `purge-verifications` — destructive, require `--yes`.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use serde_json::json;

use acred_ledger::LedgerStore;
use acred_tasks::{Reconciler, ScheduleConfig, Scheduler};

use crate::context::AppContext;
use crate::print_json;

#[derive(Args, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Settle pending transactions and push due trust updates, once.
    Reconcile,

    /// Run the reconciliation sweeps periodically until Ctrl-C.
    Worker {
        /// Seconds between pending-transaction sweeps.
        #[arg(long, default_value_t = 10)]
        monitor_secs: u64,

        /// Seconds between trust-update sweeps.
        #[arg(long, default_value_t = 300)]
        trust_secs: u64,

        /// Seconds between ledger saves.
        #[arg(long, default_value_t = 60)]
        save_secs: u64,
    },

    /// Print one ledger table as JSON.
    Show {
        #[arg(value_enum)]
        table: LedgerTable,
    },

    /// Delete transactions, registrations, verifications and tasks.
    /// Credentials are kept.
    Reset {
        #[arg(long)]
        yes: bool,
    },

    /// Delete every verification record.
    PurgeVerifications {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedgerTable {
    Transactions,
    Registrations,
    Credentials,
    Verifications,
    Tasks,
}

pub async fn run_admin(args: &AdminArgs, ctx: &AppContext) -> Result<u8> {
    match &args.command {
        AdminCommand::Reconcile => {
            let reconciler = Reconciler::new(ctx.service.clone());
            let transactions = reconciler.sweep_pending_transactions().await;
            let trust = reconciler.sweep_trust_updates().await;
            print_json(&json!({ "transactions": transactions, "trust": trust }))?;
            Ok(if transactions.errors + trust.errors == 0 { 0 } else { 1 })
        }

        AdminCommand::Worker {
            monitor_secs,
            trust_secs,
            save_secs,
        } => {
            run_worker(
                ctx,
                ScheduleConfig {
                    monitor_interval: Duration::from_secs(*monitor_secs),
                    trust_interval: Duration::from_secs(*trust_secs),
                },
                Duration::from_secs(*save_secs),
            )
            .await?;
            Ok(0)
        }

        AdminCommand::Show { table } => {
            let ledger = ctx.ledger.as_ref();
            match table {
                LedgerTable::Transactions => print_json(&ledger.list_transactions())?,
                LedgerTable::Registrations => print_json(&ledger.list_registrations())?,
                LedgerTable::Credentials => print_json(&ledger.snapshot().credentials)?,
                LedgerTable::Verifications => print_json(&ledger.list_verifications())?,
                LedgerTable::Tasks => print_json(&ledger.list_tasks())?,
            }
            Ok(0)
        }

        AdminCommand::Reset { yes } => {
            if !yes {
                bail!("reset deletes ledger history; pass --yes to confirm");
            }
            print_json(&ctx.ledger.reset())?;
            Ok(0)
        }

        AdminCommand::PurgeVerifications { yes } => {
            if !yes {
                bail!("pass --yes to delete all verification records");
            }
            let purged = ctx.ledger.purge_verifications();
            tracing::warn!(purged, "verification records purged");
            print_json(&json!({ "purged": purged }))?;
            Ok(0)
        }
    }
}

async fn run_worker(ctx: &AppContext, config: ScheduleConfig, save_every: Duration) -> Result<()> {
    let scheduler = Scheduler::new(Reconciler::new(ctx.service.clone()), config);
    scheduler.start();

    let mut save = tokio::time::interval(save_every);
    save.tick().await;
    loop {
        tokio::select! {
            _ = save.tick() => {
                if let Err(e) = ctx.save() {
                    tracing::error!("{e:#}");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!("failed to listen for Ctrl-C: {e}");
                }
                break;
            }
        }
    }

    scheduler.shutdown().await;
    Ok(())
}
