//! # acred-tasks — Reliable Chain Writes
//!
//! Chain writes (DID registration, anchoring, revocation) run as
//! [`ChainTask`]s:
//!
//! - [`RetryPolicy`]: at most 3 attempts, 30 s apart. After the last one
//!   the task record (and a DID registration) is marked FAILED and
//!   [`TaskExhaustedError`] is returned.
//! - [`FallbackRunner`]: dispatches to the [`QueuedRunner`] worker pool and
//!   falls back to [`DirectRunner`] when the queue refuses the task.
//! - [`Reconciler`]: moves PENDING transactions to CONFIRMED/FAILED from
//!   receipts, and pushes issuer trust flags once registrations confirm.
//! - [`Scheduler`]: runs both sweeps on fixed intervals; started
//!   explicitly, once.
//! - [`CredentialWorkflow`]: issue, revoke and issuer registration on top
//!   of the runner.

pub mod error;
pub mod executor;
pub mod reconcile;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod task;
pub mod workflow;

pub use error::{TaskError, TaskExhaustedError};
pub use executor::TaskExecutor;
pub use reconcile::{Reconciler, SweepReport, TrustSweepReport};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use runner::{DirectRunner, FallbackRunner, QueueConfig, QueuedRunner, Submission, TaskRunner, WorkerPool};
pub use scheduler::{ScheduleConfig, Scheduler};
pub use task::ChainTask;
pub use workflow::{BulkRegistration, CredentialWorkflow, Issuance};
