use thiserror::Error;

use acred_ledger::{BlockchainError, StoreError, TaskKind};
use acred_vc::StatusTransitionError;

/// A task gave up after its last allowed attempt.
#[derive(Error, Debug)]
#[error("{kind} for {subject} failed after {attempts} attempts")]
pub struct TaskExhaustedError {
    pub kind: TaskKind,
    pub subject: String,
    pub attempts: u32,
    #[source]
    pub last_error: BlockchainError,
}

#[derive(Error, Debug)]
pub enum TaskError {
    /// The queueing substrate refused the task. The task itself never ran.
    #[error("task dispatch failed: {0}")]
    Dispatch(String),

    #[error(transparent)]
    Exhausted(#[from] TaskExhaustedError),

    /// A chain call made outside the retry path.
    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Credential(#[from] StatusTransitionError),
}

impl TaskError {
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}
