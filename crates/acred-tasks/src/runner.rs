//! # Task Runners
//!
//! [`TaskRunner`] has two backends:
//!
//! - [`QueuedRunner`] hands tasks to a pool of tokio workers over a bounded
//!   channel and returns at once.
//! - [`DirectRunner`] runs the task in the caller's own task and returns
//!   when it has finished (or exhausted its retries).
//!
//! [`FallbackRunner`] creates the [`TaskRecord`], tries the queued backend,
//! and runs the task directly only when dispatch itself fails (queue full
//! or no workers). A task that ran and failed is never re-run directly.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use acred_chain::TxHash;
use acred_ledger::{ExecutionMode, LedgerStore, TaskRecord};

use crate::error::TaskError;
use crate::executor::TaskExecutor;
use crate::task::ChainTask;

/// What a caller gets back from dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub accepted: bool,
    pub mode: ExecutionMode,
    /// Task record id.
    pub handle: Uuid,
    /// Known only for direct execution.
    pub tx_hash: Option<TxHash>,
}

#[async_trait]
pub trait TaskRunner: Send + Sync {
    fn mode(&self) -> ExecutionMode;

    /// Run or enqueue `task` under the existing task record `task_id`.
    async fn dispatch(&self, task_id: Uuid, task: ChainTask) -> Result<Submission, TaskError>;
}

// -- Queued -------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub workers: usize,
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            capacity: 256,
        }
    }
}

#[derive(Debug)]
struct Job {
    id: Uuid,
    task: ChainTask,
}

#[derive(Debug, Clone)]
pub struct QueuedRunner {
    sender: mpsc::Sender<Job>,
}

/// Handles of the worker tasks behind a [`QueuedRunner`].
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl QueuedRunner {
    /// Spawn `config.workers` workers. Must be called inside a tokio runtime.
    pub fn start(executor: TaskExecutor, config: QueueConfig) -> (Self, WorkerPool) {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..config.workers.max(1))
            .map(|n| tokio::spawn(worker(n, Arc::clone(&receiver), executor.clone())))
            .collect();
        tracing::info!(workers = config.workers, capacity = config.capacity, "task workers started");
        (Self { sender }, WorkerPool { handles })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

async fn worker(n: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>, executor: TaskExecutor) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else { break };
        if let Err(e) = executor.execute(job.id, &job.task, ExecutionMode::Queued).await {
            tracing::error!(worker = n, task_id = %job.id, error = %e, "queued task failed");
        }
    }
    tracing::debug!(worker = n, "task worker stopped");
}

impl WorkerPool {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for the workers to drain the queue. Returns once every
    /// [`QueuedRunner`] clone has been dropped and the queue is empty.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    /// Stop the workers now. Queued jobs are dropped; their task records
    /// stay QUEUED.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl TaskRunner for QueuedRunner {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Queued
    }

    async fn dispatch(&self, task_id: Uuid, task: ChainTask) -> Result<Submission, TaskError> {
        self.sender.try_send(Job { id: task_id, task }).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TaskError::Dispatch("task queue is full".into()),
            mpsc::error::TrySendError::Closed(_) => TaskError::Dispatch("no task workers are running".into()),
        })?;
        Ok(Submission {
            accepted: true,
            mode: ExecutionMode::Queued,
            handle: task_id,
            tx_hash: None,
        })
    }
}

// -- Direct -------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DirectRunner {
    executor: TaskExecutor,
}

impl DirectRunner {
    pub fn new(executor: TaskExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl TaskRunner for DirectRunner {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Direct
    }

    async fn dispatch(&self, task_id: Uuid, task: ChainTask) -> Result<Submission, TaskError> {
        let tx_hash = self.executor.execute(task_id, &task, ExecutionMode::Direct).await?;
        Ok(Submission {
            accepted: true,
            mode: ExecutionMode::Direct,
            handle: task_id,
            tx_hash: Some(tx_hash),
        })
    }
}

// -- Fallback -----------------------------------------------------------------

/// Queue first, run directly if the queue will not take the task.
#[derive(Clone)]
pub struct FallbackRunner {
    primary: Option<Arc<dyn TaskRunner>>,
    fallback: Arc<dyn TaskRunner>,
    ledger: Arc<dyn LedgerStore>,
}

impl std::fmt::Debug for FallbackRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackRunner")
            .field("primary", &self.primary.as_ref().map(|r| r.mode()))
            .field("fallback", &self.fallback.mode())
            .finish()
    }
}

impl FallbackRunner {
    pub fn new(primary: Arc<dyn TaskRunner>, fallback: Arc<dyn TaskRunner>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            primary: Some(primary),
            fallback,
            ledger,
        }
    }

    /// Queued workers in front of direct execution.
    pub fn queued(queued: QueuedRunner, executor: TaskExecutor) -> Self {
        let ledger = Arc::clone(executor.service().ledger());
        Self::new(Arc::new(queued), Arc::new(DirectRunner::new(executor)), ledger)
    }

    /// Direct execution only.
    pub fn direct(executor: TaskExecutor) -> Self {
        let ledger = Arc::clone(executor.service().ledger());
        Self {
            primary: None,
            fallback: Arc::new(DirectRunner::new(executor)),
            ledger,
        }
    }

    /// Record and dispatch `task`, reporting which mode was used.
    pub async fn submit(&self, task: ChainTask) -> Result<Submission, TaskError> {
        let record = TaskRecord::queued(task.kind(), task.arguments());
        let task_id = record.id;
        self.ledger.insert_task(record);

        if let Some(primary) = &self.primary {
            match primary.dispatch(task_id, task.clone()).await {
                Ok(submission) => return Ok(submission),
                Err(e) if e.is_dispatch() => {
                    tracing::warn!(
                        task_id = %task_id,
                        kind = %task.kind(),
                        error = %e,
                        "task queue unavailable, running directly"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        self.fallback.dispatch(task_id, task).await
    }
}
