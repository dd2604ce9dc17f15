//! Background worker pool for scrape runs.
//!
//! Requests are pushed onto an unbounded `async-channel` queue and drained by
//! `num_workers` tasks. Each submission gets a fresh run id; the latest run id
//! per resume is tracked so a request that has been overtaken by a newer one
//! is dropped before it starts. Retryable failures are re-enqueued after a
//! fixed delay, up to `max_attempts` attempts in total.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::Config;
use crate::orchestrator::PlatformOutcome;
use crate::store::StoreError;
use crate::task::{ScrapeRequest, TaskContext, TaskError, run_scrape_attempt};

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub num_workers: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl QueueConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            num_workers: config.num_workers,
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Success {
        jobs_created: usize,
        keywords: Vec<String>,
        /// Per-platform results of the attempt that succeeded.
        outcomes: Vec<PlatformOutcome>,
    },
    NotFound,
    /// A newer run for the same resume took over.
    Superseded,
    Failed {
        message: String,
        attempts: u32,
    },
}

/// Sent to the optional report channel when a run reaches a final state.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub resume_id: i64,
    pub run_id: String,
    pub status: TaskStatus,
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("scrape queue is shut down")]
    Closed,
}

struct QueuedRun {
    request: ScrapeRequest,
    run_id: String,
    attempt: u32,
}

#[derive(Clone)]
struct WorkerShared {
    ctx: TaskContext,
    config: QueueConfig,
    latest: Arc<DashMap<i64, String>>,
    job_tx: async_channel::Sender<QueuedRun>,
    report_tx: Option<async_channel::Sender<TaskReport>>,
    cancel: CancellationToken,
}

/// A pool of workers running scrape attempts in the background.
pub struct ScrapeQueue {
    job_tx: async_channel::Sender<QueuedRun>,
    latest: Arc<DashMap<i64, String>>,
    ctx: TaskContext,
    pool_handle: JoinHandle<()>,
}

impl ScrapeQueue {
    /// Start `config.num_workers` workers (at least one).
    pub fn new(
        ctx: TaskContext,
        config: QueueConfig,
        cancel: CancellationToken,
        report_tx: Option<async_channel::Sender<TaskReport>>,
    ) -> Self {
        let (job_tx, job_rx) = async_channel::unbounded::<QueuedRun>();
        let latest = Arc::new(DashMap::new());

        let shared = WorkerShared {
            ctx: ctx.clone(),
            config,
            latest: Arc::clone(&latest),
            job_tx: job_tx.clone(),
            report_tx,
            cancel,
        };

        let num_workers = config.num_workers.max(1);
        let pool_handle = tokio::spawn(async move {
            let mut handles = Vec::with_capacity(num_workers);
            for worker_id in 0..num_workers {
                handles.push(tokio::spawn(worker_loop(
                    worker_id,
                    job_rx.clone(),
                    shared.clone(),
                )));
            }
            for handle in handles {
                let _ = handle.await;
            }
        });

        Self {
            job_tx,
            latest,
            ctx,
            pool_handle,
        }
    }

    /// Claim the resume for a new run and enqueue it. Returns the run id.
    ///
    /// Never waits on network I/O; the scrape itself happens on a worker.
    pub async fn submit(&self, request: ScrapeRequest) -> Result<String, QueueError> {
        if self.job_tx.is_closed() {
            return Err(QueueError::Closed);
        }
        let run_id = uuid::Uuid::new_v4().to_string();
        {
            // Held across the claim so the store and the map name the same run.
            let entry = self.latest.entry(request.resume_id);
            self.ctx.store.enqueue_run(request.resume_id, &run_id)?;
            entry.insert(run_id.clone());
        }
        tracing::info!(resume_id = request.resume_id, run_id = %run_id, "scrape queued");

        self.job_tx
            .send(QueuedRun {
                request,
                run_id: run_id.clone(),
                attempt: 1,
            })
            .await
            .map_err(|_| QueueError::Closed)?;
        Ok(run_id)
    }

    /// Close the queue and wait for the workers to drain it. Runs already
    /// queued still execute; retries waiting out their delay are abandoned.
    ///
    /// Cancelling the token passed to [`ScrapeQueue::new`] first makes the
    /// workers stop at once, dropping queued runs and interrupting the ones
    /// in flight. An interrupted resume keeps its `processing` status.
    pub async fn shutdown(self) {
        self.job_tx.close();
        let _ = self.pool_handle.await;
    }
}

async fn worker_loop(
    worker_id: usize,
    job_rx: async_channel::Receiver<QueuedRun>,
    shared: WorkerShared,
) {
    while let Ok(run) = job_rx.recv().await {
        if shared.cancel.is_cancelled() {
            break;
        }

        let resume_id = run.request.resume_id;
        let is_latest = shared
            .latest
            .get(&resume_id)
            .is_some_and(|latest| *latest == run.run_id);
        if !is_latest {
            tracing::debug!(worker_id, resume_id, run_id = %run.run_id, "dropping superseded run");
            report(&shared, &run, TaskStatus::Superseded).await;
            continue;
        }

        tracing::debug!(worker_id, resume_id, run_id = %run.run_id, attempt = run.attempt, "attempt started");
        let result = tokio::select! {
            result = run_scrape_attempt(&shared.ctx, &run.request, &run.run_id) => result,
            _ = shared.cancel.cancelled() => {
                tracing::info!(worker_id, resume_id, run_id = %run.run_id, "run interrupted");
                break;
            }
        };
        match result {
            Ok(outcome) => {
                let status = TaskStatus::Success {
                    jobs_created: outcome.jobs_created,
                    keywords: outcome.report.keywords.to_query_terms(),
                    outcomes: outcome.report.outcomes,
                };
                report(&shared, &run, status).await;
            }
            Err(e) => handle_failure(&shared, run, e).await,
        }
    }
    tracing::debug!(worker_id, "worker stopped");
}

async fn handle_failure(shared: &WorkerShared, run: QueuedRun, error: TaskError) {
    let resume_id = run.request.resume_id;

    let status = match &error {
        TaskError::Store(StoreError::NotFound(_)) => Some(TaskStatus::NotFound),
        TaskError::Store(StoreError::Superseded { .. }) => Some(TaskStatus::Superseded),
        e if e.is_retryable() && run.attempt < shared.config.max_attempts => None,
        e => Some(TaskStatus::Failed {
            message: e.to_string(),
            attempts: run.attempt,
        }),
    };

    if let Some(status) = status {
        tracing::warn!(resume_id, run_id = %run.run_id, attempt = run.attempt, error = %error, "scrape run ended");
        report(shared, &run, status).await;
        return;
    }

    tracing::warn!(
        resume_id,
        run_id = %run.run_id,
        attempt = run.attempt,
        retry_in = ?shared.config.retry_delay,
        error = %error,
        "scrape attempt failed, will retry"
    );

    let next = QueuedRun {
        attempt: run.attempt + 1,
        ..run
    };
    let job_tx = shared.job_tx.clone();
    let cancel = shared.cancel.clone();
    let delay = shared.config.retry_delay;
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                let _ = job_tx.send(next).await;
            }
        }
    });
}

async fn report(shared: &WorkerShared, run: &QueuedRun, status: TaskStatus) {
    if let Some(tx) = &shared.report_tx {
        let _ = tx
            .send(TaskReport {
                resume_id: run.request.resume_id,
                run_id: run.run_id.clone(),
                status,
            })
            .await;
    }
}
