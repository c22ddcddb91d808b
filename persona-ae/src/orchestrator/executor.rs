//! Bounded job executor
//!
//! A fixed pool of worker tasks drains a bounded queue. Submission never
//! blocks: a full queue is reported to the caller synchronously instead of
//! silently dropping or buffering unboundedly. A task's only communication
//! back to the system is the job-store write performed by the runner.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::models::AnalysisJob;

use super::runner::JobRunner;

/// One unit of detached work
pub struct JobTask {
    pub job: AnalysisJob,
}

/// Handle to the worker pool
#[derive(Clone)]
pub struct JobExecutor {
    tx: mpsc::Sender<JobTask>,
}

impl JobExecutor {
    /// Spawn `workers` worker tasks draining a queue of `queue_capacity`
    pub fn start(runner: Arc<JobRunner>, queue_capacity: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<JobTask>(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..workers.max(1) {
            let rx = rx.clone();
            let runner = runner.clone();

            tokio::spawn(async move {
                tracing::debug!(worker_id, "Analysis worker started");
                loop {
                    // Lock only long enough to pop one task
                    let task = { rx.lock().await.recv().await };
                    match task {
                        Some(task) => {
                            let job_id = task.job.job_id;
                            tracing::debug!(worker_id, job_id = %job_id, "Worker picked up job");
                            runner.execute(task.job).await;
                        }
                        None => {
                            tracing::debug!(worker_id, "Analysis worker shutting down");
                            break;
                        }
                    }
                }
            });
        }

        Self { tx }
    }

    /// Submit a task without waiting
    ///
    /// Returns the task back on a full (or closed) queue.
    pub fn try_submit(&self, task: JobTask) -> Result<(), JobTask> {
        self.tx.try_send(task).map_err(|error| match error {
            mpsc::error::TrySendError::Full(task) => task,
            mpsc::error::TrySendError::Closed(task) => task,
        })
    }
}
