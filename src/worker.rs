use crate::jobs::JobTable;
use crate::runner::{BuildContext, BuildFn};
use anyhow::anyhow;
use futures_util::FutureExt;
use sqlx::SqlitePool;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// The single background worker.
///
/// Exactly one of these exists per runner, so at most one report build is
/// in flight at any time. That bound is a documented design constraint
/// (the observation store is shared and uncoordinated), not an accident of
/// task count; adding workers requires redesigning the contention policy.
pub(crate) struct Worker {
    pub(crate) pool: SqlitePool,
    pub(crate) jobs: Arc<JobTable>,
    pub(crate) artifact_dir: PathBuf,
    pub(crate) build_fn: BuildFn,
    pub(crate) queue: mpsc::Receiver<Uuid>,
}

impl Worker {
    /// Drains queued jobs FIFO, one at a time, each to completion before
    /// the next is picked up. Exits when every submit handle is gone and
    /// the queue is empty.
    pub(crate) async fn run(mut self) {
        while let Some(job_id) = self.queue.recv().await {
            self.run_job(job_id).await;
        }
        debug!("Job queue closed. Shutting down the worker…");
    }

    /// Runs one build. Errors and panics alike become a `Failed` state on
    /// the job table; nothing propagates out of the worker loop.
    async fn run_job(&self, job_id: Uuid) {
        let span = info_span!("job", job.id = %job_id);
        span.in_scope(|| debug!("Running job…"));
        let started = Instant::now();

        let context = BuildContext {
            pool: self.pool.clone(),
            artifact_dir: self.artifact_dir.clone(),
            job_id,
        };

        let result = AssertUnwindSafe((self.build_fn)(context))
            .catch_unwind()
            .instrument(span.clone())
            .await
            .map_err(|panic| extract_panic_message(&*panic))
            .and_then(std::convert::identity);

        let _enter = span.enter();
        match result {
            Ok(artifact) => {
                self.jobs.complete(job_id, artifact);
                debug!(duration = ?started.elapsed(), "Job completed");
            }
            Err(error) => {
                warn!(%error, duration = ?started.elapsed(), "Failed to run job");
                self.jobs.fail(job_id, error.to_string());
            }
        }
    }
}

/// Turns an unwind payload into a displayable error.
fn extract_panic_message(panic: &(dyn std::any::Any + Send)) -> anyhow::Error {
    if let Some(message) = panic.downcast_ref::<&str>() {
        anyhow!("job panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        anyhow!("job panicked: {message}")
    } else {
        anyhow!("job panicked")
    }
}
