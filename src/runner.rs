use crate::jobs::{JobTable, PollOutcome, REPORT_TIMEOUT};
use crate::report::build_report;
use crate::worker::Worker;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use sqlx::SqlitePool;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Everything one build invocation needs.
pub struct BuildContext {
    /// Handle to the observation store.
    pub pool: SqlitePool,
    /// Directory the artifact is published under.
    pub artifact_dir: PathBuf,
    /// The job the build belongs to; also keys the artifact.
    pub job_id: Uuid,
}

/// The function the worker runs per job. Defaults to
/// [`build_report`](crate::build_report); tests swap in instrumented
/// builds via [`Runner::build_with`].
pub type BuildFn =
    Arc<dyn Fn(BuildContext) -> BoxFuture<'static, anyhow::Result<PathBuf>> + Send + Sync>;

/// Configures and starts the report-generation machinery: the job table,
/// the bounded FIFO queue, and the single background worker.
pub struct Runner {
    pool: SqlitePool,
    artifact_dir: PathBuf,
    queue_depth: usize,
    timeout: Duration,
    build_fn: BuildFn,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("artifact_dir", &self.artifact_dir)
            .field("queue_depth", &self.queue_depth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Runner {
    /// Creates a runner over the given observation store, publishing
    /// artifacts under `artifact_dir`.
    pub fn new(pool: SqlitePool, artifact_dir: PathBuf) -> Self {
        Self {
            pool,
            artifact_dir,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            timeout: REPORT_TIMEOUT,
            build_fn: Arc::new(|ctx: BuildContext| {
                async move { Ok(build_report(&ctx.pool, &ctx.artifact_dir, ctx.job_id).await?) }
                    .boxed()
            }),
        }
    }

    /// Set how many submitted jobs may wait in the queue.
    pub fn queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Set the threshold after which polls report a running job as failed.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the build function. This is the seam tests use to interpose
    /// barriers and observe scheduling.
    pub fn build_with<F, Fut>(mut self, build_fn: F) -> Self
    where
        F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<PathBuf>> + Send + 'static,
    {
        self.build_fn = Arc::new(move |ctx| build_fn(ctx).boxed());
        self
    }

    /// Starts the background worker.
    ///
    /// Returns the cloneable [`ReportService`] handle for submitting and
    /// polling, and a [`RunHandle`] to await worker shutdown. The worker
    /// shuts down once every service handle has been dropped and the
    /// queue is drained.
    pub fn start(self) -> (ReportService, RunHandle) {
        if let Err(error) = std::fs::create_dir_all(&self.artifact_dir) {
            warn!(%error, dir = %self.artifact_dir.display(), "Could not create artifact directory");
        }

        let jobs = Arc::new(JobTable::new(self.timeout));
        let (queue_tx, queue_rx) = mpsc::channel(self.queue_depth);

        let worker = Worker {
            pool: self.pool,
            jobs: Arc::clone(&jobs),
            artifact_dir: self.artifact_dir,
            build_fn: self.build_fn,
            queue: queue_rx,
        };

        info!("Starting report worker…");
        let span = info_span!("worker");
        let handle = tokio::spawn(worker.run().instrument(span));

        (
            ReportService {
                jobs,
                queue: queue_tx,
            },
            RunHandle { handle },
        )
    }
}

/// Submit/poll handle shared by request handlers.
#[derive(Debug, Clone)]
pub struct ReportService {
    jobs: Arc<JobTable>,
    queue: mpsc::Sender<Uuid>,
}

impl ReportService {
    /// Allocates a job id, records it `Running`, and enqueues it for the
    /// worker. Returns immediately; the build happens in the background.
    ///
    /// If the bounded queue cannot accept the job it is failed on the
    /// spot rather than blocking the caller.
    pub fn submit(&self) -> Uuid {
        let job_id = Uuid::new_v4();
        self.jobs.insert_running(job_id);

        if let Err(error) = self.queue.try_send(job_id) {
            warn!(job.id = %job_id, %error, "Could not enqueue report job");
            self.jobs.fail(job_id, "job queue is full or shut down");
        }

        job_id
    }

    /// Looks up a job's lifecycle state, applying the lazy timeout check.
    pub fn poll(&self, job_id: Uuid) -> PollOutcome {
        self.jobs.poll(job_id)
    }
}

/// Handle to the running worker task.
#[derive(Debug)]
pub struct RunHandle {
    handle: JoinHandle<()>,
}

impl RunHandle {
    /// Wait for the worker to shut down.
    pub async fn wait_for_shutdown(self) {
        if let Err(error) = self.handle.await {
            warn!(%error, "Report worker task panicked");
        }
    }
}
