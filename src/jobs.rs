//! In-memory job lifecycle tracking.
//!
//! One [`JobTable`] is shared between the submit/poll path and the
//! background worker. The submit path creates entries and the worker
//! transitions the ones it owns; the only contended write is the race
//! between the worker marking a job `Complete` and a poller marking it
//! `Failed` on timeout, which first-writer-wins resolves: a terminal state
//! never changes again.
//!
//! Timeout detection is lazy. Nothing watches running jobs; a poll on a
//! job older than the threshold flips it to `Failed` right there. The
//! worker is not interrupted, and a late completion after an observed
//! timeout is discarded.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long a job may stay `Running` before polls report it as failed.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(900);

/// Cause string attached to jobs failed by the lazy timeout check.
pub(crate) const TIMEOUT_CAUSE: &str = "report generation timed out";

#[derive(Debug, Clone, PartialEq, Eq)]
enum JobState {
    Running,
    Complete(PathBuf),
    Failed(String),
}

#[derive(Debug)]
struct JobRecord {
    state: JobState,
    submitted_at: Instant,
}

/// What a poll observed about a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The identifier was never issued (or belonged to a previous process).
    NotFound,
    /// The build has not finished yet.
    Running,
    /// The build failed, with a human-readable cause.
    Failed(String),
    /// The build finished; the artifact lives at this path.
    Ready(PathBuf),
}

/// Concurrency-safe map from job id to lifecycle record.
///
/// Jobs live only in process memory; restarting the service forgets them.
#[derive(Debug)]
pub struct JobTable {
    jobs: Mutex<HashMap<Uuid, JobRecord>>,
    timeout: Duration,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new(REPORT_TIMEOUT)
    }
}

impl JobTable {
    /// Creates a table with the given timeout threshold. Production code
    /// uses [`REPORT_TIMEOUT`]; tests inject shorter thresholds.
    pub fn new(timeout: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, JobRecord>> {
        // The guarded section never panics, but recover anyway rather than
        // propagate poisoning into the request path.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a fresh job in the `Running` state.
    pub(crate) fn insert_running(&self, id: Uuid) {
        self.lock().insert(
            id,
            JobRecord {
                state: JobState::Running,
                submitted_at: Instant::now(),
            },
        );
    }

    /// Transitions a running job to `Complete`. No-op if the job is
    /// unknown or already terminal.
    pub(crate) fn complete(&self, id: Uuid, artifact: PathBuf) {
        let mut jobs = self.lock();
        if let Some(record) = jobs.get_mut(&id) {
            if record.state == JobState::Running {
                record.state = JobState::Complete(artifact);
            }
        }
    }

    /// Transitions a running job to `Failed`. No-op if the job is unknown
    /// or already terminal.
    pub(crate) fn fail(&self, id: Uuid, cause: impl Into<String>) {
        let mut jobs = self.lock();
        if let Some(record) = jobs.get_mut(&id) {
            if record.state == JobState::Running {
                record.state = JobState::Failed(cause.into());
            }
        }
    }

    /// Looks up a job, applying the lazy timeout transition first.
    pub fn poll(&self, id: Uuid) -> PollOutcome {
        let mut jobs = self.lock();
        let Some(record) = jobs.get_mut(&id) else {
            return PollOutcome::NotFound;
        };

        if record.state == JobState::Running
            && timed_out(record.submitted_at.elapsed(), self.timeout)
        {
            record.state = JobState::Failed(TIMEOUT_CAUSE.to_owned());
        }

        match &record.state {
            JobState::Running => PollOutcome::Running,
            JobState::Complete(path) => PollOutcome::Ready(path.clone()),
            JobState::Failed(cause) => PollOutcome::Failed(cause.clone()),
        }
    }
}

/// Pure timeout predicate, split out so the policy is testable without
/// waiting out the threshold.
fn timed_out(elapsed: Duration, threshold: Duration) -> bool {
    elapsed > threshold
}
