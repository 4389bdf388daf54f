#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod errors;
mod estimator;
mod hours;
mod jobs;
mod report;
mod runner;
/// Domain record definitions.
pub mod schema;
/// HTTP surface for triggering and fetching reports.
pub mod server;
/// SQLite-backed observation store.
pub mod storage;
mod worker;

/// Error type for report computation.
pub use self::errors::ReportError;
/// Per-window uptime/downtime totals and the estimation entry point.
pub use self::estimator::{estimate, WindowTotals};
/// Business-hours membership check.
pub use self::hours::is_open;
/// Job lifecycle primitives.
pub use self::jobs::{JobTable, PollOutcome, REPORT_TIMEOUT};
/// Report builder.
pub use self::report::build_report;
/// The runner that wires storage, job table, and the background worker.
pub use self::runner::{BuildContext, ReportService, RunHandle, Runner};
