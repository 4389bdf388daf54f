use std::path::PathBuf;

/// Errors raised while computing or persisting a report.
///
/// All variants abort the affected job with a descriptive cause; none of
/// them may crash the worker loop or the service process.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A store's timezone assignment names a zone the IANA database does
    /// not know.
    #[error("store `{store_id}` has unknown timezone `{timezone}`")]
    UnknownTimezone {
        /// The store whose assignment is invalid.
        store_id: String,
        /// The unresolvable zone name.
        timezone: String,
    },

    /// A persisted observation timestamp could not be parsed.
    #[error("malformed observation timestamp `{0}`")]
    MalformedTimestamp(String),

    /// A persisted business-hour time-of-day could not be parsed.
    #[error("malformed business-hour time `{0}`")]
    MalformedTimeOfDay(String),

    /// A persisted business-hour weekday fell outside `0..=6`.
    #[error("business-hour day of week `{0}` out of range")]
    InvalidDayOfWeek(i64),

    /// A persisted status value was neither `active` nor `inactive`.
    #[error("unknown store status `{0}`")]
    UnknownStatus(String),

    /// The status table holds no observations, so there is no anchor for
    /// the report's frozen "now".
    #[error("no observations available to anchor the report window")]
    NoObservations,

    /// The underlying database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Writing the CSV artifact failed.
    #[error("failed to write report artifact {path}: {source}")]
    Artifact {
        /// Destination the artifact was being written to.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing a report row failed.
    #[error("failed to serialize report row: {0}")]
    Csv(#[from] csv::Error),
}
