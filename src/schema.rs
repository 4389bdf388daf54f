//! Domain records for store monitoring.
//!
//! Timestamps are persisted as TEXT in the canonical
//! `YYYY-MM-DD HH:MM:SS.ffffff UTC` form. The format is zero-padded, so
//! lexicographic order equals chronological order and SQL `BETWEEN` range
//! queries over the raw column are sound.

use crate::errors::ReportError;
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Timezone used for stores without an explicit assignment.
pub const FALLBACK_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Whether a store was observed online or offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The store responded to the poll.
    Active,
    /// The store did not respond to the poll.
    Inactive,
}

impl Status {
    /// The lowercase form used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
        }
    }

    /// Parses the stored form.
    pub fn parse(raw: &str) -> Result<Self, ReportError> {
        match raw {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            other => Err(ReportError::UnknownStatus(other.to_owned())),
        }
    }
}

/// A single timestamped status sample for one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// When the poll happened, UTC.
    pub observed_at: DateTime<Utc>,
    /// The observed status.
    pub status: Status,
}

/// One open interval of a store's weekly schedule, local wall-clock time.
///
/// `day_of_week` runs 0 = Monday through 6 = Sunday. A store may carry any
/// number of rules per day (split shifts), and both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHourRule {
    /// Weekday the rule applies to, 0 = Monday.
    pub day_of_week: u8,
    /// Local opening time.
    pub start_time_local: NaiveTime,
    /// Local closing time, inclusive.
    pub end_time_local: NaiveTime,
}

impl BusinessHourRule {
    /// The synthetic schedule used for stores with no rules on file: open
    /// every day from `00:00:00` through `23:59:59`.
    pub fn always_open() -> Vec<BusinessHourRule> {
        (0..7)
            .map(|day| BusinessHourRule {
                day_of_week: day,
                start_time_local: NaiveTime::MIN,
                end_time_local: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
            })
            .collect()
    }
}

/// One line of the finished report.
///
/// The last-hour columns are minutes; the last-day and last-week columns are
/// hours derived by dividing the same minute accumulator by 60. The
/// asymmetry is inherited reference behavior and is preserved deliberately.
/// All six values are rounded to two decimals and are never negative;
/// uptime and downtime need not sum to the window length because gaps
/// before the first and after the last observation are attributed to
/// neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Store identifier.
    pub store_id: String,
    /// Uptime over the trailing hour, in minutes.
    pub uptime_last_hour: f64,
    /// Uptime over the trailing day, in hours.
    pub uptime_last_day: f64,
    /// Uptime over the trailing week, in hours.
    pub uptime_last_week: f64,
    /// Downtime over the trailing hour, in minutes.
    pub downtime_last_hour: f64,
    /// Downtime over the trailing day, in hours.
    pub downtime_last_day: f64,
    /// Downtime over the trailing week, in hours.
    pub downtime_last_week: f64,
}

/// Parses a stored observation timestamp.
///
/// Accepts the canonical form, plus variants without the fractional part or
/// the ` UTC` suffix.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ReportError> {
    let trimmed = raw.trim().trim_end_matches(" UTC");
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ReportError::MalformedTimestamp(raw.to_owned()))
}

/// Formats a timestamp into the canonical stored form.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string()
}

/// Parses a stored `HH:MM:SS` business-hour time of day.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ReportError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S")
        .map_err(|_| ReportError::MalformedTimeOfDay(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    #[test]
    fn timestamp_round_trips_through_canonical_form() {
        let parsed = assert_ok!(parse_timestamp("2023-01-25 18:13:22.479220 UTC"));
        assert_eq!(format_timestamp(parsed), "2023-01-25 18:13:22.479220 UTC");
    }

    #[test]
    fn timestamp_accepts_relaxed_forms() {
        assert_ok!(parse_timestamp("2023-01-25 18:13:22 UTC"));
        assert_ok!(parse_timestamp("2023-01-25 18:13:22.479220"));
        assert_ok!(parse_timestamp("2023-01-25 18:13:22"));
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        assert_err!(parse_timestamp("25/01/2023 18:13"));
        assert_err!(parse_timestamp(""));
    }

    #[test]
    fn status_parses_stored_forms_only() {
        assert_eq!(assert_ok!(Status::parse("active")), Status::Active);
        assert_eq!(assert_ok!(Status::parse("inactive")), Status::Inactive);
        assert_err!(Status::parse("Active"));
    }

    #[test]
    fn always_open_covers_every_weekday() {
        let rules = BusinessHourRule::always_open();
        assert_eq!(rules.len(), 7);
        let days: Vec<u8> = rules.iter().map(|r| r.day_of_week).collect();
        assert_eq!(days, vec![0, 1, 2, 3, 4, 5, 6]);
        for rule in &rules {
            assert_eq!(rule.start_time_local, NaiveTime::MIN);
            assert_eq!(rule.end_time_local.to_string(), "23:59:59");
        }
    }
}
