//! Report assembly and CSV artifact publication.
//!
//! "Now" for the whole report is frozen at the maximum observation
//! timestamp at build start, so a report is reproducible against a static
//! data snapshot regardless of when the job actually runs.

use crate::errors::ReportError;
use crate::estimator::estimate;
use crate::schema::{BusinessHourRule, ReportRow, FALLBACK_TIMEZONE};
use crate::storage;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Builds the full report and publishes it as `{job_id}.csv` under
/// `artifact_dir`, returning the artifact path.
///
/// The artifact is written to a temp file and renamed into place, so it
/// becomes visible atomically and only on full success.
pub async fn build_report(
    pool: &SqlitePool,
    artifact_dir: &Path,
    job_id: Uuid,
) -> Result<PathBuf, ReportError> {
    let started = Instant::now();

    let now = storage::latest_observed_at(pool)
        .await?
        .ok_or(ReportError::NoObservations)?;
    let store_ids = storage::list_store_ids(pool).await?;
    info!(store.count = store_ids.len(), %now, "Building report…");

    let mut rows = Vec::with_capacity(store_ids.len());
    for (i, store_id) in store_ids.iter().enumerate() {
        if i % 100 == 0 {
            debug!(progress = i, total = store_ids.len(), "Processing stores…");
        }
        rows.push(build_row(pool, store_id, now).await?);
    }

    let path = write_artifact(artifact_dir, job_id, &rows)?;
    info!(
        rows = rows.len(),
        duration = ?started.elapsed(),
        "Report generation complete"
    );
    Ok(path)
}

/// Computes the three windows for one store.
async fn build_row(
    pool: &SqlitePool,
    store_id: &str,
    now: DateTime<Utc>,
) -> Result<ReportRow, ReportError> {
    let tz = match storage::timezone_for(pool, store_id).await? {
        Some(name) => name.parse::<Tz>().map_err(|_| ReportError::UnknownTimezone {
            store_id: store_id.to_owned(),
            timezone: name,
        })?,
        None => FALLBACK_TIMEZONE,
    };

    let mut rules = storage::business_hours_for(pool, store_id).await?;
    if rules.is_empty() {
        rules = BusinessHourRule::always_open();
    }

    // Window starts are derived from the store-local "now" and converted
    // back to UTC for the range query.
    let local_now = now.with_timezone(&tz);
    let hour_start = (local_now - Duration::hours(1)).with_timezone(&Utc);
    let day_start = (local_now - Duration::days(1)).with_timezone(&Utc);
    let week_start = (local_now - Duration::weeks(1)).with_timezone(&Utc);

    // One week-wide fetch; each window independently re-filters.
    let observations = storage::observations_for(pool, store_id, week_start, now).await?;

    let hour = estimate(&observations, &rules, tz, hour_start, now);
    let day = estimate(&observations, &rules, tz, day_start, now);
    let week = estimate(&observations, &rules, tz, week_start, now);

    // Last-hour stays in minutes; day/week divide the minute accumulator
    // by 60. Inherited unit asymmetry, kept as-is (see DESIGN.md).
    Ok(ReportRow {
        store_id: store_id.to_owned(),
        uptime_last_hour: round2(hour.uptime_minutes),
        uptime_last_day: round2(day.uptime_minutes / 60.0),
        uptime_last_week: round2(week.uptime_minutes / 60.0),
        downtime_last_hour: round2(hour.downtime_minutes),
        downtime_last_day: round2(day.downtime_minutes / 60.0),
        downtime_last_week: round2(week.downtime_minutes / 60.0),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn write_artifact(dir: &Path, job_id: Uuid, rows: &[ReportRow]) -> Result<PathBuf, ReportError> {
    let final_path = dir.join(format!("{job_id}.csv"));
    let tmp_path = dir.join(format!("{job_id}.csv.tmp"));

    let mut writer = csv::Writer::from_path(&tmp_path)?;
    writer.write_record([
        "store_id",
        "uptime_last_hour",
        "uptime_last_day",
        "uptime_last_week",
        "downtime_last_hour",
        "downtime_last_day",
        "downtime_last_week",
    ])?;
    for row in rows {
        writer.write_record([
            row.store_id.clone(),
            format!("{:.2}", row.uptime_last_hour),
            format!("{:.2}", row.uptime_last_day),
            format!("{:.2}", row.uptime_last_week),
            format!("{:.2}", row.downtime_last_hour),
            format!("{:.2}", row.downtime_last_day),
            format!("{:.2}", row.downtime_last_week),
        ])?;
    }
    writer.flush().map_err(|source| ReportError::Artifact {
        path: tmp_path.clone(),
        source,
    })?;
    drop(writer);

    std::fs::rename(&tmp_path, &final_path).map_err(|source| ReportError::Artifact {
        path: final_path.clone(),
        source,
    })?;

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_away_from_zero_at_two_decimals() {
        assert_eq!(round2(30.0), 30.0);
        assert_eq!(round2(0.005), 0.01);
        assert_eq!(round2(1.2345), 1.23);
        assert_eq!(round2(59.999), 60.0);
    }

    #[test]
    fn artifact_is_written_with_header_and_two_decimal_fields() {
        let dir = tempfile::tempdir().unwrap();
        let job_id = Uuid::new_v4();
        let rows = vec![ReportRow {
            store_id: "s1".into(),
            uptime_last_hour: 30.0,
            uptime_last_day: 12.5,
            uptime_last_week: 98.25,
            downtime_last_hour: 60.0,
            downtime_last_day: 0.0,
            downtime_last_week: 1.75,
        }];

        let path = write_artifact(dir.path(), job_id, &rows).unwrap();
        assert_eq!(path, dir.path().join(format!("{job_id}.csv")));

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "store_id,uptime_last_hour,uptime_last_day,uptime_last_week,\
             downtime_last_hour,downtime_last_day,downtime_last_week"
        );
        assert_eq!(lines.next().unwrap(), "s1,30.00,12.50,98.25,60.00,0.00,1.75");
        assert!(lines.next().is_none());

        // No temp file is left behind.
        assert!(!dir.path().join(format!("{job_id}.csv.tmp")).exists());
    }
}
