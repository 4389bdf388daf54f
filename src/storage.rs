//! SQLite-backed store for observations, business hours, and timezones.
//!
//! Timestamps live in their TEXT form (see [`crate::schema`]); parsing
//! happens on the way out so a malformed row surfaces as a
//! [`ReportError`](crate::ReportError) for the affected job instead of a
//! silent zero.

use crate::errors::ReportError;
use crate::schema::{format_timestamp, parse_time_of_day, parse_timestamp};
use crate::schema::{BusinessHourRule, Observation, Status};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Creates the monitoring tables and their lookup indexes.
///
/// Idempotent; safe to call on every startup.
pub async fn setup_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS store_status (
            store_id TEXT NOT NULL,
            timestamp_utc TEXT NOT NULL,
            status TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS store_hours (
            store_id TEXT NOT NULL,
            day_of_week INTEGER NOT NULL,
            start_time_local TEXT NOT NULL,
            end_time_local TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS store_timezones (
            store_id TEXT NOT NULL,
            timezone_str TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_store_status_store_id ON store_status (store_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_store_status_timestamp ON store_status (timestamp_utc)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_store_hours_store_id ON store_hours (store_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_store_timezones_store_id ON store_timezones (store_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// All store identifiers the system knows anything about.
///
/// Unions the three tables so a store with hours or a timezone on file but
/// no observations yet still gets a report row.
pub async fn list_store_ids(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r"
        SELECT store_id FROM store_status
        UNION
        SELECT store_id FROM store_hours
        UNION
        SELECT store_id FROM store_timezones
        ORDER BY store_id
        ",
    )
    .fetch_all(pool)
    .await
}

/// The most recent observation timestamp across all stores, or `None` when
/// the status table is empty. This anchors the report's frozen "now".
pub async fn latest_observed_at(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>, ReportError> {
    let raw = sqlx::query_scalar::<_, Option<String>>("SELECT MAX(timestamp_utc) FROM store_status")
        .fetch_one(pool)
        .await?;

    raw.map(|raw| parse_timestamp(&raw)).transpose()
}

/// Observations for one store within the inclusive UTC range.
///
/// Row order is whatever the index yields; callers must sort before
/// forward-filling.
pub async fn observations_for(
    pool: &SqlitePool,
    store_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Observation>, ReportError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r"
        SELECT timestamp_utc, status
        FROM store_status
        WHERE store_id = ?1 AND timestamp_utc BETWEEN ?2 AND ?3
        ",
    )
    .bind(store_id)
    .bind(format_timestamp(from))
    .bind(format_timestamp(to))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(raw_ts, raw_status)| {
            Ok(Observation {
                observed_at: parse_timestamp(&raw_ts)?,
                status: Status::parse(&raw_status)?,
            })
        })
        .collect()
}

/// Business-hour rules for one store. Empty means the caller should fall
/// back to [`BusinessHourRule::always_open`].
pub async fn business_hours_for(
    pool: &SqlitePool,
    store_id: &str,
) -> Result<Vec<BusinessHourRule>, ReportError> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        r"
        SELECT day_of_week, start_time_local, end_time_local
        FROM store_hours
        WHERE store_id = ?1
        ",
    )
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(day, start, end)| {
            let day_of_week = u8::try_from(day)
                .ok()
                .filter(|d| *d <= 6)
                .ok_or(ReportError::InvalidDayOfWeek(day))?;
            Ok(BusinessHourRule {
                day_of_week,
                start_time_local: parse_time_of_day(&start)?,
                end_time_local: parse_time_of_day(&end)?,
            })
        })
        .collect()
}

/// The store's timezone assignment, if any.
pub async fn timezone_for(
    pool: &SqlitePool,
    store_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT timezone_str FROM store_timezones WHERE store_id = ?1 LIMIT 1",
    )
    .bind(store_id)
    .fetch_optional(pool)
    .await
}

/// Records one status observation.
pub async fn insert_observation(
    pool: &SqlitePool,
    store_id: &str,
    observed_at: DateTime<Utc>,
    status: Status,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO store_status (store_id, timestamp_utc, status) VALUES (?1, ?2, ?3)")
        .bind(store_id)
        .bind(format_timestamp(observed_at))
        .bind(status.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Records one business-hour rule.
pub async fn insert_business_hours(
    pool: &SqlitePool,
    store_id: &str,
    rule: &BusinessHourRule,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO store_hours (store_id, day_of_week, start_time_local, end_time_local)
        VALUES (?1, ?2, ?3, ?4)
        ",
    )
    .bind(store_id)
    .bind(i64::from(rule.day_of_week))
    .bind(rule.start_time_local.format("%H:%M:%S").to_string())
    .bind(rule.end_time_local.format("%H:%M:%S").to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Records a store's timezone assignment.
pub async fn insert_timezone(
    pool: &SqlitePool,
    store_id: &str,
    timezone: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO store_timezones (store_id, timezone_str) VALUES (?1, ?2)")
        .bind(store_id)
        .bind(timezone)
        .execute(pool)
        .await?;
    Ok(())
}
