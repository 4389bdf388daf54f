//! Per-window uptime/downtime estimation.
//!
//! Observations are sparse and irregular, so status is forward-filled: the
//! status at observation `k` is assumed to hold until observation `k + 1`.
//! The gap before the first observation in a window and the tail after the
//! last one are attributed to neither uptime nor downtime, which is why the
//! two totals may sum to less than the window length.

use crate::hours::is_open;
use crate::schema::{BusinessHourRule, Observation, Status};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Accumulated uptime and downtime for one trailing window, in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowTotals {
    /// Minutes the store was observed (or forward-filled) active inside
    /// business hours.
    pub uptime_minutes: f64,
    /// Minutes the store was observed (or forward-filled) inactive inside
    /// business hours.
    pub downtime_minutes: f64,
}

/// Estimates uptime/downtime for the inclusive window
/// `[window_start, now]`.
///
/// Each consecutive pair of in-window observations forms a segment carrying
/// the earlier observation's status. Business-hours membership is evaluated
/// at the segment's start instant only; a segment straddling an open/closed
/// boundary counts entirely toward whichever side its start falls on.
/// Segments starting outside business hours contribute to neither total.
/// Windows holding zero or one observation yield `(0, 0)`.
pub fn estimate(
    observations: &[Observation],
    rules: &[BusinessHourRule],
    tz: Tz,
    window_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> WindowTotals {
    let mut in_window: Vec<&Observation> = observations
        .iter()
        .filter(|obs| window_start <= obs.observed_at && obs.observed_at <= now)
        .collect();
    // Stable sort keeps equal-timestamp observations in storage order.
    in_window.sort_by_key(|obs| obs.observed_at);

    let mut totals = WindowTotals::default();
    for pair in in_window.windows(2) {
        let [prev, next] = pair else { continue };

        let duration_minutes =
            (next.observed_at - prev.observed_at).num_milliseconds() as f64 / 60_000.0;
        if !is_open(rules, tz, prev.observed_at) {
            continue;
        }

        match prev.status {
            Status::Active => totals.uptime_minutes += duration_minutes,
            Status::Inactive => totals.downtime_minutes += duration_minutes,
        }
    }

    totals
}
