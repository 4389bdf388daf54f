//! Business-hours membership.

use crate::schema::BusinessHourRule;
use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

/// Returns whether `instant` falls inside any of the store's open
/// intervals, in the store's local timezone.
///
/// The weekday convention matches the stored rules: 0 = Monday through
/// 6 = Sunday. The local time of day is truncated to whole seconds before
/// comparison so an instant at `23:59:59.5` still matches a rule ending at
/// `23:59:59`. Both rule bounds are inclusive.
pub fn is_open(rules: &[BusinessHourRule], tz: Tz, instant: DateTime<Utc>) -> bool {
    let local = instant.with_timezone(&tz);
    let weekday = local.weekday().num_days_from_monday() as u8;
    let time = local.time();
    let time_of_day =
        NaiveTime::from_hms_opt(time.hour(), time.minute(), time.second()).unwrap_or(time);

    rules.iter().any(|rule| {
        rule.day_of_week == weekday
            && rule.start_time_local <= time_of_day
            && time_of_day <= rule.end_time_local
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn rule(day: u8, start: &str, end: &str) -> BusinessHourRule {
        BusinessHourRule {
            day_of_week: day,
            start_time_local: start.parse().unwrap(),
            end_time_local: end.parse().unwrap(),
        }
    }

    #[test]
    fn matches_weekday_and_interval_inclusively() {
        // 2023-01-25 is a Wednesday (day 2).
        let rules = vec![rule(2, "09:00:00", "17:00:00")];
        let tz: Tz = "UTC".parse().unwrap();

        let open = Utc.with_ymd_and_hms(2023, 1, 25, 12, 0, 0).unwrap();
        let at_start = Utc.with_ymd_and_hms(2023, 1, 25, 9, 0, 0).unwrap();
        let at_end = Utc.with_ymd_and_hms(2023, 1, 25, 17, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2023, 1, 25, 8, 59, 59).unwrap();
        let wrong_day = Utc.with_ymd_and_hms(2023, 1, 26, 12, 0, 0).unwrap();

        assert!(is_open(&rules, tz, open));
        assert!(is_open(&rules, tz, at_start));
        assert!(is_open(&rules, tz, at_end));
        assert!(!is_open(&rules, tz, before));
        assert!(!is_open(&rules, tz, wrong_day));
    }

    #[test]
    fn any_split_shift_rule_opens_the_interval() {
        let rules = vec![
            rule(4, "08:00:00", "11:00:00"),
            rule(4, "15:00:00", "22:00:00"),
        ];
        let tz: Tz = "UTC".parse().unwrap();

        // 2023-01-27 is a Friday (day 4).
        let morning = Utc.with_ymd_and_hms(2023, 1, 27, 9, 30, 0).unwrap();
        let siesta = Utc.with_ymd_and_hms(2023, 1, 27, 12, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2023, 1, 27, 18, 0, 0).unwrap();

        assert!(is_open(&rules, tz, morning));
        assert!(!is_open(&rules, tz, siesta));
        assert!(is_open(&rules, tz, evening));
    }

    #[test]
    fn membership_is_evaluated_in_local_time() {
        // 18:00 UTC is noon in Chicago (CST, UTC-6) in January.
        let rules = vec![rule(2, "09:00:00", "17:00:00")];
        let chicago: Tz = "America/Chicago".parse().unwrap();

        let noon_local = Utc.with_ymd_and_hms(2023, 1, 25, 18, 0, 0).unwrap();
        let late_local = Utc.with_ymd_and_hms(2023, 1, 25, 23, 30, 0).unwrap();

        assert!(is_open(&rules, chicago, noon_local));
        assert!(!is_open(&rules, chicago, late_local));
    }

    #[test]
    fn weekday_is_derived_from_local_date() {
        // 2023-01-26 01:00 UTC is still Wednesday evening in Chicago.
        let rules = vec![rule(2, "00:00:00", "23:59:59")];
        let chicago: Tz = "America/Chicago".parse().unwrap();

        let utc_thursday = Utc.with_ymd_and_hms(2023, 1, 26, 1, 0, 0).unwrap();
        assert!(is_open(&rules, chicago, utc_thursday));
    }

    #[test]
    fn fractional_seconds_do_not_leak_past_the_closing_bound() {
        let rules = vec![rule(2, "00:00:00", "23:59:59")];
        let tz: Tz = "UTC".parse().unwrap();

        let instant = Utc
            .with_ymd_and_hms(2023, 1, 25, 23, 59, 59)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(500))
            .unwrap();
        assert!(is_open(&rules, tz, instant));
    }
}
