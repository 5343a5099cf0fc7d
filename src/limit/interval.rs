//! Interval boundary computation.
//!
//! Boundaries are wall-clock local dates, not fixed durations: a daily
//! interval starts at local midnight, a weekly interval at local midnight
//! of the configured start-of-week day, and a monthly interval at local
//! midnight of the first of the month. Around DST transitions the span of
//! an interval may therefore differ from 86400/604800 seconds.

use chrono::{DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

/// The recurring interval an order limit applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    /// Resets at local midnight every day
    #[default]
    Daily,
    /// Resets at local midnight on the configured start-of-week day
    Weekly,
    /// Resets at local midnight on the first of each calendar month
    Monthly,
}

impl IntervalKind {
    /// Parse an interval name.
    ///
    /// Empty or unrecognized input falls back to daily semantics.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "weekly" => IntervalKind::Weekly,
            "monthly" => IntervalKind::Monthly,
            _ => IntervalKind::Daily,
        }
    }

    /// Name of this interval kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalKind::Daily => "daily",
            IntervalKind::Weekly => "weekly",
            IntervalKind::Monthly => "monthly",
        }
    }
}

/// Map a 0=Sunday..6=Saturday index to a weekday.
///
/// Site-wide week-start settings use this numbering. Out-of-range values
/// wrap rather than fail.
pub fn week_start_from_index(index: u8) -> Weekday {
    match index % 7 {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

/// Compute the start of the interval containing `now`.
///
/// The result is always a local midnight in `now`'s timezone, at or
/// before `now`. For weekly intervals the boundary is the most recent
/// date (possibly today) whose weekday equals `week_start`.
pub fn interval_start<Tz: TimeZone>(
    now: &DateTime<Tz>,
    kind: IntervalKind,
    week_start: Weekday,
) -> DateTime<Tz> {
    let today = now.date_naive();
    let start_date = match kind {
        IntervalKind::Daily => today,
        IntervalKind::Weekly => {
            let days_back = (today.weekday().num_days_from_sunday() + 7
                - week_start.num_days_from_sunday())
                % 7;
            today - Duration::days(i64::from(days_back))
        }
        IntervalKind::Monthly => today.with_day(1).unwrap_or(today),
    };
    local_midnight(&now.timezone(), start_date)
}

/// Compute the start of the interval following the one starting at
/// `current_start`.
///
/// Daily advances one day, weekly seven days, monthly one calendar month
/// with chrono's month-end clamping.
pub fn next_interval_start<Tz: TimeZone>(
    current_start: &DateTime<Tz>,
    kind: IntervalKind,
) -> DateTime<Tz> {
    let date = current_start.date_naive();
    let next_date = match kind {
        IntervalKind::Daily => date + Duration::days(1),
        IntervalKind::Weekly => date + Duration::days(7),
        IntervalKind::Monthly => date.checked_add_months(Months::new(1)).unwrap_or(date),
    };
    local_midnight(&current_start.timezone(), next_date)
}

/// Whole seconds from `now` until `next_start`, floored at zero.
pub fn seconds_until<Tz: TimeZone>(now: &DateTime<Tz>, next_start: &DateTime<Tz>) -> u64 {
    (next_start.timestamp() - now.timestamp()).max(0) as u64
}

/// Resolve a local midnight in the given timezone.
///
/// Midnight can be ambiguous or nonexistent around DST transitions: an
/// ambiguous midnight resolves to the earlier instant, and a skipped
/// midnight resolves to the first representable local hour after it.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let mut naive = date.and_time(NaiveTime::MIN);
    for _ in 0..4 {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt,
            LocalResult::Ambiguous(earlier, _) => return earlier,
            LocalResult::None => naive = naive + Duration::hours(1),
        }
    }
    tz.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_parse_interval_kind() {
        assert_eq!(IntervalKind::parse("daily"), IntervalKind::Daily);
        assert_eq!(IntervalKind::parse("Weekly"), IntervalKind::Weekly);
        assert_eq!(IntervalKind::parse(" monthly "), IntervalKind::Monthly);
        assert_eq!(IntervalKind::parse(""), IntervalKind::Daily);
        assert_eq!(IntervalKind::parse("fortnightly"), IntervalKind::Daily);
    }

    #[test]
    fn test_week_start_index_mapping() {
        assert_eq!(week_start_from_index(0), Weekday::Sun);
        assert_eq!(week_start_from_index(1), Weekday::Mon);
        assert_eq!(week_start_from_index(6), Weekday::Sat);
        // Out-of-range indices wrap
        assert_eq!(week_start_from_index(9), Weekday::Tue);
    }

    #[test]
    fn test_daily_start_is_local_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 15, 30, 45).unwrap();
        let start = interval_start(&now, IntervalKind::Daily, Weekday::Mon);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_start_midweek() {
        // 2024-06-12 is a Wednesday; with a Monday week start the
        // interval began on Monday the 10th.
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 15, 30, 0).unwrap();
        let start = interval_start(&now, IntervalKind::Weekly, Weekday::Mon);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_start_on_week_start_day_is_today() {
        // 2024-06-10 is a Monday
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let start = interval_start(&now, IntervalKind::Weekly, Weekday::Mon);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_start_wraps_full_week() {
        // A Monday with a Tuesday week start reaches back six days
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let start = interval_start(&now, IntervalKind::Weekly, Weekday::Tue);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_start_is_never_in_the_future() {
        let week_starts = [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ];
        for day in 1..=14 {
            let now = Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap();
            for week_start in week_starts {
                let start = interval_start(&now, IntervalKind::Weekly, week_start);
                assert!(start <= now);
                assert_eq!(start.weekday(), week_start);
                assert!(now.signed_duration_since(&start) < Duration::days(7));
            }
        }
    }

    #[test]
    fn test_monthly_start_is_first_of_month() {
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 23, 59, 59).unwrap();
        let start = interval_start(&now, IntervalKind::Monthly, Weekday::Mon);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_interval_start_advances_one_unit() {
        let start = Utc.with_ymd_and_hms(2024, 6, 12, 0, 0, 0).unwrap();
        assert_eq!(
            next_interval_start(&start, IntervalKind::Daily),
            Utc.with_ymd_and_hms(2024, 6, 13, 0, 0, 0).unwrap()
        );
        assert_eq!(
            next_interval_start(&start, IntervalKind::Weekly),
            Utc.with_ymd_and_hms(2024, 6, 19, 0, 0, 0).unwrap()
        );

        let month_start = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_interval_start(&month_start, IntervalKind::Monthly),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_seconds_until_is_never_negative() {
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 6, 13, 0, 0, 0).unwrap();
        assert_eq!(seconds_until(&now, &next), 12 * 3600);
        // An already-elapsed boundary yields zero, not a negative wait
        assert_eq!(seconds_until(&next, &now), 0);
        assert_eq!(seconds_until(&now, &now), 0);
    }

    #[test]
    fn test_seconds_until_exactly_at_boundary() {
        let boundary = Utc.with_ymd_and_hms(2024, 6, 12, 0, 0, 0).unwrap();
        let start = interval_start(&boundary, IntervalKind::Daily, Weekday::Mon);
        assert_eq!(start, boundary);
        let next = next_interval_start(&start, IntervalKind::Daily);
        assert_eq!(seconds_until(&boundary, &next), 86400);
    }

    #[test]
    fn test_boundaries_follow_local_date() {
        // 21:00 UTC on the 12th is already the 13th at UTC+5:30
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = Utc
            .with_ymd_and_hms(2024, 6, 12, 21, 0, 0)
            .unwrap()
            .with_timezone(&tz);
        let start = interval_start(&now, IntervalKind::Daily, Weekday::Mon);
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 13).unwrap());
        assert_eq!(start.time(), NaiveTime::MIN);
        assert!(start <= now);
    }

    #[test]
    fn test_interval_start_precedes_now_for_all_kinds() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 6, 30, 0).unwrap();
        for kind in [IntervalKind::Daily, IntervalKind::Weekly, IntervalKind::Monthly] {
            let start = interval_start(&now, kind, Weekday::Sun);
            let next = next_interval_start(&start, kind);
            assert!(start <= now, "{kind:?} start after now");
            assert!(now < next, "{kind:?} next start not after now");
        }
    }
}
