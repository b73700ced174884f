//! Gestational week arithmetic.
//!
//! Weeks are counted in the last-menstrual-period convention: a known
//! conception date is shifted back 14 days before counting. Results are
//! never clamped; values below 1 or above 42 are legitimate outputs.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Length of a full-term pregnancy, counted back from the due date.
pub const PREGNANCY_DAYS: i64 = 280;

/// Week of the estimated due date.
pub const DUE_WEEK: i64 = 40;

const CONCEPTION_OFFSET_DAYS: i64 = 14;

/// Whole days elapsed from midnight UTC of `date` until `now`.
fn days_since(now: DateTime<Utc>, date: NaiveDate) -> i64 {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    (now - start).num_days()
}

/// Current gestational week.
///
/// With a conception date: `floor((days_since_conception + 14) / 7) + 1`.
/// Without one, conception is estimated as `due_date - 280 days` and the
/// elapsed days since that estimate are used directly, so the due date
/// itself falls in week 41 and the estimate in week 1.
pub fn current_week(now: DateTime<Utc>, conception: Option<NaiveDate>, due: NaiveDate) -> i64 {
    match conception {
        Some(conceived) => {
            (days_since(now, conceived) + CONCEPTION_OFFSET_DAYS).div_euclid(7) + 1
        }
        None => {
            let estimated = due - Duration::days(PREGNANCY_DAYS);
            days_since(now, estimated).div_euclid(7) + 1
        }
    }
}

/// Week number to stamp on a record created at `at`.
///
/// Only defined when a conception date is known and the result is positive.
pub fn week_at(at: DateTime<Utc>, conception: Option<NaiveDate>) -> Option<i64> {
    let conceived = conception?;
    let week = (days_since(at, conceived) + CONCEPTION_OFFSET_DAYS).div_euclid(7) + 1;
    (week > 0).then_some(week)
}

/// Weeks left until the due week; negative once past it.
pub fn weeks_remaining(current_week: i64) -> i64 {
    DUE_WEEK - current_week
}

pub fn is_overdue(now: DateTime<Utc>, due: NaiveDate) -> bool {
    now.date_naive() > due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, hour: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&d.and_hms_opt(hour, 0, 0).unwrap())
    }

    #[test]
    fn due_date_only_reaches_week_41_on_due_date() {
        let due = date(2025, 6, 1);
        assert_eq!(current_week(at(due, 0), None, due), 41);
        assert_eq!(current_week(at(due, 15), None, due), 41);
    }

    #[test]
    fn due_date_only_starts_at_week_1() {
        let due = date(2025, 6, 1);
        let start = due - Duration::days(PREGNANCY_DAYS);
        assert_eq!(current_week(at(start, 0), None, due), 1);
        assert_eq!(current_week(at(start + Duration::days(6), 12), None, due), 1);
        assert_eq!(current_week(at(start + Duration::days(7), 0), None, due), 2);
    }

    #[test]
    fn conception_date_adds_two_weeks() {
        let conceived = date(2025, 1, 1);
        let due = date(2025, 9, 24);
        assert_eq!(current_week(at(conceived, 0), Some(conceived), due), 3);
        assert_eq!(current_week(at(conceived + Duration::days(70), 0), Some(conceived), due), 13);
    }

    #[test]
    fn results_are_not_clamped() {
        let due = date(2025, 6, 1);
        let long_before = due - Duration::days(PREGNANCY_DAYS + 30);
        assert!(current_week(at(long_before, 0), None, due) <= 0);
        let long_after = due + Duration::days(30);
        assert!(current_week(at(long_after, 0), None, due) > 42);
    }

    #[test]
    fn week_at_requires_conception_and_positive_result() {
        let conceived = date(2025, 1, 1);
        assert_eq!(week_at(at(conceived, 9), None), None);
        assert_eq!(week_at(at(conceived + Duration::days(14), 0), Some(conceived)), Some(5));
        assert_eq!(week_at(at(conceived - Duration::days(60), 0), Some(conceived)), None);
    }

    #[test]
    fn remaining_and_overdue() {
        let due = date(2025, 6, 1);
        assert_eq!(weeks_remaining(38), 2);
        assert_eq!(weeks_remaining(41), -1);
        assert!(!is_overdue(at(due, 23), due));
        assert!(is_overdue(at(due + Duration::days(1), 0), due));
    }
}
