//! Recurrence expansion.
//!
//! Turns a [`RecurrenceSpec`] into the ordered list of local start times it
//! describes. Pure and deterministic, so it doubles as a schedule preview.
//!
//! Biweekly rules are read as "every other week, on these days": the range is
//! cut into 7-day windows anchored at the start date and only the even windows
//! (0, 2, 4, ...) are active. Inside an active window every day whose weekday is
//! listed is emitted. With a single weekday equal to the start date's weekday
//! this is the same as stepping 14 days at a time from the start date.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::RecurrenceError;
use crate::models::recurrence::{RecurrencePattern, RecurrenceSpec, MAX_OCCURRENCES};

/// Expand a recurrence rule into start times, capped at [`MAX_OCCURRENCES`].
///
/// Iteration stops at the first occurrence past the cap, so the cost is bounded
/// by the cap and not by the width of the date range.
pub fn expand(spec: &RecurrenceSpec) -> Result<Vec<NaiveDateTime>, RecurrenceError> {
    let time = validate(spec)?;

    let mut occurrences = Vec::new();
    for date in candidate_dates(spec) {
        if occurrences.len() == MAX_OCCURRENCES {
            return Err(RecurrenceError::TooManyOccurrences {
                count: MAX_OCCURRENCES + 1,
                max: MAX_OCCURRENCES,
            });
        }
        occurrences.push(date.and_time(time));
    }

    Ok(occurrences)
}

fn validate(spec: &RecurrenceSpec) -> Result<NaiveTime, RecurrenceError> {
    if spec.end_date < spec.start_date {
        return Err(RecurrenceError::InvalidDateRange {
            start: spec.start_date,
            end: spec.end_date,
        });
    }

    if spec.pattern.uses_weekdays() {
        if spec.days_of_week.is_empty() {
            return Err(RecurrenceError::MissingWeekdays(spec.pattern.to_string()));
        }
        if let Some(day) = spec.days_of_week.iter().find(|d| **d > 6) {
            return Err(RecurrenceError::InvalidWeekday(*day));
        }
    }

    spec.time_of_day()
        .ok_or(RecurrenceError::InvalidTimeOfDay {
            hour: spec.hour,
            minute: spec.minute,
        })
}

fn candidate_dates(spec: &RecurrenceSpec) -> Box<dyn Iterator<Item = NaiveDate> + '_> {
    let start = spec.start_date;
    let days = every_day(start, spec.end_date);

    match spec.pattern {
        RecurrencePattern::Daily => Box::new(days),
        RecurrencePattern::Weekly => Box::new(days.filter(move |d| on_listed_weekday(spec, *d))),
        RecurrencePattern::Biweekly => Box::new(days.filter(move |d| {
            let week_index = (*d - start).num_days() / 7;
            week_index % 2 == 0 && on_listed_weekday(spec, *d)
        })),
        RecurrencePattern::Monthly => Box::new(monthly_dates(start, spec.end_date)),
    }
}

fn every_day(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |d| d.checked_add_signed(Duration::days(1)))
        .take_while(move |d| *d <= end)
}

fn on_listed_weekday(spec: &RecurrenceSpec, date: NaiveDate) -> bool {
    let weekday = date.weekday().num_days_from_sunday() as u8;
    spec.days_of_week.contains(&weekday)
}

/// Same day-of-month as `start` in every month up to `end`. Months without
/// that day are skipped rather than clamped to their last day.
fn monthly_dates(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let day = start.day();
    let first_month = start.year() * 12 + start.month0() as i32;
    let last_month = end.year() * 12 + end.month0() as i32;

    (first_month..=last_month)
        .filter_map(move |index| {
            let year = index.div_euclid(12);
            let month = index.rem_euclid(12) as u32 + 1;
            NaiveDate::from_ymd_opt(year, month, day)
        })
        .filter(move |d| *d >= start && *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, hour: u32, minute: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(hour, minute, 0).unwrap()
    }

    fn spec(
        pattern: RecurrencePattern,
        days: &[u8],
        start: NaiveDate,
        end: NaiveDate,
    ) -> RecurrenceSpec {
        RecurrenceSpec {
            pattern,
            days_of_week: days.to_vec(),
            start_date: start,
            end_date: end,
            hour: 6,
            minute: 30,
        }
    }

    #[test]
    fn test_daily_includes_both_ends() {
        let result = expand(&spec(
            RecurrencePattern::Daily,
            &[],
            date(2024, 2, 27),
            date(2024, 3, 1),
        ))
        .unwrap();
        assert_eq!(
            result,
            vec![
                at(2024, 2, 27, 6, 30),
                at(2024, 2, 28, 6, 30),
                at(2024, 2, 29, 6, 30),
                at(2024, 3, 1, 6, 30),
            ]
        );
    }

    #[test]
    fn test_daily_single_day() {
        let result = expand(&spec(
            RecurrencePattern::Daily,
            &[],
            date(2024, 1, 1),
            date(2024, 1, 1),
        ))
        .unwrap();
        assert_eq!(result, vec![at(2024, 1, 1, 6, 30)]);
    }

    #[test]
    fn test_weekly_mon_wed_fri() {
        let result = expand(&spec(
            RecurrencePattern::Weekly,
            &[1, 3, 5],
            date(2024, 1, 1),
            date(2024, 1, 7),
        ))
        .unwrap();
        assert_eq!(
            result,
            vec![
                at(2024, 1, 1, 6, 30),
                at(2024, 1, 3, 6, 30),
                at(2024, 1, 5, 6, 30),
            ]
        );
    }

    #[test]
    fn test_weekly_sunday_is_zero() {
        let result = expand(&spec(
            RecurrencePattern::Weekly,
            &[0],
            date(2024, 1, 1),
            date(2024, 1, 21),
        ))
        .unwrap();
        assert_eq!(
            result,
            vec![
                at(2024, 1, 7, 6, 30),
                at(2024, 1, 14, 6, 30),
                at(2024, 1, 21, 6, 30),
            ]
        );
    }

    #[test]
    fn test_biweekly_steps_fourteen_days() {
        let result = expand(&spec(
            RecurrencePattern::Biweekly,
            &[1],
            date(2024, 1, 1),
            date(2024, 2, 5),
        ))
        .unwrap();
        assert_eq!(
            result,
            vec![
                at(2024, 1, 1, 6, 30),
                at(2024, 1, 15, 6, 30),
                at(2024, 1, 29, 6, 30),
            ]
        );
    }

    #[test]
    fn test_biweekly_multiple_days_only_on_active_weeks() {
        // Tue 2024-01-02 starts the first window; Thursday is in the same window.
        let result = expand(&spec(
            RecurrencePattern::Biweekly,
            &[2, 4],
            date(2024, 1, 2),
            date(2024, 1, 31),
        ))
        .unwrap();
        assert_eq!(
            result,
            vec![
                at(2024, 1, 2, 6, 30),
                at(2024, 1, 4, 6, 30),
                at(2024, 1, 16, 6, 30),
                at(2024, 1, 18, 6, 30),
                at(2024, 1, 30, 6, 30),
            ]
        );
    }

    #[test]
    fn test_monthly_skips_short_months() {
        let result = expand(&spec(
            RecurrencePattern::Monthly,
            &[],
            date(2024, 1, 31),
            date(2024, 4, 30),
        ))
        .unwrap();
        assert_eq!(result, vec![at(2024, 1, 31, 6, 30), at(2024, 3, 31, 6, 30)]);
    }

    #[test]
    fn test_monthly_across_year_boundary() {
        let result = expand(&spec(
            RecurrencePattern::Monthly,
            &[],
            date(2023, 11, 15),
            date(2024, 2, 14),
        ))
        .unwrap();
        assert_eq!(
            result,
            vec![
                at(2023, 11, 15, 6, 30),
                at(2023, 12, 15, 6, 30),
                at(2024, 1, 15, 6, 30),
            ]
        );
    }

    #[test]
    fn test_monthly_leap_day() {
        let result = expand(&spec(
            RecurrencePattern::Monthly,
            &[],
            date(2024, 2, 29),
            date(2024, 6, 30),
        ))
        .unwrap();
        assert_eq!(
            result,
            vec![
                at(2024, 2, 29, 6, 30),
                at(2024, 3, 29, 6, 30),
                at(2024, 4, 29, 6, 30),
                at(2024, 5, 29, 6, 30),
                at(2024, 6, 29, 6, 30),
            ]
        );
    }

    #[test]
    fn test_expand_is_deterministic() {
        let rule = spec(
            RecurrencePattern::Weekly,
            &[2, 4, 6],
            date(2024, 3, 1),
            date(2024, 5, 31),
        );
        assert_eq!(expand(&rule).unwrap(), expand(&rule).unwrap());
    }

    #[test]
    fn test_exactly_max_occurrences_is_allowed() {
        let start = date(2024, 1, 1);
        let end = start + Duration::days(MAX_OCCURRENCES as i64 - 1);
        let result = expand(&spec(RecurrencePattern::Daily, &[], start, end)).unwrap();
        assert_eq!(result.len(), MAX_OCCURRENCES);
    }

    #[test]
    fn test_overflow_is_an_error_not_truncation() {
        let err = expand(&spec(
            RecurrencePattern::Daily,
            &[],
            date(2024, 1, 1),
            date(2024, 12, 31),
        ))
        .unwrap_err();
        assert_eq!(
            err,
            RecurrenceError::TooManyOccurrences {
                count: MAX_OCCURRENCES + 1,
                max: MAX_OCCURRENCES
            }
        );
    }

    #[test]
    fn test_overflow_on_widest_range_returns_quickly() {
        let started = std::time::Instant::now();
        let err = expand(&spec(
            RecurrencePattern::Daily,
            &[],
            NaiveDate::MIN,
            NaiveDate::MAX,
        ))
        .unwrap_err();
        assert!(matches!(err, RecurrenceError::TooManyOccurrences { .. }));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_sparse_weekly_overflow_over_wide_range_returns_quickly() {
        let started = std::time::Instant::now();
        let err = expand(&spec(
            RecurrencePattern::Biweekly,
            &[3],
            date(2000, 1, 1),
            NaiveDate::MAX,
        ))
        .unwrap_err();
        assert_eq!(
            err,
            RecurrenceError::TooManyOccurrences {
                count: MAX_OCCURRENCES + 1,
                max: MAX_OCCURRENCES
            }
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_monthly_overflow_over_wide_range() {
        let err = expand(&spec(
            RecurrencePattern::Monthly,
            &[],
            date(2000, 1, 1),
            NaiveDate::MAX,
        ))
        .unwrap_err();
        assert!(matches!(err, RecurrenceError::TooManyOccurrences { .. }));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = expand(&spec(
            RecurrencePattern::Daily,
            &[],
            date(2024, 1, 10),
            date(2024, 1, 9),
        ))
        .unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_weekly_requires_days() {
        let err = expand(&spec(
            RecurrencePattern::Weekly,
            &[],
            date(2024, 1, 1),
            date(2024, 1, 31),
        ))
        .unwrap_err();
        assert_eq!(err, RecurrenceError::MissingWeekdays("weekly".to_string()));
    }

    #[test]
    fn test_invalid_weekday_rejected() {
        let err = expand(&spec(
            RecurrencePattern::Biweekly,
            &[3, 8],
            date(2024, 1, 1),
            date(2024, 1, 31),
        ))
        .unwrap_err();
        assert_eq!(err, RecurrenceError::InvalidWeekday(8));
    }

    #[test]
    fn test_invalid_time_rejected() {
        let mut rule = spec(RecurrencePattern::Daily, &[], date(2024, 1, 1), date(2024, 1, 2));
        rule.minute = 60;
        assert_eq!(
            expand(&rule).unwrap_err(),
            RecurrenceError::InvalidTimeOfDay { hour: 6, minute: 60 }
        );
    }

    #[test]
    fn test_weekly_with_no_matching_day_is_empty() {
        let result = expand(&spec(
            RecurrencePattern::Weekly,
            &[6],
            date(2024, 1, 1),
            date(2024, 1, 5),
        ))
        .unwrap();
        assert!(result.is_empty());
    }
}
