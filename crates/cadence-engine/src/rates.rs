//! Completion-rate aggregation. Like the streak math these are pure
//! functions; the tracker feeds them date sets pulled from the repository.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate};

use cadence_types::MonthlyRate;

/// Percentage of expected completions achieved over the `days` calendar
/// dates ending at `today` inclusive, across all given habits. Each habit is
/// expected once per day, so the denominator is `habits × days`. Defined as
/// 0 when there are no habits or an empty window.
pub fn trailing_rate(per_habit_dates: &[BTreeSet<NaiveDate>], days: u32, today: NaiveDate) -> f64 {
    if per_habit_dates.is_empty() || days == 0 {
        return 0.0;
    }

    let mut hits = 0u32;
    for offset in 0..days {
        let Some(date) = today.checked_sub_days(Days::new(offset as u64)) else {
            break;
        };
        hits += per_habit_dates.iter().filter(|d| d.contains(&date)).count() as u32;
    }

    let expected = per_habit_dates.len() as u32 * days;
    f64::from(hits) / f64::from(expected) * 100.0
}

/// Month-to-date rate: the share of days from the 1st through `today` on
/// which the user completed at least one habit. `days_with_activity` must
/// already be restricted to that range and deduplicated across habits — a
/// day with three completions counts once. Zero habits yields the all-zero
/// rate, mirroring the trailing-window guard.
pub fn monthly_rate(
    days_with_activity: &BTreeSet<NaiveDate>,
    habit_count: usize,
    today: NaiveDate,
) -> MonthlyRate {
    if habit_count == 0 {
        return MonthlyRate::default();
    }

    let total_days = today.day();
    let completed_days = days_with_activity.len() as u32;
    MonthlyRate {
        rate: f64::from(completed_days) / f64::from(total_days) * 100.0,
        completed_days,
        total_days,
    }
}

/// First day of `today`'s month. Always exists for a valid `today`.
pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn dates(days: &[&str]) -> BTreeSet<NaiveDate> {
        days.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn trailing_rate_is_zero_with_no_habits() {
        assert_eq!(trailing_rate(&[], 7, d("2024-01-07")), 0.0);
    }

    #[test]
    fn trailing_rate_full_window_is_one_hundred() {
        let habit = dates(&["2024-01-05", "2024-01-06", "2024-01-07"]);
        let rate = trailing_rate(&[habit.clone(), habit], 3, d("2024-01-07"));
        assert_eq!(rate, 100.0);
    }

    #[test]
    fn trailing_rate_counts_each_habit_per_day() {
        // Two habits over two days; only one habit done on one day: 1/4.
        let done = dates(&["2024-01-07"]);
        let idle = BTreeSet::new();
        let rate = trailing_rate(&[done, idle], 2, d("2024-01-07"));
        assert_eq!(rate, 25.0);
    }

    #[test]
    fn trailing_rate_ignores_dates_outside_the_window() {
        let habit = dates(&["2023-12-01", "2024-01-07"]);
        let rate = trailing_rate(&[habit], 7, d("2024-01-07"));
        assert!((rate - 100.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn trailing_rate_stays_within_bounds() {
        let habit = dates(&["2024-01-06", "2024-01-07"]);
        let rate = trailing_rate(&[habit], 7, d("2024-01-07"));
        assert!((0.0..=100.0).contains(&rate));
    }

    #[test]
    fn monthly_rate_zero_habits_is_all_zero() {
        let active = dates(&["2024-01-03"]);
        assert_eq!(monthly_rate(&active, 0, d("2024-01-15")), MonthlyRate::default());
    }

    #[test]
    fn monthly_rate_counts_distinct_days_once() {
        // Three habits done on the same two days still yields 2 completed days.
        let active = dates(&["2024-01-02", "2024-01-05"]);
        let r = monthly_rate(&active, 3, d("2024-01-10"));
        assert_eq!(r.completed_days, 2);
        assert_eq!(r.total_days, 10);
        assert_eq!(r.rate, 20.0);
    }

    #[test]
    fn month_start_is_the_first() {
        assert_eq!(month_start(d("2024-02-29")), d("2024-02-01"));
        assert_eq!(month_start(d("2024-01-01")), d("2024-01-01"));
    }
}
