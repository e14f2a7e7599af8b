//! Pure streak math over deduplicated calendar-date sets. "Today" is always
//! caller-supplied so results are reproducible in tests.

use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Count of consecutive completed days ending at `today` or, failing that,
/// at yesterday. The one-day grace means a streak only reads as broken once
/// a full day has elapsed with no completion: completing yesterday but not
/// (yet) today still shows the run as alive.
pub fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if dates.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 1;
    let mut cursor = anchor;
    while let Some(prev) = cursor.pred_opt() {
        if !dates.contains(&prev) {
            break;
        }
        streak += 1;
        cursor = prev;
    }
    streak
}

/// Length of the longest run of consecutive days anywhere in the set.
/// 0 for an empty set, 1 for a singleton.
pub fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &date in dates {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }
    longest
}
