//! Date-keyed deduplication for upstream bars
//!
//! A provider response occasionally repeats the current session (an intraday
//! snapshot next to the daily bar). The store keeps one row per trading date,
//! so repeats are collapsed before insert.

use crate::models::DailyBar;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Deduplicate bars by date and sort them ascending
///
/// With `keep_last`, the last occurrence of a date wins; otherwise the first.
pub fn dedup_by_date(bars: Vec<DailyBar>, keep_last: bool) -> Vec<DailyBar> {
    let mut seen: HashSet<NaiveDate> = HashSet::with_capacity(bars.len());

    let mut unique: Vec<DailyBar> = if keep_last {
        let mut kept: Vec<DailyBar> = bars.into_iter().rev().filter(|b| seen.insert(b.date)).collect();
        kept.reverse();
        kept
    } else {
        bars.into_iter().filter(|b| seen.insert(b.date)).collect()
    };

    // Stable sort keeps the surviving order for equal keys
    unique.sort_by_key(|b| b.date);
    unique
}

/// Number of bars that share a date with an earlier bar
pub fn count_duplicates(bars: &[DailyBar]) -> usize {
    let mut seen = HashSet::with_capacity(bars.len());
    bars.iter().filter(|b| !seen.insert(b.date)).count()
}
