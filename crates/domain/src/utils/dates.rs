//! Date-range arithmetic for stays.
//!
//! All ranges are half-open `[check_in, check_out)`: the check-out day is
//! not an occupied night, so ranges that merely touch do not overlap.

use chrono::NaiveDate;

/// Whole-day difference between check-in and check-out.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// Half-open overlap test: `a.start < b.end && a.end > b.start`.
pub fn dates_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Intersection of two overlapping ranges; `None` when they do not overlap.
pub fn overlap_period(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    if !dates_overlap(a_start, a_end, b_start, b_end) {
        return None;
    }
    Some((a_start.max(b_start), a_end.min(b_end)))
}
