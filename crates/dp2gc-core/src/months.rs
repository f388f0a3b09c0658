//! Month sequences spanned by a date range

/// Months to scrape between `start` and `end` (both 1..=12).
///
/// When `start < end` the end month is excluded: `(4, 9)` gives
/// `[4, 5, 6, 7, 8]`. Otherwise the sequence wraps past December and the
/// end month is included: `(11, 3)` gives `[11, 12, 1, 2, 3]`.
///
/// Equal bounds give the single month: `(1, 1)` gives `[1]`, not the
/// 13-month wrap `[1, 2, ..., 12, 1]` that a plain `start >= end` rule
/// would produce. Keep this branch ahead of the wrap.
///
/// Note the two branches disagree on whether `end` is included.
pub fn month_range(start: u32, end: u32) -> Vec<u32> {
    if start < end {
        (start..end).collect()
    } else if start == end {
        vec![start]
    } else {
        (start..=12).chain(1..=end).collect()
    }
}

/// Pair each month with the calendar year it falls in.
///
/// The year starts at `start_year` and advances whenever a month is lower
/// than the one before it.
pub fn year_month_schedule(start_year: i32, months: &[u32]) -> Vec<(i32, u32)> {
    let mut year = start_year;
    let mut previous = 0;

    months
        .iter()
        .map(|&month| {
            if month < previous {
                year += 1;
            }
            previous = month;
            (year, month)
        })
        .collect()
}
