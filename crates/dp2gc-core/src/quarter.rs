//! Quarter tokens and the date range table
//!
//! A quarter token (`1q`, `3q_and_4q`, ...) selects one academic quarter or
//! a pair of adjacent quarters. The table mapping tokens to calendar dates is
//! plain data so it can be replaced from configuration when the academic
//! calendar changes.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Symbolic academic quarter selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuarterToken {
    #[serde(rename = "1q")]
    First,
    #[serde(rename = "2q")]
    Second,
    #[serde(rename = "3q")]
    Third,
    #[serde(rename = "4q")]
    Fourth,
    #[serde(rename = "1q_and_2q")]
    FirstAndSecond,
    #[serde(rename = "3q_and_4q")]
    ThirdAndFourth,
}

impl QuarterToken {
    /// Every recognized token
    pub const ALL: [QuarterToken; 6] = [
        QuarterToken::First,
        QuarterToken::Second,
        QuarterToken::Third,
        QuarterToken::Fourth,
        QuarterToken::FirstAndSecond,
        QuarterToken::ThirdAndFourth,
    ];

    /// Wire representation of the token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "1q",
            Self::Second => "2q",
            Self::Third => "3q",
            Self::Fourth => "4q",
            Self::FirstAndSecond => "1q_and_2q",
            Self::ThirdAndFourth => "3q_and_4q",
        }
    }
}

impl fmt::Display for QuarterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuarterToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|token| token.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown quarter token: {:?}", s)))
    }
}

/// Returns true iff `candidate` is one of the recognized quarter tokens.
///
/// Matching is exact: no trimming, no case folding.
pub fn is_valid_import_range(candidate: &str) -> bool {
    candidate.parse::<QuarterToken>().is_ok()
}

/// Start and end dates of a quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Move both bounds by `years`, keeping month and day.
    ///
    /// Returns `None` when a bound does not exist in the target year (Feb 29).
    pub fn shift_years(&self, years: i32) -> Option<Self> {
        let start = self.start.with_year(self.start.year().checked_add(years)?)?;
        let end = self.end.with_year(self.end.year().checked_add(years)?)?;
        Some(Self { start, end })
    }
}

/// Academic years a range may be moved to
pub const ACADEMIC_YEARS: RangeInclusive<i32> = 1970..=9999;

/// Token to date range lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterTable {
    entries: BTreeMap<QuarterToken, DateRange>,
}

impl Default for QuarterTable {
    /// The 2022/2023 academic calendar
    fn default() -> Self {
        let entries = BTreeMap::from([
            (QuarterToken::First, FIRST_QUARTER),
            (QuarterToken::FirstAndSecond, FIRST_QUARTER),
            (QuarterToken::Second, SECOND_QUARTER),
            (QuarterToken::Third, THIRD_QUARTER),
            (QuarterToken::ThirdAndFourth, THIRD_QUARTER),
            (QuarterToken::Fourth, FOURTH_QUARTER),
        ]);

        Self { entries }
    }
}

const FIRST_QUARTER: DateRange = DateRange::new(ymd(2022, 4, 1), ymd(2022, 6, 4));
const SECOND_QUARTER: DateRange = DateRange::new(ymd(2022, 6, 1), ymd(2022, 8, 10));
const THIRD_QUARTER: DateRange = DateRange::new(ymd(2022, 9, 20), ymd(2022, 11, 30));
const FOURTH_QUARTER: DateRange = DateRange::new(ymd(2022, 11, 20), ymd(2023, 3, 20));

// Evaluated at compile time, so a bad literal fails the build.
const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

impl QuarterTable {
    /// Table with no entries
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Set (or replace) the range for one token
    pub fn with_entry(mut self, token: QuarterToken, range: DateRange) -> Self {
        self.entries.insert(token, range);
        self
    }

    /// Look up the range for a token
    pub fn get(&self, token: QuarterToken) -> Option<DateRange> {
        self.entries.get(&token).copied()
    }

    /// Resolve a raw token string.
    ///
    /// Callers are expected to validate first; unknown tokens and tokens
    /// missing from the table are reported as `InvalidArgument`.
    pub fn resolve(&self, token: &str) -> Result<DateRange> {
        let token: QuarterToken = token.parse()?;
        self.get(token).ok_or_else(|| {
            Error::InvalidArgument(format!("no date range configured for {}", token))
        })
    }

    /// Academic year the table describes (start year of the first quarter)
    pub fn base_year(&self) -> Option<i32> {
        self.get(QuarterToken::First).map(|range| range.start.year())
    }

    /// Move `range` from the table's academic year to `academic_year`.
    ///
    /// Years outside [`ACADEMIC_YEARS`] and ranges with no counterpart in
    /// the target year (Feb 29) are `InvalidArgument`. A table without a
    /// `1q` entry has no base year and is a `Config` error.
    pub fn shift_to_year(&self, range: DateRange, academic_year: i32) -> Result<DateRange> {
        if !ACADEMIC_YEARS.contains(&academic_year) {
            return Err(Error::InvalidArgument(format!(
                "academic year {} is outside {}..={}",
                academic_year,
                ACADEMIC_YEARS.start(),
                ACADEMIC_YEARS.end()
            )));
        }

        let base_year = self.base_year().ok_or_else(|| {
            Error::Config(format!("no {} entry to take the base year from", QuarterToken::First))
        })?;

        academic_year
            .checked_sub(base_year)
            .and_then(|years| range.shift_years(years))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} to {} cannot be moved to academic year {}",
                    range.start, range.end, academic_year
                ))
            })
    }

    /// Number of configured tokens
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
