use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("malformed date '{0}', expected YYYY-MM-DD")]
    Malformed(String),

    #[error("malformed month '{0}', expected YYYY-MM")]
    MalformedMonth(String),
}

/// Parse an ISO `YYYY-MM-DD` date from its components.
///
/// Stricter than `NaiveDate::parse_from_str`: every component must have its
/// full width, so "2024-3-1" is rejected instead of silently accepted.
pub fn parse_iso_date(input: &str) -> Result<NaiveDate, DateError> {
    let malformed = || DateError::Malformed(input.to_string());

    let mut parts = input.split('-');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    let year = fixed_width_number(year, 4).ok_or_else(malformed)?;
    let month = fixed_width_number(month, 2).ok_or_else(malformed)?;
    let day = fixed_width_number(day, 2).ok_or_else(malformed)?;

    NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(malformed)
}

fn fixed_width_number(part: &str, width: usize) -> Option<u32> {
    if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Day key used to group transactions for display: `DD/MM/YYYY`.
/// Built from the date's components, so it never shifts with the host timezone.
pub fn day_key(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year())
}

/// A calendar month, the period unit of statements and consolidations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        // Reject anything NaiveDate cannot represent as a first day.
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Parse `YYYY-MM`.
    pub fn parse(input: &str) -> Result<Self, DateError> {
        let malformed = || DateError::MalformedMonth(input.to_string());
        let (year, month) = input.split_once('-').ok_or_else(malformed)?;
        let year = fixed_width_number(year, 4).ok_or_else(malformed)?;
        let month = fixed_width_number(month, 2).ok_or_else(malformed)?;
        Self::new(year as i32, month).ok_or_else(malformed)
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = DateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}
