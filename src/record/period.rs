use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A `YYYY-MM` calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Derive the period from a record date.
    ///
    /// Accepts `YYYYMM…` (compact dates and `fullstartdate` stamps) and
    /// `YYYY-MM…` (ISO dates). Anything else yields `None`.
    pub fn from_date_str(value: &str) -> Option<Self> {
        let year = value.get(0..4)?;
        let month = if value.get(4..5) == Some("-") {
            value.get(5..7)?
        } else {
            value.get(4..6)?
        };
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    /// Directory and file stem for this period
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 7 || s.get(4..5) != Some("-") {
            return Err(format!("expected YYYY-MM, got '{}'", s));
        }
        Self::from_date_str(s).ok_or_else(|| format!("invalid period '{}'", s))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
