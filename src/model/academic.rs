use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

const ACADEMIC_PREFIX: &str = "academic_";

/// Month keys in the order a school year runs: September first, August last.
pub const ACADEMIC_MONTHS: [u8; 12] = [9, 10, 11, 12, 1, 2, 3, 4, 5, 6, 7, 8];

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum KeyError {
    #[display(fmt = "invalid academic year key `{}`", _0)]
    AcademicYear(String),
    #[display(fmt = "invalid month key `{}`", _0)]
    Month(String),
    #[display(fmt = "invalid date key `{}`", _0)]
    Date(String),
}

impl std::error::Error for KeyError {}

/// A school year spanning two calendar years, keyed as `academic_<Y>-<Y+1>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AcademicYear {
    start: i32,
}

impl AcademicYear {
    pub fn starting(start: i32) -> Self {
        Self { start }
    }

    /// September to December open a new year; January to August close the previous one.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= 9 {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start
    }

    pub fn end_year(&self) -> i32 {
        self.start + 1
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}-{}", ACADEMIC_PREFIX, self.start, self.end_year())
    }
}

impl FromStr for AcademicYear {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::AcademicYear(s.to_string());

        let years = s.strip_prefix(ACADEMIC_PREFIX).ok_or_else(invalid)?;
        let (start, end) = years.split_once('-').ok_or_else(invalid)?;

        let start = parse_year(start).ok_or_else(invalid)?;
        let end = parse_year(end).ok_or_else(invalid)?;

        if end != start + 1 {
            return Err(invalid());
        }

        Ok(Self::starting(start))
    }
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Calendar month within an academic year, rendered `"1"`..`"12"` without padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey(u8);

impl MonthKey {
    pub fn new(month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(month))
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn academic_order() -> impl Iterator<Item = MonthKey> {
        ACADEMIC_MONTHS.into_iter().map(MonthKey)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MonthKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let month = s
            .parse::<u8>()
            .ok()
            // rejects "09" and "+9"
            .filter(|m| m.to_string() == s)
            .and_then(MonthKey::new);

        month.ok_or_else(|| KeyError::Month(s.to_string()))
    }
}

/// Day key used by absence and leave books: `YYYY_MM_DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y_%m_%d"))
    }
}

impl FromStr for DateKey {
    type Err = KeyError;

    /// Accepts both the stored `YYYY_MM_DD` form and ISO `YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y_%m_%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .map(DateKey)
            .map_err(|_| KeyError::Date(s.to_string()))
    }
}

macro_rules! string_keyed {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

string_keyed!(AcademicYear);
string_keyed!(MonthKey);
string_keyed!(DateKey);
