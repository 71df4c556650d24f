use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar year, rendered the way the archive expects it (`"2021"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Year(pub i32);
impl Year {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<NaiveDate> for Year {
    fn from(date: NaiveDate) -> Self {
        Year(date.year())
    }
}

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A calendar month within a year.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);
impl Month {
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }
    pub fn new(month: u32, year: i32) -> Self {
        Self(year, month)
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// Inclusive start and end of a date range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StartEndDate {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
