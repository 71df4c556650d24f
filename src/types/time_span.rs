//! The [`TimeSpan`] value type: a normalised, inclusive date range plus the
//! forecast window bookkeeping used by prediction requests.

use crate::error::CdsRequestError;
use crate::types::traits::any::any_date::AnyDate;
use crate::types::traits::utils::{last_day_of_month, leap_days_between};
use chrono::{Datelike, Months, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive calendar date range.
///
/// Built once from the raw strings handed over by the intent extraction step and
/// immutable afterwards, with one exception: [`TimeSpan::adjust_for_prediction`]
/// rewrites the working range into a bounded training window and keeps the
/// originally requested forecast window in the `prediction_*` fields.
///
/// # Examples
///
/// ```
/// use cds_request::TimeSpan;
/// use chrono::NaiveDate;
///
/// let span = TimeSpan::parse(&["05/10/2021", "2021-11-15"]).unwrap();
/// assert_eq!(span.start_date(), NaiveDate::from_ymd_opt(2021, 10, 5).unwrap());
/// assert_eq!(span.end_date(), NaiveDate::from_ymd_opt(2021, 11, 15).unwrap());
/// assert_eq!(span.total_days(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    start_date: NaiveDate,
    end_date: NaiveDate,
    prediction_start: Option<NaiveDate>,
    prediction_end: Option<NaiveDate>,
    prediction_horizon_years: Option<u32>,
}

impl TimeSpan {
    /// Creates a span from already-parsed dates. No ordering check is made here;
    /// inverted spans are skipped by the partitioner.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            prediction_start: None,
            prediction_end: None,
            prediction_horizon_years: None,
        }
    }

    /// Parses one date (a single-day span) or a start/end pair.
    ///
    /// Each string may be written as `DD/MM/YYYY` or `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns [`CdsRequestError::DateFormat`] for a string matching neither layout and
    /// [`CdsRequestError::UnpairedDates`] when given zero or more than two strings.
    pub fn parse<S: AsRef<str>>(date_strings: &[S]) -> Result<Self, CdsRequestError> {
        match date_strings {
            [single] => {
                let date = parse_date(single.as_ref())?;
                Ok(Self::new(date, date))
            }
            [start, end] => Ok(Self::new(
                parse_date(start.as_ref())?,
                parse_date(end.as_ref())?,
            )),
            _ => Err(CdsRequestError::UnpairedDates {
                count: date_strings.len(),
            }),
        }
    }

    /// Parses a flat list of date strings where consecutive pairs are start/end.
    pub fn parse_pairs<S: AsRef<str>>(date_strings: &[S]) -> Result<Vec<Self>, CdsRequestError> {
        if date_strings.is_empty() || date_strings.len() % 2 != 0 {
            return Err(CdsRequestError::UnpairedDates {
                count: date_strings.len(),
            });
        }
        date_strings.chunks(2).map(Self::parse).collect()
    }

    /// Same bounds as `self` but covering only `[start_date, end_date]`.
    /// Forecast bookkeeping is carried over so fragments stay attributable.
    pub(crate) fn fragment(&self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            ..*self
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn prediction_start(&self) -> Option<NaiveDate> {
        self.prediction_start
    }

    pub fn prediction_end(&self) -> Option<NaiveDate> {
        self.prediction_end
    }

    pub fn prediction_horizon_years(&self) -> Option<u32> {
        self.prediction_horizon_years
    }

    pub fn is_prediction(&self) -> bool {
        self.prediction_start.is_some()
    }

    pub fn is_inverted(&self) -> bool {
        self.start_date > self.end_date
    }

    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }

    /// Inclusive number of days covered. Zero for inverted spans.
    pub fn total_days(&self) -> i64 {
        if self.is_inverted() {
            return 0;
        }
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Number of distinct calendar years the span touches.
    pub fn years_spanned(&self) -> i64 {
        (self.end_date.year() - self.start_date.year()) as i64 + 1
    }

    /// Leap years between the first and last year touched, both inclusive.
    pub fn leap_days(&self) -> i64 {
        leap_days_between(self.start_date.year(), self.end_date.year() + 1)
    }

    /// Days per touched year, with leap days taken out first.
    pub fn average_days_per_year(&self) -> f64 {
        (self.total_days() - self.leap_days()) as f64 / self.years_spanned() as f64
    }

    /// Starts on the first of a month and ends on the last day of a month.
    pub fn is_clean_bounded(&self) -> bool {
        self.start_date.day() == 1 && last_day_of_month(self.end_date) == Some(self.end_date)
    }

    /// Turns a forecast request into a bounded training window.
    ///
    /// The requested window is kept in `prediction_start`/`prediction_end` and its
    /// length, rounded up to whole calendar years, in `prediction_horizon_years`.
    /// The working range then becomes `min_training_years` years ending at
    /// `min(cutoff_date, requested_end)`, starting on the first day of a month.
    ///
    /// Calling this on a span that was already adjusted leaves it unchanged.
    pub fn adjust_for_prediction(&mut self, cutoff_date: NaiveDate, min_training_years: u32) {
        if self.is_prediction() {
            debug!("Time span {} already adjusted for prediction", self);
            return;
        }
        let requested_start = self.start_date;
        let requested_end = self.end_date;
        self.prediction_start = Some(requested_start);
        self.prediction_end = Some(requested_end);
        self.prediction_horizon_years = Some(horizon_years(requested_start, requested_end));

        let training_end = cutoff_date.min(requested_end);
        self.end_date = training_end;
        self.start_date = training_window_start(training_end, min_training_years);
        debug!(
            "Prediction window {} to {} trains on {} to {}",
            requested_start, requested_end, self.start_date, self.end_date
        );
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start_date, self.end_date)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, CdsRequestError> {
    value
        .get_date_range()
        .map(|range| range.start)
        .ok_or_else(|| CdsRequestError::DateFormat {
            value: value.to_string(),
        })
}

/// Smallest whole number of calendar years that, added to `start`, passes `end`.
fn horizon_years(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut years = 1u32;
    while let Some(shifted) = start.checked_add_months(Months::new(12 * years)) {
        if shifted > end {
            break;
        }
        years += 1;
    }
    years
}

fn training_window_start(end: NaiveDate, years: u32) -> NaiveDate {
    end.checked_sub_months(Months::new(12 * years))
        .and_then(|date| date.succ_opt())
        .and_then(|date| date.with_day(1))
        .unwrap_or(NaiveDate::MIN)
}
