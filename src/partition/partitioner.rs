//! Splitting logical (location × timeframe) requests into archive-compliant
//! [`SubRequest`]s.
//!
//! The archive addresses time through year/month/day lists, so a range is
//! served in one call when it covers whole years with clean month boundaries.
//! Shorter ranges are walked month by month, each fragment capped at the
//! range's true end.

use crate::types::bounding_box::ResolvedArea;
use crate::types::sub_request::{RequestId, SubRequest};
use crate::types::time_span::TimeSpan;
use crate::types::traits::utils::last_day_of_month;
use log::{debug, warn};

/// Leap-adjusted days per touched year at or above which a range counts as
/// covering whole years.
pub const FULL_YEAR_DAYS: f64 = 364.0;

/// How a single logical range is cut up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragmentation {
    /// The whole range goes out as one unit.
    Single,
    /// One unit per calendar month touched.
    ByMonth,
}

/// Decides how `timeframe` is fragmented. Inverted spans are the caller's
/// concern and are classified as `Single`.
pub fn classify(timeframe: &TimeSpan) -> Fragmentation {
    if timeframe.is_inverted() || timeframe.is_single_day() {
        return Fragmentation::Single;
    }
    if timeframe.average_days_per_year() >= FULL_YEAR_DAYS {
        // Whole years go out as one unit, clean-bounded or not.
        Fragmentation::Single
    } else {
        Fragmentation::ByMonth
    }
}

/// The contiguous pieces `timeframe` is split into, in chronological order.
pub fn split_timeframe(timeframe: &TimeSpan) -> Vec<TimeSpan> {
    match classify(timeframe) {
        Fragmentation::Single => vec![*timeframe],
        Fragmentation::ByMonth => split_by_month(timeframe),
    }
}

fn split_by_month(timeframe: &TimeSpan) -> Vec<TimeSpan> {
    let end = timeframe.end_date();
    let mut current = timeframe.start_date();
    let mut fragments = Vec::new();
    while current <= end {
        let fragment_end = last_day_of_month(current).map_or(end, |last| last.min(end));
        fragments.push(timeframe.fragment(current, fragment_end));
        match fragment_end.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    fragments
}

/// Builds the ordered list of [`SubRequest`]s for the cross product of
/// `locations` and `timeframes`.
///
/// `areas[i]` is the resolved area of `locations[i]`. Every logical pair gets
/// its own [`RequestId`], shared by all of its fragments; ids start at 1 and are
/// local to this call. Pairs whose range starts after it ends are skipped.
///
/// # Examples
///
/// ```
/// use cds_request::{partition, BoundingBox, ResolvedArea, TimeSpan};
///
/// let area = ResolvedArea::from_original(BoundingBox::new(52.0, 51.0, 1.0, 0.0), 10.0, 2);
/// let span = TimeSpan::parse(&["2021-10-05", "2021-11-15"]).unwrap();
/// let sub_requests = partition(&["London".to_string()], &[span], "t2m", &[area]);
///
/// assert_eq!(sub_requests.len(), 2);
/// assert_eq!(sub_requests[0].request_id, sub_requests[1].request_id);
/// ```
pub fn partition(
    locations: &[String],
    timeframes: &[TimeSpan],
    variable_short_name: &str,
    areas: &[ResolvedArea],
) -> Vec<SubRequest> {
    if locations.len() != areas.len() {
        warn!(
            "Got {} locations but {} resolved areas; unmatched locations are skipped",
            locations.len(),
            areas.len()
        );
    }

    let mut next_id = 0u32;
    let mut sub_requests = Vec::new();
    for (location, area) in locations.iter().zip(areas) {
        for timeframe in timeframes {
            if timeframe.is_inverted() {
                warn!(
                    "Skipping '{}' for {}: start date is after end date",
                    location, timeframe
                );
                continue;
            }
            next_id += 1;
            let request_id = RequestId(next_id);
            let fragments = split_timeframe(timeframe);
            debug!(
                "Request {} ('{}', {}) split into {} fragment(s)",
                request_id,
                location,
                timeframe,
                fragments.len()
            );
            sub_requests.extend(fragments.into_iter().map(|fragment| SubRequest {
                location: location.clone(),
                original_bbox: area.original,
                adjusted_bbox: area.adjusted,
                timeframe: fragment,
                variable_short_name: variable_short_name.to_string(),
                request_id,
                data: None,
                units: None,
            }));
        }
    }
    sub_requests
}
