//! Reassembling the fragments of each logical request into one continuous
//! series.

use crate::aggregate::error::MergeError;
use crate::types::sub_request::{RequestId, SubRequest};
use log::{debug, warn};
use polars::prelude::{concat, DataFrame, IntoLazy, LazyFrame, UnionArgs};
use std::collections::HashMap;

/// Groups sub-requests by [`RequestId`].
///
/// Groups come out in the order their id was first seen; members keep their
/// relative input order.
pub fn group_by_request_id(sub_requests: Vec<SubRequest>) -> Vec<(RequestId, Vec<SubRequest>)> {
    let mut positions: HashMap<RequestId, usize> = HashMap::new();
    let mut groups: Vec<(RequestId, Vec<SubRequest>)> = Vec::new();
    for sub_request in sub_requests {
        let id = sub_request.request_id;
        match positions.get(&id) {
            Some(&index) => groups[index].1.push(sub_request),
            None => {
                positions.insert(id, groups.len());
                groups.push((id, vec![sub_request]));
            }
        }
    }
    groups
}

/// Merges the fragments of one logical request.
///
/// Every fragment must carry non-empty data. A lone fragment is returned as
/// is; otherwise the frames are stacked in the given (chronological) order and
/// the merged sub-request spans from the first fragment's start to the last
/// fragment's end, taking location, areas and variable from the first.
///
/// # Errors
///
/// [`MergeError::EmptyGroup`] for no fragments, [`MergeError::MissingData`] or
/// [`MergeError::EmptyFragment`] for a fragment whose retrieval did not deliver,
/// [`MergeError::Concat`] when the frames cannot be stacked.
pub fn combine_group(
    request_id: RequestId,
    mut fragments: Vec<SubRequest>,
) -> Result<SubRequest, MergeError> {
    for fragment in &fragments {
        check_fragment(fragment)?;
    }
    if fragments.len() == 1 {
        return fragments.pop().ok_or(MergeError::EmptyGroup(request_id));
    }
    let Some(first) = fragments.first() else {
        return Err(MergeError::EmptyGroup(request_id));
    };
    if fragments.iter().any(|fragment| !first.same_target(fragment)) {
        warn!(
            "Fragments of request {} disagree on location, area or variable; keeping the first",
            request_id
        );
    }

    let frames: Vec<LazyFrame> = fragments
        .iter()
        .filter_map(|fragment| fragment.data.clone())
        .map(DataFrame::lazy)
        .collect();
    let merged = concat(frames, UnionArgs::default())
        .and_then(LazyFrame::collect)
        .map_err(|source| MergeError::Concat { request_id, source })?;

    let mut fragments = fragments.into_iter();
    let Some(mut combined) = fragments.next() else {
        return Err(MergeError::EmptyGroup(request_id));
    };
    let end = fragments
        .last()
        .map_or(combined.timeframe.end_date(), |last| last.timeframe.end_date());
    debug!(
        "Merged request {} into {} rows from {} to {}",
        request_id,
        merged.height(),
        combined.timeframe.start_date(),
        end
    );
    combined.timeframe = combined
        .timeframe
        .fragment(combined.timeframe.start_date(), end);
    combined.data = Some(merged);
    Ok(combined)
}

/// Merges every group, stopping at the first group that fails.
pub fn combine(sub_requests: Vec<SubRequest>) -> Result<Vec<SubRequest>, MergeError> {
    group_by_request_id(sub_requests)
        .into_iter()
        .map(|(id, fragments)| combine_group(id, fragments))
        .collect()
}

/// Merges every group independently, so one failed group leaves its siblings intact.
pub fn combine_each(
    sub_requests: Vec<SubRequest>,
) -> Vec<(RequestId, Result<SubRequest, MergeError>)> {
    group_by_request_id(sub_requests)
        .into_iter()
        .map(|(id, fragments)| (id, combine_group(id, fragments)))
        .collect()
}

fn check_fragment(fragment: &SubRequest) -> Result<(), MergeError> {
    match &fragment.data {
        None => Err(MergeError::MissingData {
            request_id: fragment.request_id,
            location: fragment.location.clone(),
            start: fragment.timeframe.start_date(),
            end: fragment.timeframe.end_date(),
        }),
        Some(frame) if frame.height() == 0 => Err(MergeError::EmptyFragment {
            request_id: fragment.request_id,
            location: fragment.location.clone(),
            start: fragment.timeframe.start_date(),
            end: fragment.timeframe.end_date(),
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partitioner::partition;
    use crate::types::bounding_box::{BoundingBox, ResolvedArea};
    use crate::types::time_span::TimeSpan;
    use chrono::{Duration, NaiveDate};
    use polars::prelude::*;

    fn area() -> ResolvedArea {
        ResolvedArea::from_original(BoundingBox::new(53.6, 53.4, 10.2, 9.8), 10.0, 2)
    }

    /// One row per day of the fragment, valued by day offset from `base`.
    fn frame_for(sub_request: &SubRequest, base: NaiveDate) -> DataFrame {
        let start = sub_request.timeframe.start_date();
        let days = sub_request.timeframe.total_days();
        let dates: Vec<NaiveDate> = (0..days).map(|i| start + Duration::days(i)).collect();
        let values: Vec<f64> = dates
            .iter()
            .map(|d| (*d - base).num_days() as f64)
            .collect();
        df!("time" => dates, "t2m" => values).unwrap()
    }

    fn filled(sub_requests: Vec<SubRequest>, base: NaiveDate) -> Vec<SubRequest> {
        sub_requests
            .into_iter()
            .map(|s| {
                let frame = frame_for(&s, base);
                s.with_data(frame)
            })
            .collect()
    }

    fn t2m_values(frame: &DataFrame) -> Vec<f64> {
        frame
            .column("t2m")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_month_fragments_merge_into_continuous_series() -> Result<(), Box<dyn std::error::Error>> {
        let span = TimeSpan::parse(&["2021-10-05", "2021-11-15"])?;
        let base = span.start_date();
        let subs = filled(partition(&["Hamburg".to_string()], &[span], "t2m", &[area()]), base);
        assert_eq!(subs.len(), 2);

        let merged = combine(subs)?;
        assert_eq!(merged.len(), 1);
        let merged = &merged[0];
        assert_eq!(merged.timeframe, span);
        assert_eq!(merged.request_id, RequestId(1));

        let frame = merged.data.as_ref().unwrap();
        assert_eq!(frame.height(), 42);
        let values = t2m_values(frame);
        assert!(values.windows(2).all(|w| w[1] == w[0] + 1.0), "time order must be kept");
        assert_eq!(values[0], 0.0);
        Ok(())
    }

    #[test]
    fn test_single_member_group_is_unchanged() -> Result<(), Box<dyn std::error::Error>> {
        let span = TimeSpan::parse(&["2020-01-01", "2020-12-31"])?;
        let subs = filled(
            partition(&["Hamburg".to_string()], &[span], "t2m", &[area()]),
            span.start_date(),
        );
        let input = subs[0].clone();

        let merged = combine(subs)?;
        assert_eq!(merged.len(), 1);
        let output = &merged[0];
        assert_eq!(output.location, input.location);
        assert_eq!(output.timeframe, input.timeframe);
        assert_eq!(output.request_id, input.request_id);
        assert!(output.same_target(&input));
        assert!(output
            .data
            .as_ref()
            .unwrap()
            .equals(input.data.as_ref().unwrap()));
        Ok(())
    }

    #[test]
    fn test_missing_fragment_data_fails_the_group() -> Result<(), Box<dyn std::error::Error>> {
        let span = TimeSpan::parse(&["2021-10-05", "2021-11-15"])?;
        let mut subs = filled(
            partition(&["Hamburg".to_string()], &[span], "t2m", &[area()]),
            span.start_date(),
        );
        subs[1].data = None;

        let err = combine(subs).unwrap_err();
        assert!(matches!(
            err,
            MergeError::MissingData { request_id: RequestId(1), start, .. }
                if start == NaiveDate::from_ymd_opt(2021, 11, 1).unwrap()
        ));
        Ok(())
    }

    #[test]
    fn test_empty_fragment_fails_the_group() -> Result<(), Box<dyn std::error::Error>> {
        let span = TimeSpan::parse(&["2021-10-05", "2021-11-15"])?;
        let mut subs = partition(&["Hamburg".to_string()], &[span], "t2m", &[area()]);
        let first = frame_for(&subs[0], span.start_date());
        subs[0].data = Some(first);
        subs[1].data = Some(DataFrame::empty());

        assert!(matches!(
            combine(subs),
            Err(MergeError::EmptyFragment { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_empty_group_is_an_error() {
        assert!(matches!(
            combine_group(RequestId(7), vec![]),
            Err(MergeError::EmptyGroup(RequestId(7)))
        ));
    }

    #[test]
    fn test_groups_keep_first_seen_order() -> Result<(), Box<dyn std::error::Error>> {
        let spans = TimeSpan::parse_pairs(&["2021-10-05", "2021-11-15", "2019-02-03", "2019-03-04"])?;
        let base = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let mut subs = filled(
            partition(&["Hamburg".to_string()], &spans, "t2m", &[area()]),
            base,
        );
        // Interleave: [1a, 2a, 1b, 2b]
        let second_b = subs.remove(3);
        let first_b = subs.remove(1);
        subs.insert(2, first_b);
        subs.push(second_b);

        let groups = group_by_request_id(subs.clone());
        let ids: Vec<RequestId> = groups.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![RequestId(1), RequestId(2)]);
        assert!(groups[0].1[0].timeframe.start_date() < groups[0].1[1].timeframe.start_date());

        let merged = combine(subs)?;
        assert_eq!(merged[0].timeframe, spans[0]);
        assert_eq!(merged[1].timeframe, spans[1]);
        Ok(())
    }

    #[test]
    fn test_combine_each_isolates_failures() -> Result<(), Box<dyn std::error::Error>> {
        let spans = TimeSpan::parse_pairs(&["2021-10-05", "2021-11-15", "2019-02-03", "2019-03-04"])?;
        let base = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let mut subs = filled(
            partition(&["Hamburg".to_string()], &spans, "t2m", &[area()]),
            base,
        );
        subs[0].data = None;

        let results = combine_each(subs);
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_err());
        let second = results[1].1.as_ref().map_err(|e| e.to_string())?;
        assert_eq!(second.data.as_ref().unwrap().height(), 30);
        Ok(())
    }
}
