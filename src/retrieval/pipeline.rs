//! Fan-out of sub-requests to the archive and fan-in per logical request.
//!
//! Every sub-request is retrieved as its own future. The fragments of one
//! logical request are joined before that request is merged and finalised, so
//! a slow or failed request never holds up or spoils its siblings.

use crate::aggregate::aggregator::{combine_group, group_by_request_id};
use crate::config::EngineConfig;
use crate::error::CdsRequestError;
use crate::partition::selection::ArchiveSelection;
use crate::post_process::units::finalize_one;
use crate::retrieval::error::RetrievalError;
use crate::retrieval::retriever::ArchiveRetriever;
use crate::types::sub_request::{RequestId, SubRequest};
use crate::types::time_span::TimeSpan;
use futures_util::future::join_all;
use log::{debug, error, info};

/// Final state of one logical (location, timeframe) request.
#[derive(Debug)]
pub struct LogicalOutcome {
    pub request_id: RequestId,
    pub location: String,
    /// The whole logical range, first fragment start to last fragment end.
    pub timeframe: TimeSpan,
    pub variable_short_name: String,
    /// The merged, unit-converted sub-request, or why there is none.
    pub result: Result<SubRequest, CdsRequestError>,
}

impl LogicalOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Retrieves, merges and finalises every logical request in `sub_requests`.
///
/// Returns one outcome per distinct [`RequestId`], in first-seen order.
pub async fn run<R: ArchiveRetriever>(
    retriever: &R,
    config: &EngineConfig,
    sub_requests: Vec<SubRequest>,
) -> Vec<LogicalOutcome> {
    let groups = group_by_request_id(sub_requests);
    info!("Retrieving {} logical request(s)", groups.len());
    let outcomes = join_all(
        groups
            .into_iter()
            .filter_map(|(id, fragments)| process_group(retriever, config, id, fragments)),
    )
    .await;

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        info!("{} of {} logical request(s) failed", failed, outcomes.len());
    }
    outcomes
}

fn process_group<'a, R: ArchiveRetriever>(
    retriever: &'a R,
    config: &'a EngineConfig,
    request_id: RequestId,
    fragments: Vec<SubRequest>,
) -> Option<impl std::future::Future<Output = LogicalOutcome> + 'a> {
    let first = fragments.first()?;
    let last = fragments.last()?;
    let location = first.location.clone();
    let variable_short_name = first.variable_short_name.clone();
    let timeframe = first
        .timeframe
        .fragment(first.timeframe.start_date(), last.timeframe.end_date());

    Some(async move {
        let result = retrieve_group(retriever, config, fragments)
            .await
            .and_then(|filled| combine_group(request_id, filled).map_err(CdsRequestError::from))
            .and_then(|mut merged| {
                finalize_one(&mut merged, &variable_short_name)?;
                Ok(merged)
            });
        if let Err(e) = &result {
            error!(
                "Request {} for '{}' {} ({}) failed: {}",
                request_id, location, timeframe, variable_short_name, e
            );
        }
        LogicalOutcome {
            request_id,
            location,
            timeframe,
            variable_short_name,
            result,
        }
    })
}

/// Retrieves all fragments of one group concurrently and waits for every one.
async fn retrieve_group<R: ArchiveRetriever>(
    retriever: &R,
    config: &EngineConfig,
    fragments: Vec<SubRequest>,
) -> Result<Vec<SubRequest>, CdsRequestError> {
    let selections = fragments
        .iter()
        .map(|fragment| ArchiveSelection::for_sub_request(fragment, config))
        .collect::<Result<Vec<_>, _>>()?;

    let results = join_all(
        fragments
            .into_iter()
            .zip(selections)
            .map(|(fragment, selection)| retrieve_one(retriever, config, selection, fragment)),
    )
    .await;
    results.into_iter().collect()
}

async fn retrieve_one<R: ArchiveRetriever>(
    retriever: &R,
    config: &EngineConfig,
    selection: ArchiveSelection,
    fragment: SubRequest,
) -> Result<SubRequest, CdsRequestError> {
    debug!("Retrieving {}", fragment);
    let frame = tokio::time::timeout(
        config.retrieval_timeout,
        retriever.retrieve(&selection, &fragment),
    )
    .await
    .map_err(|_| RetrievalError::Timeout {
        seconds: config.retrieval_timeout.as_secs(),
    })??;
    debug!("Retrieved {} rows for {}", frame.height(), fragment);
    Ok(fragment.with_data(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partitioner::partition;
    use crate::types::bounding_box::{BoundingBox, ResolvedArea};
    use chrono::{Duration, NaiveDate};
    use polars::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    /// Serves one row per day with a constant Kelvin value; fails for one location.
    struct FakeArchive {
        failing_location: Option<&'static str>,
        stall: bool,
        calls: AtomicUsize,
    }

    impl FakeArchive {
        fn new() -> Self {
            Self {
                failing_location: None,
                stall: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ArchiveRetriever for FakeArchive {
        async fn retrieve(
            &self,
            selection: &ArchiveSelection,
            sub_request: &SubRequest,
        ) -> Result<DataFrame, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.stall {
                tokio::time::sleep(StdDuration::from_secs(5)).await;
            }
            if self.failing_location == Some(sub_request.location.as_str()) {
                return Err(RetrievalError::Archive {
                    message: format!("no data for {:?}", selection.area),
                });
            }
            let start = sub_request.timeframe.start_date();
            let dates: Vec<NaiveDate> = (0..sub_request.timeframe.total_days())
                .map(|i| start + Duration::days(i))
                .collect();
            let values = vec![283.15; dates.len()];
            Ok(df!("time" => dates, sub_request.variable_short_name.as_str() => values).unwrap())
        }
    }

    fn area() -> ResolvedArea {
        ResolvedArea::from_original(BoundingBox::new(51.7, 51.3, 0.3, -0.5), 10.0, 2)
    }

    fn sub_requests() -> Vec<SubRequest> {
        let locations = vec!["London".to_string(), "Rome".to_string()];
        let spans = TimeSpan::parse_pairs(&["2021-10-05", "2021-11-15"]).unwrap();
        partition(&locations, &spans, "t2m", &[area(), area()])
    }

    #[tokio::test]
    async fn test_each_logical_request_is_merged_and_converted() {
        let archive = FakeArchive::new();
        let outcomes = run(&archive, &EngineConfig::default(), sub_requests()).await;

        assert_eq!(archive.calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].location, "London");
        assert_eq!(outcomes[1].location, "Rome");
        for outcome in &outcomes {
            let merged = outcome.result.as_ref().unwrap();
            assert_eq!(merged.timeframe, outcome.timeframe);
            assert_eq!(merged.units.as_deref(), Some("°C"));
            let frame = merged.data.as_ref().unwrap();
            assert_eq!(frame.height(), 42);
            let first = frame.column("t2m").unwrap().f64().unwrap().get(0).unwrap();
            assert!((first - 10.0).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_failure_stays_with_its_logical_request() {
        let archive = FakeArchive {
            failing_location: Some("London"),
            ..FakeArchive::new()
        };
        let outcomes = run(&archive, &EngineConfig::default(), sub_requests()).await;

        assert!(matches!(
            outcomes[0].result,
            Err(CdsRequestError::Retrieval(RetrievalError::Archive { .. }))
        ));
        assert!(outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_slow_archive_times_out() {
        let archive = FakeArchive {
            stall: true,
            ..FakeArchive::new()
        };
        let config = EngineConfig {
            retrieval_timeout: StdDuration::from_millis(20),
            ..EngineConfig::default()
        };
        let outcomes = run(&archive, &config, sub_requests()).await;
        assert!(outcomes.iter().all(|o| matches!(
            o.result,
            Err(CdsRequestError::Retrieval(RetrievalError::Timeout { .. }))
        )));
    }

    #[tokio::test]
    async fn test_unknown_variable_fails_before_retrieval() {
        let archive = FakeArchive::new();
        let subs = partition(
            &["London".to_string()],
            &[TimeSpan::parse(&["2021-10-05"]).unwrap()],
            "sd",
            &[area()],
        );
        let outcomes = run(&archive, &EngineConfig::default(), subs).await;
        assert_eq!(archive.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            outcomes[0].result,
            Err(CdsRequestError::UnsupportedVariable(_))
        ));
    }
}
