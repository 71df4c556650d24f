//! Main entry point: turning a validated [`ClimateRequest`] into archive-ready
//! sub-requests and the retrieved data back into one series per logical request.

use crate::config::EngineConfig;
use crate::error::CdsRequestError;
use crate::geocoding::geocoder::{Geocoder, NominatimGeocoder};
use crate::geocoding::resolver::{BoundingBoxResolver, GeocodeCache};
use crate::partition::partitioner::partition;
use crate::request::climate_request::ClimateRequest;
use crate::retrieval::pipeline::{self, LogicalOutcome};
use crate::retrieval::retriever::ArchiveRetriever;
use crate::types::analysis_mode::AnalysisMode;
use crate::types::bounding_box::ResolvedArea;
use crate::types::sub_request::SubRequest;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use futures_util::future::join_all;
use log::{debug, info};
use std::path::PathBuf;

/// Decomposes climate requests and reassembles what the archive returns.
///
/// Create one with [`RequestEngine::new()`] (default cache directory) or
/// [`RequestEngine::with_cache_folder()`]. Geocoding results are cached in
/// that directory across runs.
///
/// # Examples
///
/// ```rust,no_run
/// # use cds_request::{ClimateRequest, CdsRequestError, RequestEngine};
/// # async fn run() -> Result<(), CdsRequestError> {
/// let engine = RequestEngine::new().await?;
/// let mut request = ClimateRequest {
///     request_type: Some("True".to_string()),
///     request_locations: vec!["Hamburg".to_string()],
///     request_timeframes: vec!["05/10/2021".to_string(), "15/11/2021".to_string()],
///     request_product: vec!["Temperature".to_string()],
///     request_specific_product: vec!["2m temperature".to_string()],
///     request_analysis: Some("basic_analysis".to_string()),
///     request_visualisation: Some("line_chart".to_string()),
///     ..ClimateRequest::default()
/// };
/// request.process()?;
/// let sub_requests = engine.decompose().request(&mut request).call().await?;
/// assert_eq!(sub_requests.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RequestEngine<G = NominatimGeocoder> {
    resolver: BoundingBoxResolver<G>,
    config: EngineConfig,
}

impl RequestEngine<NominatimGeocoder> {
    /// Creates an engine caching geocoding results in `cache_folder`, which is
    /// created if missing.
    ///
    /// # Errors
    ///
    /// [`CdsRequestError::CacheDirCreation`] if the directory cannot be created,
    /// [`CdsRequestError::Geocode`] if the cache file cannot be read.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, CdsRequestError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| CdsRequestError::CacheDirCreation(cache_folder.clone(), e))?;
        Ok(Self::from_parts(
            BoundingBoxResolver::nominatim(&cache_folder).await?,
            EngineConfig::default(),
        ))
    }

    /// Creates an engine using the platform cache directory.
    pub async fn new() -> Result<Self, CdsRequestError> {
        let cache_folder = get_cache_dir().map_err(CdsRequestError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder).await
    }
}

impl<G: Geocoder> RequestEngine<G> {
    pub fn from_parts(resolver: BoundingBoxResolver<G>, config: EngineConfig) -> Self {
        Self {
            resolver: resolver.with_precision(config.coordinate_precision),
            config,
        }
    }

    /// An engine resolving locations with `geocoder` and an in-memory cache.
    pub fn with_geocoder(geocoder: G, config: EngineConfig) -> Self {
        Self::from_parts(
            BoundingBoxResolver::new(geocoder, GeocodeCache::in_memory()),
            config,
        )
    }

    pub fn with_config(self, config: EngineConfig) -> Self {
        Self::from_parts(self.resolver, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &BoundingBoxResolver<G> {
        &self.resolver
    }
}

#[bon]
impl<G: Geocoder> RequestEngine<G> {
    /// Resolves every location concurrently, in input order.
    ///
    /// A single unknown location fails the whole call.
    #[builder]
    pub async fn resolve_areas(
        &self,
        locations: &[String],
        min_bbox_size: Option<f64>,
    ) -> Result<Vec<ResolvedArea>, CdsRequestError> {
        let min_size = min_bbox_size.unwrap_or(self.config.min_bbox_size);
        let areas = join_all(
            locations
                .iter()
                .map(|location| self.resolver.resolve(location, min_size)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
        Ok(areas)
    }

    /// Splits a request into archive-compliant [`SubRequest`]s and stores them
    /// in `request.collected_sub_requests`.
    ///
    /// The request is processed first if that has not happened yet. Only the
    /// first location and timeframe are used unless the request's multi-location
    /// or multi-time flag is set. Forecast requests have their timeframes
    /// swapped for a training window ending at the archive cutoff.
    ///
    /// # Errors
    ///
    /// [`CdsRequestError::InvalidRequest`] when validation fails,
    /// [`CdsRequestError::Geocode`] when a location cannot be resolved, plus
    /// anything [`ClimateRequest::process`] reports.
    #[builder]
    pub async fn decompose(
        &self,
        request: &mut ClimateRequest,
        min_bbox_size: Option<f64>,
    ) -> Result<Vec<SubRequest>, CdsRequestError> {
        if request.variable.is_none() {
            request.process()?;
        }
        if !request.request_valid {
            return Err(CdsRequestError::InvalidRequest {
                missing: request.errors.clone(),
            });
        }
        let short_name = request
            .variable_short_name()
            .ok_or_else(|| CdsRequestError::InvalidRequest {
                missing: vec!["request_specific_product".to_string()],
            })?;

        if request.analysis_mode() == Some(AnalysisMode::Predictions) {
            for timeframe in &mut request.timeframes {
                timeframe.adjust_for_prediction(
                    self.config.archive_cutoff,
                    self.config.training_years,
                );
            }
        }

        let locations = request.selected_locations().to_vec();
        let timeframes = request.selected_timeframes().to_vec();
        let areas = self
            .resolve_areas()
            .locations(&locations)
            .maybe_min_bbox_size(min_bbox_size)
            .call()
            .await?;

        let sub_requests = partition(&locations, &timeframes, short_name, &areas);
        info!(
            "Decomposed {} location(s) x {} timeframe(s) of '{}' into {} sub-request(s)",
            locations.len(),
            timeframes.len(),
            short_name,
            sub_requests.len()
        );
        request.collected_sub_requests = sub_requests.clone();
        Ok(sub_requests)
    }

    /// Retrieves the given sub-requests through `retriever`, then merges and
    /// converts each logical request.
    ///
    /// Never fails as a whole: every logical request gets its own outcome.
    #[builder]
    pub async fn fetch<R: ArchiveRetriever>(
        &self,
        retriever: &R,
        sub_requests: Vec<SubRequest>,
    ) -> Vec<LogicalOutcome> {
        debug!("Fetching {} sub-request(s)", sub_requests.len());
        pipeline::run(retriever, &self.config, sub_requests).await
    }

    /// [`decompose`](Self::decompose) followed by [`fetch`](Self::fetch).
    #[builder]
    pub async fn run<R: ArchiveRetriever>(
        &self,
        request: &mut ClimateRequest,
        retriever: &R,
        min_bbox_size: Option<f64>,
    ) -> Result<Vec<LogicalOutcome>, CdsRequestError> {
        let sub_requests = self
            .decompose()
            .request(request)
            .maybe_min_bbox_size(min_bbox_size)
            .call()
            .await?;
        Ok(self
            .fetch()
            .retriever(retriever)
            .sub_requests(sub_requests)
            .call()
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::error::GeocodeError;
    use crate::partition::selection::ArchiveSelection;
    use crate::retrieval::error::RetrievalError;
    use crate::types::bounding_box::BoundingBox;
    use crate::types::sub_request::RequestId;
    use chrono::{Duration, NaiveDate};
    use polars::prelude::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct Gazetteer(HashMap<&'static str, BoundingBox>);

    impl Gazetteer {
        fn new() -> Self {
            Self(HashMap::from([
                ("rome", BoundingBox::new(42.05, 41.77, 12.66, 12.34)),
                ("london", BoundingBox::new(51.69, 51.28, 0.33, -0.51)),
            ]))
        }
    }

    impl Geocoder for Gazetteer {
        async fn geocode(&self, location: &str) -> Result<Option<BoundingBox>, GeocodeError> {
            Ok(self.0.get(location.to_lowercase().as_str()).copied())
        }
    }

    struct ConstantArchive;

    impl ArchiveRetriever for ConstantArchive {
        async fn retrieve(
            &self,
            selection: &ArchiveSelection,
            sub_request: &SubRequest,
        ) -> Result<DataFrame, RetrievalError> {
            assert_eq!(selection.area, sub_request.adjusted_bbox);
            let start = sub_request.timeframe.start_date();
            let dates: Vec<NaiveDate> = (0..sub_request.timeframe.total_days())
                .map(|i| start + Duration::days(i))
                .collect();
            let values = vec![0.001; dates.len()];
            Ok(df!("time" => dates, "tp" => values).unwrap())
        }
    }

    fn engine() -> RequestEngine<Gazetteer> {
        RequestEngine::with_geocoder(Gazetteer::new(), EngineConfig::default())
    }

    fn request() -> ClimateRequest {
        ClimateRequest {
            request_type: Some("True".to_string()),
            request_locations: vec!["Rome".to_string(), "London".to_string()],
            request_timeframes: vec![
                "05/10/2021".to_string(),
                "15/11/2021".to_string(),
                "2015-01-01".to_string(),
                "2020-12-31".to_string(),
            ],
            request_product: vec!["Precipitation".to_string()],
            request_specific_product: vec!["Total precipitation".to_string()],
            request_analysis: Some("comparison".to_string()),
            request_visualisation: Some("line_chart".to_string()),
            ..ClimateRequest::default()
        }
    }

    #[tokio::test]
    async fn test_decompose_uses_first_pair_by_default() -> Result<(), Box<dyn std::error::Error>> {
        let engine = engine();
        let mut request = request();
        let subs = engine.decompose().request(&mut request).call().await?;

        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.location == "Rome" && s.request_id == RequestId(1)));
        assert_eq!(request.collected_sub_requests.len(), 2);
        // Rome is far below 10 degrees on both axes.
        assert_eq!(subs[0].adjusted_bbox, [46.91, 7.5, 36.91, 17.5]);
        Ok(())
    }

    #[tokio::test]
    async fn test_decompose_cross_product() -> Result<(), Box<dyn std::error::Error>> {
        let engine = engine();
        let mut request = request();
        request.multi_location = true;
        request.multi_time = true;
        let subs = engine
            .decompose()
            .request(&mut request)
            .min_bbox_size(3.0)
            .call()
            .await?;

        let ids: Vec<u32> = subs.iter().map(|s| s.request_id.get()).collect();
        assert_eq!(ids, vec![1, 1, 2, 3, 3, 4]);
        let london = subs.iter().find(|s| s.location == "London").unwrap();
        // Edges are rounded to two decimals after widening.
        assert!((london.adjusted_bbox[0] - london.adjusted_bbox[2] - 3.0).abs() <= 0.011);
        Ok(())
    }

    #[tokio::test]
    async fn test_forecast_trains_on_window_before_cutoff() -> Result<(), Box<dyn std::error::Error>> {
        let engine = engine();
        let mut request = request();
        request.request_analysis = Some("predictions".to_string());
        request.request_timeframes = vec!["2026-01-01".to_string(), "2027-12-31".to_string()];
        let subs = engine.decompose().request(&mut request).call().await?;

        let span = request.timeframes[0];
        assert_eq!(span.end_date(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(span.start_date(), NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(span.prediction_horizon_years(), Some(2));
        assert_eq!(subs.len(), 1);

        // Decomposing again does not shift the window further.
        engine.decompose().request(&mut request).call().await?;
        assert_eq!(request.timeframes[0], span);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_request_is_refused() {
        let engine = engine();
        let mut request = request();
        request.request_locations = vec!["None".to_string()];
        let result = engine.decompose().request(&mut request).call().await;
        assert!(matches!(
            result,
            Err(CdsRequestError::InvalidRequest { missing }) if missing == vec!["request_locations"]
        ));
    }

    #[tokio::test]
    async fn test_unknown_location_fails_the_request() {
        let engine = engine();
        let mut request = request();
        request.request_locations = vec!["Atlantis".to_string()];
        let result = engine.decompose().request(&mut request).call().await;
        assert!(matches!(
            result,
            Err(CdsRequestError::Geocode(GeocodeError::LocationNotFound(name))) if name == "Atlantis"
        ));
    }

    #[tokio::test]
    async fn test_run_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
        let engine = engine();
        let mut request = request();
        request.multi_time = true;
        let outcomes = engine
            .run()
            .request(&mut request)
            .retriever(&ConstantArchive)
            .call()
            .await?;

        assert_eq!(outcomes.len(), 2);
        let short = outcomes[0].result.as_ref().unwrap();
        assert_eq!(short.data.as_ref().unwrap().height(), 42);
        assert_eq!(short.units.as_deref(), Some("mm"));
        let long = outcomes[1].result.as_ref().unwrap();
        assert_eq!(long.data.as_ref().unwrap().height(), 2192);
        Ok(())
    }

    #[tokio::test]
    async fn test_with_cache_folder_creates_directory() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempdir()?;
        let folder = root.path().join("engine_cache");
        let engine = RequestEngine::with_cache_folder(folder.clone()).await?;
        assert!(folder.is_dir());
        assert!(engine.resolver().cache().is_empty().await);
        assert_eq!(engine.config(), &EngineConfig::default());
        Ok(())
    }
}
