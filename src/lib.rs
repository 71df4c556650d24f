mod aggregate;
mod config;
mod engine;
mod error;
mod geocoding;
mod partition;
mod post_process;
mod request;
mod retrieval;
mod types;
mod utils;

pub use config::*;
pub use engine::RequestEngine;
pub use error::CdsRequestError;

pub use aggregate::aggregator::{combine, combine_each, combine_group, group_by_request_id};
pub use aggregate::error::MergeError;

pub use geocoding::error::GeocodeError;
pub use geocoding::geocoder::{Geocoder, NominatimGeocoder};
pub use geocoding::resolver::{BoundingBoxResolver, GeocodeCache};

pub use partition::partitioner::{classify, partition, split_timeframe, Fragmentation, FULL_YEAR_DAYS};
pub use partition::selection::ArchiveSelection;

pub use post_process::units::{finalize, finalize_one, UnitRule};
pub use post_process::validation::{
    field_descriptor, is_present, validate, FieldDescriptor, FieldValue, Requirement,
    ValidationReport, REQUEST_SCHEMA,
};

pub use request::climate_request::ClimateRequest;
pub use request::history::RequestHistory;
pub use request::intent::Intent;

pub use retrieval::error::RetrievalError;
pub use retrieval::pipeline::LogicalOutcome;
pub use retrieval::retriever::ArchiveRetriever;

pub use types::analysis_mode::AnalysisMode;
pub use types::bounding_box::{
    AdjustedBoundingBox, BoundingBox, ResolvedArea, DEFAULT_COORDINATE_PRECISION,
};
pub use types::sub_request::{RequestId, SubRequest};
pub use types::time_span::TimeSpan;
pub use types::variable::*;

pub use types::traits::any::any_date::AnyDate;
pub use types::traits::types::{Month, StartEndDate, Year};
