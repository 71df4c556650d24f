//! Field-level validity checking of a [`ClimateRequest`].
//!
//! The fields a request must carry are listed once in [`REQUEST_SCHEMA`].
//! Each descriptor knows how to read its field, whether the field is needed for
//! the request's analysis mode, how to check a single value and how to copy the
//! field over from another request. Validation and history repair both walk
//! this table instead of hard-coding field names.

use crate::request::climate_request::ClimateRequest;
use crate::types::analysis_mode::AnalysisMode;
use log::info;

/// A field's current value as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Scalar(Option<&'a str>),
    /// Every element is checked; an empty sequence counts as missing.
    Sequence(&'a [String]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Requirement {
    Required,
    Optional,
    /// Required only in the listed analysis modes, or when the mode is unknown.
    RequiredFor(&'static [AnalysisMode]),
}

impl Requirement {
    pub fn applies_to(&self, mode: Option<AnalysisMode>) -> bool {
        match self {
            Requirement::Required => true,
            Requirement::Optional => false,
            Requirement::RequiredFor(modes) => mode.map_or(true, |mode| modes.contains(&mode)),
        }
    }
}

pub struct FieldDescriptor {
    pub name: &'static str,
    pub requirement: Requirement,
    pub read: fn(&ClimateRequest) -> FieldValue<'_>,
    pub check: fn(&str) -> bool,
    /// Copies this field (and whatever travels with it) from `source` into `target`.
    pub transfer: fn(&mut ClimateRequest, &ClimateRequest),
}

impl FieldDescriptor {
    /// Whether the field holds a usable value.
    pub fn is_satisfied_by(&self, request: &ClimateRequest) -> bool {
        match (self.read)(request) {
            FieldValue::Scalar(value) => value.is_some_and(self.check),
            FieldValue::Sequence(values) => {
                !values.is_empty() && values.iter().all(|value| (self.check)(value))
            }
        }
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("requirement", &self.requirement)
            .finish()
    }
}

/// Placeholder the intent extraction step emits for "not mentioned".
pub const MISSING_PLACEHOLDER: &str = "None";

/// Not empty and not the `"None"` placeholder.
pub fn is_present(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != MISSING_PLACEHOLDER
}

fn is_analysis_mode(value: &str) -> bool {
    is_present(value) && value.parse::<AnalysisMode>().is_ok()
}

fn read_type(request: &ClimateRequest) -> FieldValue<'_> {
    FieldValue::Scalar(request.request_type.as_deref())
}

fn read_locations(request: &ClimateRequest) -> FieldValue<'_> {
    FieldValue::Sequence(&request.request_locations)
}

fn read_timeframes(request: &ClimateRequest) -> FieldValue<'_> {
    FieldValue::Sequence(&request.request_timeframes)
}

fn read_product(request: &ClimateRequest) -> FieldValue<'_> {
    FieldValue::Sequence(&request.request_product)
}

fn read_specific_product(request: &ClimateRequest) -> FieldValue<'_> {
    FieldValue::Sequence(&request.request_specific_product)
}

fn read_analysis(request: &ClimateRequest) -> FieldValue<'_> {
    FieldValue::Scalar(request.request_analysis.as_deref())
}

fn read_visualisation(request: &ClimateRequest) -> FieldValue<'_> {
    FieldValue::Scalar(request.request_visualisation.as_deref())
}

fn transfer_type(target: &mut ClimateRequest, source: &ClimateRequest) {
    target.request_type = source.request_type.clone();
}

fn transfer_locations(target: &mut ClimateRequest, source: &ClimateRequest) {
    target.request_locations = source.request_locations.clone();
    target.multi_location = source.multi_location;
}

fn transfer_timeframes(target: &mut ClimateRequest, source: &ClimateRequest) {
    target.request_timeframes = source.request_timeframes.clone();
    target.multi_time = source.multi_time;
}

fn transfer_product(target: &mut ClimateRequest, source: &ClimateRequest) {
    target.request_product = source.request_product.clone();
}

fn transfer_specific_product(target: &mut ClimateRequest, source: &ClimateRequest) {
    target.request_specific_product = source.request_specific_product.clone();
}

fn transfer_analysis(target: &mut ClimateRequest, source: &ClimateRequest) {
    target.request_analysis = source.request_analysis.clone();
}

fn transfer_visualisation(target: &mut ClimateRequest, source: &ClimateRequest) {
    target.request_visualisation = source.request_visualisation.clone();
}

/// Every checked field of a [`ClimateRequest`], in reporting order.
pub const REQUEST_SCHEMA: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "request_type",
        requirement: Requirement::Required,
        read: read_type,
        check: is_present,
        transfer: transfer_type,
    },
    FieldDescriptor {
        name: "request_locations",
        requirement: Requirement::Required,
        read: read_locations,
        check: is_present,
        transfer: transfer_locations,
    },
    FieldDescriptor {
        name: "request_timeframes",
        requirement: Requirement::Required,
        read: read_timeframes,
        check: is_present,
        transfer: transfer_timeframes,
    },
    FieldDescriptor {
        name: "request_product",
        requirement: Requirement::Required,
        read: read_product,
        check: is_present,
        transfer: transfer_product,
    },
    FieldDescriptor {
        name: "request_specific_product",
        requirement: Requirement::Required,
        read: read_specific_product,
        check: is_present,
        transfer: transfer_specific_product,
    },
    FieldDescriptor {
        name: "request_analysis",
        requirement: Requirement::Required,
        read: read_analysis,
        check: is_analysis_mode,
        transfer: transfer_analysis,
    },
    // Forecasts and event detection pick their own chart.
    FieldDescriptor {
        name: "request_visualisation",
        requirement: Requirement::RequiredFor(&[
            AnalysisMode::BasicAnalysis,
            AnalysisMode::Comparison,
        ]),
        read: read_visualisation,
        check: is_present,
        transfer: transfer_visualisation,
    },
];

pub fn field_descriptor(name: &str) -> Option<&'static FieldDescriptor> {
    REQUEST_SCHEMA.iter().find(|descriptor| descriptor.name == name)
}

/// Result of checking a request against [`REQUEST_SCHEMA`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub valid: bool,
    /// Names of the fields that failed, in schema order.
    pub errors: Vec<String>,
}

/// Checks every field the request's analysis mode requires.
///
/// `errors` is empty exactly when `valid` is true.
pub fn validate(request: &ClimateRequest) -> ValidationReport {
    let mode = request.analysis_mode();
    let errors: Vec<String> = REQUEST_SCHEMA
        .iter()
        .filter(|descriptor| descriptor.requirement.applies_to(mode))
        .filter(|descriptor| !descriptor.is_satisfied_by(request))
        .map(|descriptor| {
            info!("Request field '{}' is missing or invalid", descriptor.name);
            descriptor.name.to_string()
        })
        .collect();
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_request() -> ClimateRequest {
        ClimateRequest {
            request_type: Some("True".to_string()),
            request_locations: vec!["Rome".to_string()],
            request_timeframes: vec!["01/01/2015".to_string(), "31/12/2020".to_string()],
            request_product: vec!["Temperature".to_string()],
            request_specific_product: vec!["2m temperature".to_string()],
            request_analysis: Some("basic_analysis".to_string()),
            request_visualisation: Some("line_chart".to_string()),
            ..ClimateRequest::default()
        }
    }

    #[test]
    fn test_placeholder_location_is_reported() {
        let mut request = complete_request();
        request.request_locations = vec!["None".to_string()];
        let report = validate(&request);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["request_locations".to_string()]);
    }

    #[test]
    fn test_complete_request_is_valid() {
        let report = validate(&complete_request());
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_every_sequence_element_is_checked() {
        let mut request = complete_request();
        request.request_locations = vec!["Rome".to_string(), " ".to_string()];
        assert_eq!(validate(&request).errors, vec!["request_locations".to_string()]);
    }

    #[test]
    fn test_empty_sequence_counts_as_missing() {
        let mut request = complete_request();
        request.request_timeframes.clear();
        assert_eq!(validate(&request).errors, vec!["request_timeframes".to_string()]);
    }

    #[test]
    fn test_errors_follow_schema_order() {
        let request = ClimateRequest {
            request_locations: vec!["Rome".to_string()],
            ..ClimateRequest::default()
        };
        let report = validate(&request);
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "request_type",
                "request_timeframes",
                "request_product",
                "request_specific_product",
                "request_analysis",
                "request_visualisation",
            ]
        );
    }

    #[test]
    fn test_visualisation_depends_on_mode() {
        let mut request = complete_request();
        request.request_visualisation = None;
        assert_eq!(validate(&request).errors, vec!["request_visualisation".to_string()]);

        request.request_analysis = Some("predictions".to_string());
        assert!(validate(&request).valid);
    }

    #[test]
    fn test_unknown_analysis_mode_is_invalid() {
        let mut request = complete_request();
        request.request_analysis = Some("vibes".to_string());
        let report = validate(&request);
        assert!(report.errors.contains(&"request_analysis".to_string()));
    }

    #[test]
    fn test_is_present() {
        assert!(is_present("London"));
        assert!(!is_present("None"));
        assert!(!is_present(""));
        assert!(!is_present("   "));
    }

    #[test]
    fn test_transfer_through_descriptor() {
        let mut target = ClimateRequest::default();
        let source = ClimateRequest {
            request_locations: vec!["Rome".to_string(), "London".to_string()],
            multi_location: true,
            ..ClimateRequest::default()
        };
        let descriptor = field_descriptor("request_locations").unwrap();
        (descriptor.transfer)(&mut target, &source);
        assert_eq!(target.request_locations, source.request_locations);
        assert!(target.multi_location);
        assert!(field_descriptor("request_valid").is_none());
    }
}
