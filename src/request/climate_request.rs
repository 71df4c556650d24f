//! The logical request built from one conversational turn.

use crate::error::CdsRequestError;
use crate::post_process::validation::{validate, ValidationReport};
use crate::request::intent::Intent;
use crate::types::analysis_mode::AnalysisMode;
use crate::types::sub_request::SubRequest;
use crate::types::time_span::TimeSpan;
use crate::types::variable::{find_variable, variable_names, VariableCategory, VariableSpec};
use log::{debug, info};

/// A user's climate-data query and everything derived from it along the pipeline.
///
/// The `request_*` fields hold the raw slots from the intent extraction step
/// and are the ones checked by
/// [`REQUEST_SCHEMA`](crate::post_process::validation::REQUEST_SCHEMA). The rest
/// is filled in stages: [`process`](Self::process) resolves the variable and
/// parses the timeframes, decomposition fills `collected_sub_requests`.
#[derive(Debug, Clone, Default)]
pub struct ClimateRequest {
    pub request_type: Option<String>,
    pub request_locations: Vec<String>,
    pub request_timeframes: Vec<String>,
    /// Variable category, e.g. `["Temperature"]`.
    pub request_product: Vec<String>,
    /// Product within the category, e.g. `["2m temperature"]`.
    pub request_specific_product: Vec<String>,
    pub request_analysis: Option<String>,
    pub request_visualisation: Option<String>,
    pub multi_location: bool,
    pub multi_time: bool,

    pub request_valid: bool,
    /// Names of the fields that failed validation. Non-empty exactly when `request_valid` is false.
    pub errors: Vec<String>,

    pub variable: Option<&'static VariableSpec>,
    pub timeframes: Vec<TimeSpan>,
    pub collected_sub_requests: Vec<SubRequest>,
}

impl From<Intent> for ClimateRequest {
    fn from(intent: Intent) -> Self {
        Self {
            request_type: intent.climate_context,
            request_locations: intent.locations,
            request_timeframes: intent.timeframes,
            request_product: intent.product,
            request_specific_product: intent.specific_product,
            request_analysis: intent.analysis,
            request_visualisation: intent.visualisation,
            multi_location: intent.multi_location,
            multi_time: intent.multi_time,
            ..Self::default()
        }
    }
}

impl ClimateRequest {
    /// `None` until the analysis slot holds a known mode.
    pub fn analysis_mode(&self) -> Option<AnalysisMode> {
        self.request_analysis.as_deref()?.parse().ok()
    }

    /// Whether the turn had nothing to do with climate data.
    pub fn is_off_topic(&self) -> bool {
        self.request_type
            .as_deref()
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("false"))
    }

    /// Re-checks the `request_*` fields and records the outcome on the request.
    pub fn validate(&mut self) -> bool {
        let ValidationReport { valid, errors } = validate(self);
        self.request_valid = valid;
        self.errors = errors;
        valid
    }

    /// Validates the request and, when valid, resolves the variable and parses
    /// the timeframes.
    ///
    /// An invalid request is not an error: `request_valid` and `errors` tell
    /// the caller what to ask the user for.
    ///
    /// # Errors
    ///
    /// [`CdsRequestError::UnknownVariable`] when the category or product is not
    /// in the catalog, [`CdsRequestError::DateFormat`] or
    /// [`CdsRequestError::UnpairedDates`] for bad timeframes.
    pub fn process(&mut self) -> Result<(), CdsRequestError> {
        if !self.validate() {
            info!("Request is missing: {}", self.errors.join(", "));
            return Ok(());
        }
        self.variable = Some(self.resolve_variable()?);
        self.timeframes = TimeSpan::parse_pairs(&self.request_timeframes)?;
        debug!(
            "Request resolved to {:?} over {} timeframe(s)",
            self.variable.map(|spec| spec.short_name),
            self.timeframes.len()
        );
        Ok(())
    }

    fn resolve_variable(&self) -> Result<&'static VariableSpec, CdsRequestError> {
        let category_name = self.request_product.first().map_or("", String::as_str);
        let product_name = self.request_specific_product.first().map_or("", String::as_str);
        let unknown = || CdsRequestError::UnknownVariable {
            category: category_name.to_string(),
            name: product_name.to_string(),
        };
        let category: VariableCategory = category_name.parse().map_err(|_| unknown())?;
        find_variable(category, product_name).ok_or_else(unknown)
    }

    pub fn variable_short_name(&self) -> Option<&'static str> {
        self.variable.map(|spec| spec.short_name)
    }

    /// Locations that take part in decomposition: all of them in multi-location
    /// mode, otherwise only the first.
    pub fn selected_locations(&self) -> &[String] {
        select(&self.request_locations, self.multi_location)
    }

    /// Parsed timeframes that take part in decomposition: all of them in
    /// multi-time mode, otherwise only the first.
    pub fn selected_timeframes(&self) -> &[TimeSpan] {
        select(&self.timeframes, self.multi_time)
    }

    /// Instruction listing the products of the requested category, used to
    /// ask the intent extraction step for a specific product.
    pub fn product_instruction(&self) -> Option<String> {
        let category: VariableCategory = self.request_product.first()?.parse().ok()?;
        Some(format!("'{}':\n- {:?}", category, variable_names(category)))
    }

    /// One-line recap of a valid request for the user to confirm.
    pub fn summary(&self) -> String {
        let periods: Vec<String> = self
            .timeframes
            .iter()
            .map(|span| format!("{} to {}", span.start_date(), span.end_date()))
            .collect();
        let analysis = match self.analysis_mode() {
            Some(AnalysisMode::BasicAnalysis) => "Basic Analysis",
            Some(AnalysisMode::Comparison) => "Comparison",
            Some(AnalysisMode::Predictions) => "Prediction",
            Some(AnalysisMode::SignificantEventDetection) => "Significant Event Detection",
            None => "Unspecified Analysis",
        };
        format!(
            "Searching {} for {} covering the {} {}, analysis type: {}.",
            self.variable.map_or("an unknown variable", |spec| spec.name),
            self.request_locations.join(", "),
            if periods.len() == 1 { "period" } else { "periods" },
            periods.join(" and "),
            analysis
        )
    }

    /// Follow-up question listing the missing fields of an invalid request.
    pub fn missing_info_message(&self) -> String {
        let missing: Vec<String> = self
            .errors
            .iter()
            .map(|field| {
                let label = field.trim_start_matches("request_").replace('_', " ");
                let mut chars = label.chars();
                match chars.next() {
                    Some(first) => format!("- {}{}", first.to_uppercase(), chars.as_str()),
                    None => "- ".to_string(),
                }
            })
            .collect();
        format!(
            "Some required information is missing:\n\n{}\n\nCould you please provide it?",
            missing.join("\n")
        )
    }
}

fn select<T>(items: &[T], all: bool) -> &[T] {
    if all {
        items
    } else {
        &items[..items.len().min(1)]
    }
}
