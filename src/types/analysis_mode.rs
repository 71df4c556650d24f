use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the user wants done with the retrieved series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    BasicAnalysis,
    Comparison,
    Predictions,
    SignificantEventDetection,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::BasicAnalysis => "basic_analysis",
            AnalysisMode::Comparison => "comparison",
            AnalysisMode::Predictions => "predictions",
            AnalysisMode::SignificantEventDetection => "significant_event_detection",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic_analysis" => Ok(AnalysisMode::BasicAnalysis),
            "comparison" => Ok(AnalysisMode::Comparison),
            "predictions" => Ok(AnalysisMode::Predictions),
            "significant_event_detection" => Ok(AnalysisMode::SignificantEventDetection),
            other => Err(format!("unknown analysis mode '{}'", other)),
        }
    }
}
