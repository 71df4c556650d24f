//! The catalog of archive variables a request can ask for.
//!
//! Each entry maps the human-facing product name chosen by the intent
//! extraction step onto the archive's variable names and the short name the
//! archive uses for the returned column.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableCategory {
    Temperature,
    Precipitation,
    Wind,
}

impl VariableCategory {
    pub const ALL: [VariableCategory; 3] = [
        VariableCategory::Temperature,
        VariableCategory::Precipitation,
        VariableCategory::Wind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariableCategory::Temperature => "Temperature",
            VariableCategory::Precipitation => "Precipitation",
            VariableCategory::Wind => "Wind",
        }
    }
}

impl fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown variable category '{}'", wanted))
    }
}

/// A single product offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableSpec {
    /// Name the user (and the intent extraction step) refers to.
    pub name: &'static str,
    pub category: VariableCategory,
    /// Variable names to put in the archive request.
    pub archive_variables: &'static [&'static str],
    /// Short name of the column the processed data ends up in.
    pub short_name: &'static str,
    /// Units of the values as delivered by the archive.
    pub units: &'static str,
    /// Colour map used by downstream rendering.
    pub cmap: &'static str,
}

pub const VARIABLE_CATALOG: &[VariableSpec] = &[
    VariableSpec {
        name: "2m temperature",
        category: VariableCategory::Temperature,
        archive_variables: &["2m_temperature"],
        short_name: "t2m",
        units: "K",
        cmap: "coolwarm",
    },
    VariableSpec {
        name: "Skin temperature",
        category: VariableCategory::Temperature,
        archive_variables: &["skin_temperature"],
        short_name: "skt",
        units: "K",
        cmap: "coolwarm",
    },
    VariableSpec {
        name: "Total precipitation",
        category: VariableCategory::Precipitation,
        archive_variables: &["total_precipitation"],
        short_name: "tp",
        units: "m",
        cmap: "Blues",
    },
    VariableSpec {
        name: "Evaporation",
        category: VariableCategory::Precipitation,
        archive_variables: &["evaporation"],
        short_name: "e",
        units: "m of water equivalent",
        cmap: "YlGnBu",
    },
    VariableSpec {
        name: "10m wind speed",
        category: VariableCategory::Wind,
        archive_variables: &["10m_u_component_of_wind", "10m_v_component_of_wind"],
        short_name: "w10",
        units: "m s**-1",
        cmap: "viridis",
    },
];

/// Looks up a product by category and (case-insensitive) name.
pub fn find_variable(category: VariableCategory, name: &str) -> Option<&'static VariableSpec> {
    let wanted = name.trim();
    VARIABLE_CATALOG
        .iter()
        .find(|spec| spec.category == category && spec.name.eq_ignore_ascii_case(wanted))
}

pub fn variable_by_short_name(short_name: &str) -> Option<&'static VariableSpec> {
    VARIABLE_CATALOG
        .iter()
        .find(|spec| spec.short_name == short_name)
}

/// Product names available in one category, in catalog order.
pub fn variable_names(category: VariableCategory) -> Vec<&'static str> {
    VARIABLE_CATALOG
        .iter()
        .filter(|spec| spec.category == category)
        .map(|spec| spec.name)
        .collect()
}
