//! Structured output of the intent extraction step.

use crate::error::CdsRequestError;
use serde::{Deserialize, Deserializer, Serialize};

/// Slots extracted from one conversational turn, all still plain strings.
///
/// The extraction step is loose about shapes: list fields may come back as a
/// single string, flags as `"True"`/`"False"`, and unmentioned scalars as the
/// literal `"None"`. Deserialization smooths those over so the validator only
/// has to deal with missing values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    /// Whether the turn is about climate data at all.
    #[serde(alias = "request_type", deserialize_with = "optional_text")]
    pub climate_context: Option<String>,
    #[serde(alias = "location", deserialize_with = "one_or_many")]
    pub locations: Vec<String>,
    /// Flat list of date strings; consecutive pairs are start/end.
    #[serde(alias = "timeframe", deserialize_with = "one_or_many")]
    pub timeframes: Vec<String>,
    #[serde(alias = "climate_data", deserialize_with = "one_or_many")]
    pub product: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub specific_product: Vec<String>,
    #[serde(deserialize_with = "optional_text")]
    pub analysis: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    pub visualisation: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub multi_location: bool,
    #[serde(deserialize_with = "flag")]
    pub multi_time: bool,
}

impl Intent {
    /// Parses a free-form model response.
    ///
    /// Everything before the first `{` and after the last `}` is dropped and
    /// single-quoted strings are rewritten as double-quoted ones before handing
    /// the rest to `serde_json`. Apostrophes inside names ("Côte d'Ivoire")
    /// are kept.
    pub fn from_response(response: &str) -> Result<Self, CdsRequestError> {
        let cleaned = clean_json_response(response).ok_or(CdsRequestError::NoJsonObject)?;
        Ok(serde_json::from_str(&cleaned)?)
    }
}

fn clean_json_response(response: &str) -> Option<String> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(normalize_quotes(&response[start..=end]))
}

/// Turns `'...'` string literals into `"..."` ones.
///
/// A `'` inside a single-quoted string only closes it when the next
/// non-blank character ends a JSON token (or the input ends).
fn normalize_quotes(text: &str) -> String {
    #[derive(Clone, Copy)]
    enum State {
        Outside,
        Single,
        Double,
    }

    let mut out = String::with_capacity(text.len());
    let mut state = State::Outside;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match (state, c) {
            (State::Single | State::Double, '\\') => match chars.next() {
                // `\'` is not a JSON escape.
                Some('\'') => out.push('\''),
                Some(escaped) => {
                    out.push(c);
                    out.push(escaped);
                }
                None => out.push(c),
            },
            (State::Outside, '\'') => {
                out.push('"');
                state = State::Single;
            }
            (State::Outside, '"') => {
                out.push('"');
                state = State::Double;
            }
            (State::Double, '"') => {
                out.push('"');
                state = State::Outside;
            }
            (State::Single, '\'') => {
                let closes = chars
                    .clone()
                    .find(|next| !next.is_whitespace())
                    .map_or(true, |next| matches!(next, ',' | ':' | '}' | ']'));
                if closes {
                    out.push('"');
                    state = State::Outside;
                } else {
                    out.push('\'');
                }
            }
            (State::Single, '"') => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        // Nulls inside a list stay visible to the validator as placeholders.
        Some(OneOrMany::Many(values)) => values
            .into_iter()
            .map(|value| value.unwrap_or_else(|| "None".to_string()))
            .collect(),
    })
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| {
        let text = text.trim();
        !text.is_empty() && text != "None"
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Text(text)) => text.trim().eq_ignore_ascii_case("true"),
        None => false,
    })
}
