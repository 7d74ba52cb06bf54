use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar reading pulled out of markup.
///
/// Variant order matters for untagged decoding: integers that do not fit
/// `i64` stay exact as `Unsigned` instead of widening to `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// Field name to value mapping for one parsed unit of markup.
pub type Record = BTreeMap<String, FieldValue>;

/// What gets stored under a timestamp key.
///
/// Grid-conditions and weather produce field mappings, load/generation keeps
/// the raw response body. Anything else found in a stored document is carried
/// through as-is so a load/save cycle never drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    Fields(Record),
    Raw(String),
    Other(serde_json::Value),
}

impl From<Record> for Observation {
    fn from(record: Record) -> Self {
        Observation::Fields(record)
    }
}

/// Timestamp key to observation, as extracted from a single page.
pub type TimestampedObservations = BTreeMap<String, Observation>;

/// Resource/zone key to freshly extracted observations.
pub type IncomingBatch = BTreeMap<String, TimestampedObservations>;

/// The three scraped domains, each persisted as its own dataset document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    GridConditions,
    LoadGeneration,
    Weather,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::GridConditions => "grid_conditions",
            Domain::LoadGeneration => "load_generation",
            Domain::Weather => "weather",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
