use super::Extractor;
use crate::constants::GRID_TIMESTAMP_OFFSET;
use crate::types::{FieldValue, Observation, Record, TimestampedObservations};
use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Real-time grid conditions pages: a flat run of `<span>` elements where
/// labels precede their readings.
pub struct GridConditionsExtractor {
    timestamp_offset: usize,
}

impl Default for GridConditionsExtractor {
    fn default() -> Self {
        Self::new(GRID_TIMESTAMP_OFFSET)
    }
}

impl GridConditionsExtractor {
    pub fn new(timestamp_offset: usize) -> Self {
        Self { timestamp_offset }
    }

    /// Timestamp label carried by the first span, past the fixed prefix.
    pub fn timestamp_label(&self, first: &str) -> String {
        first.chars().skip(self.timestamp_offset).collect()
    }

    /// Split span texts into the snapshot timestamp and its labeled readings.
    pub fn extract_values(&self, values: &[String]) -> Option<(String, Record)> {
        let (first, _) = values.split_first()?;
        Some((self.timestamp_label(first), labeled_values(values)))
    }
}

impl Extractor for GridConditionsExtractor {
    fn name(&self) -> &'static str {
        "grid_conditions"
    }

    fn extract(&self, body: &str, _today: NaiveDate) -> TimestampedObservations {
        let values = span_texts(body);
        let mut out = TimestampedObservations::new();
        match self.extract_values(&values) {
            Some((timestamp, record)) => {
                debug!(timestamp = %timestamp, readings = record.len(), "grid conditions snapshot");
                out.insert(timestamp, Observation::Fields(record));
            }
            None => warn!("no span elements found; page layout may have changed"),
        }
        out
    }
}

/// Text of every `<span>`, in document order.
pub fn span_texts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("span") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|span| span.text().collect::<String>())
        .collect()
}

/// Pair each reading whose last character is numeric with the value right
/// before it. The first value is the timestamp label and is never scanned.
pub fn labeled_values(values: &[String]) -> Record {
    let mut record = Record::new();
    for pair in values.windows(2) {
        let (label, value) = (&pair[0], &pair[1]);
        if value.chars().last().is_some_and(char::is_numeric) {
            record.insert(label.clone(), FieldValue::Text(value.clone()));
        }
    }
    record
}
