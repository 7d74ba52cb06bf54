//! Markup extractors, one per source family.
//!
//! Each turns a fetched page into timestamp-keyed observations. Markup
//! anomalies never fail a run: they shrink the output instead.

pub mod grid;
pub mod load;
pub mod weather;

use crate::types::TimestampedObservations;
use chrono::NaiveDate;

pub use grid::GridConditionsExtractor;
pub use load::LoadGenerationExtractor;
pub use weather::WeatherTableExtractor;

pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// `today` is the run's local calendar date.
    fn extract(&self, body: &str, today: NaiveDate) -> TimestampedObservations;
}
