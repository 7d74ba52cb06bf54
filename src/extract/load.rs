use super::Extractor;
use crate::dates::daily_key;
use crate::types::{Observation, TimestampedObservations};
use chrono::NaiveDate;

/// Load and wind generation feeds are stored verbatim, one snapshot per
/// calendar day. Interpreting the XML is left to downstream consumers.
#[derive(Default)]
pub struct LoadGenerationExtractor;

impl Extractor for LoadGenerationExtractor {
    fn name(&self) -> &'static str {
        "load_generation"
    }

    fn extract(&self, body: &str, today: NaiveDate) -> TimestampedObservations {
        let mut out = TimestampedObservations::new();
        out.insert(daily_key(today), Observation::Raw(body.to_string()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_kept_verbatim_under_date_key() {
        let body = "<?xml version=\"1.0\"?><LoadInfo><Load>71234</Load></LoadInfo>";
        let today = NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();

        let out = LoadGenerationExtractor.extract(body, today);

        assert_eq!(out.len(), 1);
        assert_eq!(out.get("11-02-2024"), Some(&Observation::Raw(body.to_string())));
    }
}
