use super::{delay, load_and_run, DomainRun, JobContext, JobReport, Source};
use crate::error::Result;
use crate::extract::WeatherTableExtractor;
use crate::types::Domain;
use tracing::instrument;

/// Merge each zone's observation history into the weather dataset.
///
/// Zones are keyed by their dataset key (the region unless overridden), and
/// every configured zone gets an entry even when its page yields nothing.
#[instrument(skip(ctx), fields(domain = "weather"))]
pub async fn run(ctx: &JobContext) -> Result<JobReport> {
    let cfg = &ctx.config.weather;
    let sources = cfg
        .zones
        .iter()
        .map(|z| Source {
            key: z.dataset_key().to_string(),
            url: z.url.clone(),
        })
        .collect();

    load_and_run(
        ctx,
        DomainRun {
            domain: Domain::Weather,
            location: &cfg.document,
            delay: delay(cfg.delay_secs),
            sources,
            extractor: &WeatherTableExtractor,
        },
    )
    .await
}
