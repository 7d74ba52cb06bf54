use super::{delay, load_and_run, DomainRun, JobContext, JobReport, Source};
use crate::error::Result;
use crate::extract::GridConditionsExtractor;
use crate::types::Domain;
use tracing::instrument;

/// Snapshot every grid-conditions page into the grid dataset.
#[instrument(skip(ctx), fields(domain = "grid_conditions"))]
pub async fn run(ctx: &JobContext) -> Result<JobReport> {
    let cfg = &ctx.config.grid_conditions;
    let extractor = GridConditionsExtractor::new(cfg.timestamp_offset);
    let sources = cfg
        .resources
        .iter()
        .map(|r| Source {
            key: r.name.clone(),
            url: r.url.clone(),
        })
        .collect();

    load_and_run(
        ctx,
        DomainRun {
            domain: Domain::GridConditions,
            location: &cfg.document,
            delay: delay(cfg.delay_secs),
            sources,
            extractor: &extractor,
        },
    )
    .await
}
