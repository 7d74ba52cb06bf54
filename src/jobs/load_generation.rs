use super::{delay, run_domain, DomainRun, JobContext, JobReport, Source};
use crate::dates::daily_key;
use crate::error::Result;
use crate::extract::LoadGenerationExtractor;
use crate::store::load_dataset;
use crate::types::Domain;
use tracing::{info, instrument};

/// Store one verbatim snapshot of each load/generation feed per day.
///
/// If today's key is already in the dataset the whole run is skipped: no
/// fetch and no write, however many times the job fires that day.
#[instrument(skip(ctx), fields(domain = "load_generation"))]
pub async fn run(ctx: &JobContext) -> Result<JobReport> {
    let cfg = &ctx.config.load_generation;
    let today = daily_key(ctx.clock.today());

    let dataset = load_dataset(ctx.store.as_ref(), &cfg.document).await?;
    if dataset.contains_timestamp(&today) {
        info!("Finished {} job for {} (already captured today)", Domain::LoadGeneration, today);
        return Ok(JobReport::skipped_run(Domain::LoadGeneration, today));
    }

    let sources = cfg
        .resources
        .iter()
        .map(|r| Source {
            key: r.name.clone(),
            url: r.url.clone(),
        })
        .collect();

    run_domain(
        ctx,
        dataset,
        DomainRun {
            domain: Domain::LoadGeneration,
            location: &cfg.document,
            delay: delay(cfg.delay_secs),
            sources,
            extractor: &LoadGenerationExtractor,
        },
    )
    .await
}
