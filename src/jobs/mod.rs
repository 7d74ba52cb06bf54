//! Job driver: load a domain's dataset, fetch and extract each configured
//! source in order, merge, and write the dataset back once.

pub mod grid_conditions;
pub mod load_generation;
pub mod registry;
pub mod weather;

use crate::clock::Clock;
use crate::config::{Config, DocumentLocation};
use crate::dataset::{Dataset, MergeStats};
use crate::error::Result;
use crate::extract::Extractor;
use crate::fetcher::Fetcher;
use crate::store::{load_dataset, save_dataset, DatasetStore};
use crate::types::Domain;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use registry::{Job, JobRegistry};

/// Everything a job run needs, passed in explicitly.
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<Config>,
    pub fetcher: Fetcher,
    pub store: Arc<dyn DatasetStore>,
    pub clock: Arc<dyn Clock>,
}

/// Summary of one domain run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub domain: Domain,
    pub sources_processed: usize,
    pub added: usize,
    pub skipped: usize,
    /// Set when the daily guard short-circuited the run.
    pub skipped_run: bool,
    pub latest_key: Option<String>,
    pub written: bool,
}

impl JobReport {
    fn skipped_run(domain: Domain, key: String) -> Self {
        Self {
            domain,
            sources_processed: 0,
            added: 0,
            skipped: 0,
            skipped_run: true,
            latest_key: Some(key),
            written: false,
        }
    }
}

/// One remote page and the dataset entry its observations merge into.
#[derive(Debug, Clone)]
pub struct Source {
    pub key: String,
    pub url: String,
}

/// A domain run, fully described.
pub struct DomainRun<'a> {
    pub domain: Domain,
    pub location: &'a DocumentLocation,
    pub delay: Duration,
    pub sources: Vec<Source>,
    pub extractor: &'a dyn Extractor,
}

/// Fetch, extract and merge every source in configured order, then persist.
///
/// Any fetch or store failure returns early, before the write.
pub async fn run_domain(ctx: &JobContext, mut dataset: Dataset, run: DomainRun<'_>) -> Result<JobReport> {
    let today = ctx.clock.today();
    dataset.ensure_entries(run.sources.iter().map(|s| s.key.as_str()));

    let mut stats = MergeStats::default();
    let mut latest_key = None;
    for (i, source) in run.sources.iter().enumerate() {
        if i > 0 && !run.delay.is_zero() {
            tokio::time::sleep(run.delay).await;
        }
        let body = ctx.fetcher.fetch(&source.url).await?;
        let observations = run.extractor.extract(&body, today);
        debug!(
            source = %source.key,
            extracted = observations.len(),
            extractor = run.extractor.name(),
            "extracted observations"
        );
        if let Some(key) = observations.keys().next_back() {
            latest_key = Some(key.clone());
        }
        let merged = dataset.merge_resource(&source.key, observations);
        debug!(source = %source.key, added = merged.added, skipped = merged.skipped, "merged");
        stats.absorb(merged);
    }

    save_dataset(ctx.store.as_ref(), run.location, &dataset).await?;

    counter!("gridwatch_records_added_total", "domain" => run.domain.as_str()).increment(stats.added as u64);
    counter!("gridwatch_records_skipped_total", "domain" => run.domain.as_str()).increment(stats.skipped as u64);
    info!(
        domain = %run.domain,
        sources = run.sources.len(),
        added = stats.added,
        skipped = stats.skipped,
        "Finished {} job for {}",
        run.domain,
        latest_key.as_deref().unwrap_or("-")
    );

    Ok(JobReport {
        domain: run.domain,
        sources_processed: run.sources.len(),
        added: stats.added,
        skipped: stats.skipped,
        skipped_run: false,
        latest_key,
        written: true,
    })
}

/// Load the dataset for `location` and hand it to [`run_domain`].
pub async fn load_and_run(ctx: &JobContext, run: DomainRun<'_>) -> Result<JobReport> {
    let dataset = load_dataset(ctx.store.as_ref(), run.location).await?;
    run_domain(ctx, dataset, run).await
}

fn delay(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
