use super::{grid_conditions, load_generation, weather, JobContext, JobReport};
use crate::constants::{GRID_CONDITIONS_JOB, LOAD_AND_WEATHER_JOB};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use metrics::counter;
use std::collections::BTreeMap;
use tracing::{error, info, Instrument};
use uuid::Uuid;

/// A named unit of work the scheduler can fire.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &JobContext) -> Result<Vec<JobReport>>;
}

pub struct GridConditionsJob;

#[async_trait]
impl Job for GridConditionsJob {
    fn name(&self) -> &'static str {
        GRID_CONDITIONS_JOB
    }

    async fn run(&self, ctx: &JobContext) -> Result<Vec<JobReport>> {
        Ok(vec![grid_conditions::run(ctx).await?])
    }
}

/// Daily job: load/generation first, then weather. A failure in one domain
/// does not stop the other; the first error is returned after both ran.
pub struct LoadAndWeatherJob;

#[async_trait]
impl Job for LoadAndWeatherJob {
    fn name(&self) -> &'static str {
        LOAD_AND_WEATHER_JOB
    }

    async fn run(&self, ctx: &JobContext) -> Result<Vec<JobReport>> {
        let load = load_generation::run(ctx).await;
        if let Err(e) = &load {
            error!("load_generation run failed, nothing persisted: {}", e);
        }
        let weather = weather::run(ctx).await;
        if let Err(e) = &weather {
            error!("weather run failed, nothing persisted: {}", e);
        }

        let mut reports = Vec::new();
        let mut first_err = None;
        for outcome in [load, weather] {
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}

/// Job name to job. The scheduler and CLI only ever go through here.
pub struct JobRegistry {
    jobs: BTreeMap<&'static str, Box<dyn Job>>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(GridConditionsJob));
        registry.register(Box::new(LoadAndWeatherJob));
        registry
    }
}

impl JobRegistry {
    pub fn empty() -> Self {
        Self {
            jobs: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, job: Box<dyn Job>) {
        self.jobs.insert(job.name(), job);
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.jobs.keys().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Run a job by name inside its own span, tagged with a fresh run id.
    pub async fn run(&self, name: &str, ctx: &JobContext) -> Result<Vec<JobReport>> {
        let job = self
            .jobs
            .get(name)
            .ok_or_else(|| ScraperError::UnknownJob(name.to_string()))?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("job", job = name, run_id = %run_id);

        async {
            info!("starting job");
            counter!("gridwatch_job_runs_total", "job" => job.name()).increment(1);
            let result = job.run(ctx).await;
            if let Err(e) = &result {
                counter!("gridwatch_job_failures_total", "job" => job.name()).increment(1);
                error!("job failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }
}
