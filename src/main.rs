use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gridwatch::clock::{Clock, SystemClock};
use gridwatch::config::Config;
use gridwatch::fetcher::{Fetcher, ReqwestHttp};
use gridwatch::jobs::{JobContext, JobRegistry};
use gridwatch::scheduler::{default_schedule, Scheduler};
use gridwatch::{logging, observability, store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gridwatch")]
#[command(about = "Scrapes grid conditions, load/wind generation and weather observations into append-only datasets")]
#[command(version)]
struct Cli {
    /// Path to the TOML config (default: $GRIDWATCH_CONFIG or gridwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one registered job once and exit
    Run {
        /// Job name, see `gridwatch jobs`
        job: String,
    },
    /// Fire jobs on their cadences until interrupted
    Schedule,
    /// List registered jobs and their cadences
    Jobs,
}

fn build_context(config: Config) -> anyhow::Result<JobContext> {
    let http = ReqwestHttp::new(&config.http).context("building HTTP client")?;
    let store = store::build_store(&config.store, &config.http).context("building dataset store")?;
    Ok(JobContext {
        config: Arc::new(config),
        fetcher: Fetcher::new(Arc::new(http)),
        store,
        clock: Arc::new(SystemClock),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let _log_guard = logging::init_logging(&config.logging);
    info!(config = %config_path.display(), "configuration loaded");

    let registry = JobRegistry::default();

    match cli.command {
        Commands::Run { job } => {
            if !registry.contains(&job) {
                bail!(
                    "unknown job '{}'; available: {}",
                    job,
                    registry.names().collect::<Vec<_>>().join(", ")
                );
            }
            let ctx = build_context(config)?;
            match registry.run(&job, &ctx).await {
                Ok(reports) => {
                    for report in reports {
                        println!("{}", serde_json::to_string(&report)?);
                    }
                }
                Err(e) => {
                    error!("job {} failed: {}", job, e);
                    return Err(e).with_context(|| format!("job {} failed", job));
                }
            }
        }
        Commands::Schedule => {
            observability::init_metrics();
            let entries = default_schedule(&config.schedule);
            let ctx = build_context(config)?;
            let scheduler = Scheduler::new(entries, ctx.clock.now());
            for entry in scheduler.entries() {
                info!(job = entry.job, cadence = %entry.cadence, "scheduled");
            }
            scheduler.run(&registry, &ctx).await;
        }
        Commands::Jobs => {
            for entry in default_schedule(&config.schedule) {
                println!("{:<20} {}", entry.job, entry.cadence);
            }
        }
    }
    Ok(())
}
