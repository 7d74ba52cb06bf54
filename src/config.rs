use crate::constants::*;
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub grid_conditions: GridConditionsConfig,
    #[serde(default)]
    pub load_generation: LoadGenerationConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timeouts have no serde default: a config file must state them.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn default_user_agent() -> String {
    format!("gridwatch/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Fs,
    Http,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Root directory for the `fs` backend.
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    /// Object endpoint for the `http` backend.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            root: default_store_root(),
            base_url: None,
            token_env: default_token_env(),
        }
    }
}

fn default_store_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_token_env() -> String {
    "GRIDWATCH_STORE_TOKEN".to_string()
}

/// Where a domain's dataset document lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentLocation {
    pub collection: String,
    pub key: String,
}

impl DocumentLocation {
    pub fn new(collection: &str, key: &str) -> Self {
        Self {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    pub url: String,
}

impl ResourceConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridConditionsConfig {
    pub document: DocumentLocation,
    pub delay_secs: u64,
    #[serde(default = "default_timestamp_offset")]
    pub timestamp_offset: usize,
    pub resources: Vec<ResourceConfig>,
}

fn default_timestamp_offset() -> usize {
    GRID_TIMESTAMP_OFFSET
}

impl Default for GridConditionsConfig {
    fn default() -> Self {
        Self {
            document: DocumentLocation::new(GRID_CONDITIONS_COLLECTION, GRID_CONDITIONS_DOCUMENT),
            delay_secs: GRID_CONDITIONS_DELAY_SECS,
            timestamp_offset: GRID_TIMESTAMP_OFFSET,
            resources: vec![
                ResourceConfig::new(ERCOT_RT_CONDITIONS, ERCOT_RT_CONDITIONS_URL),
                ResourceConfig::new(ERCOT_AS_CAPACITY, ERCOT_AS_CAPACITY_URL),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadGenerationConfig {
    pub document: DocumentLocation,
    pub delay_secs: u64,
    pub resources: Vec<ResourceConfig>,
}

impl Default for LoadGenerationConfig {
    fn default() -> Self {
        Self {
            document: DocumentLocation::new(LOAD_GENERATION_COLLECTION, LOAD_GENERATION_DOCUMENT),
            delay_secs: LOAD_GENERATION_DELAY_SECS,
            resources: vec![
                ResourceConfig::new(MISO_LOAD, MISO_LOAD_URL),
                ResourceConfig::new(MISO_WIND, MISO_WIND_URL),
                ResourceConfig::new(MISO_WIND_FORECAST, MISO_WIND_FORECAST_URL),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneConfig {
    pub region: String,
    pub station: String,
    pub url: String,
    /// Dataset key override; defaults to the region name.
    pub key: Option<String>,
}

impl ZoneConfig {
    pub fn dataset_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.region)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub document: DocumentLocation,
    pub delay_secs: u64,
    pub zones: Vec<ZoneConfig>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        let zones = WEATHER_ZONES
            .iter()
            .map(|(region, station, page)| ZoneConfig {
                region: region.to_string(),
                station: station.to_string(),
                url: format!("{}{}", WEATHER_BASE_URL, page),
                key: None,
            })
            .collect();
        Self {
            document: DocumentLocation::new(WEATHER_COLLECTION, WEATHER_DOCUMENT),
            delay_secs: WEATHER_DELAY_SECS,
            zones,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_grid_interval")]
    pub grid_conditions_interval_minutes: u32,
    #[serde(default = "default_daily_hour")]
    pub daily_hour: u32,
    #[serde(default = "default_daily_minute")]
    pub daily_minute: u32,
}

fn default_grid_interval() -> u32 {
    GRID_CONDITIONS_INTERVAL_MINUTES
}

fn default_daily_hour() -> u32 {
    DAILY_JOB_HOUR
}

fn default_daily_minute() -> u32 {
    DAILY_JOB_MINUTE
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            grid_conditions_interval_minutes: GRID_CONDITIONS_INTERVAL_MINUTES,
            daily_hour: DAILY_JOB_HOUR,
            daily_minute: DAILY_JOB_MINUTE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_prefix() -> String {
    "gridwatch.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            file_prefix: default_log_prefix(),
        }
    }
}

impl Config {
    /// Built-in endpoints and schedule with the given HTTP timeouts.
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            http: HttpConfig {
                connect_timeout_secs,
                read_timeout_secs,
                user_agent: default_user_agent(),
            },
            store: StoreConfig::default(),
            grid_conditions: GridConditionsConfig::default(),
            load_generation: LoadGenerationConfig::default(),
            weather: WeatherConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Resolve the config path: explicit argument, then `GRIDWATCH_CONFIG`,
    /// then `gridwatch.toml` in the working directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load from `path`. When the file does not exist the built-in defaults
    /// are used, but the HTTP timeouts must still come from the environment.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Self::from_env_timeouts(|name| std::env::var(name).ok());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Built-in defaults with timeouts read through `lookup`, which maps an
    /// environment variable name to its value.
    pub fn from_env_timeouts<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = |name: &str| -> Result<u64> {
            let raw = lookup(name).ok_or_else(|| {
                ScraperError::Config(format!(
                    "no config file and {} is not set; [http] connect_timeout_secs and read_timeout_secs have no default",
                    name
                ))
            })?;
            raw.trim()
                .parse()
                .map_err(|_| ScraperError::Config(format!("{} must be a whole number of seconds, got '{}'", name, raw)))
        };
        let config = Self::with_timeouts(timeout(CONNECT_TIMEOUT_ENV)?, timeout(READ_TIMEOUT_ENV)?);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.connect_timeout_secs == 0 || self.http.read_timeout_secs == 0 {
            return Err(ScraperError::Config("http timeouts must be greater than zero".into()));
        }
        validate_resources("grid_conditions", &self.grid_conditions.resources)?;
        validate_resources("load_generation", &self.load_generation.resources)?;

        let mut keys = HashSet::new();
        for zone in &self.weather.zones {
            check_url("weather", zone.dataset_key(), &zone.url)?;
            if zone.region.trim().is_empty() || zone.station.trim().is_empty() {
                return Err(ScraperError::Config(
                    "weather zones need a region and a station".into(),
                ));
            }
            if !keys.insert(zone.dataset_key()) {
                return Err(ScraperError::Config(format!(
                    "weather zone '{}' ({}) reuses dataset key '{}'; set a distinct `key`",
                    zone.station,
                    zone.region,
                    zone.dataset_key()
                )));
            }
        }

        let schedule = &self.schedule;
        if schedule.grid_conditions_interval_minutes == 0 {
            return Err(ScraperError::Config("grid_conditions interval must be at least one minute".into()));
        }
        if schedule.daily_hour > 23 || schedule.daily_minute > 59 {
            return Err(ScraperError::Config(format!(
                "invalid daily time {:02}:{:02}",
                schedule.daily_hour, schedule.daily_minute
            )));
        }
        Ok(())
    }
}

fn validate_resources(domain: &str, resources: &[ResourceConfig]) -> Result<()> {
    let mut names = HashSet::new();
    for resource in resources {
        if resource.name.trim().is_empty() {
            return Err(ScraperError::Config(format!("{}: resource with empty name", domain)));
        }
        check_url(domain, &resource.name, &resource.url)?;
        if !names.insert(resource.name.as_str()) {
            return Err(ScraperError::Config(format!(
                "{}: duplicate resource '{}'",
                domain, resource.name
            )));
        }
    }
    Ok(())
}

fn check_url(domain: &str, name: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ScraperError::Config(format!(
            "{}: '{}' has a non-http url '{}'",
            domain, name, url
        )))
    }
}
