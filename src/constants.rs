//! Job and resource name constants shared by config defaults, the job
//! registry and the CLI.

// Registered job names (used by the scheduler and CLI)
pub const GRID_CONDITIONS_JOB: &str = "grid_conditions";
pub const LOAD_AND_WEATHER_JOB: &str = "load_and_weather";

// Grid-conditions resources (ERCOT)
pub const ERCOT_RT_CONDITIONS: &str = "ercot_rt_conditions";
pub const ERCOT_AS_CAPACITY: &str = "ercot_as_capacity";
pub const ERCOT_RT_CONDITIONS_URL: &str =
    "http://www.ercot.com/content/cdr/html/real_time_system_conditions.html";
pub const ERCOT_AS_CAPACITY_URL: &str =
    "http://www.ercot.com/content/cdr/html/as_capacity_monitor.html";

// Load/generation resources (MISO)
pub const MISO_LOAD: &str = "miso_load";
pub const MISO_WIND: &str = "miso_wind";
pub const MISO_WIND_FORECAST: &str = "miso_wind_forecast";
pub const MISO_LOAD_URL: &str = "https://www.misoenergy.org/ria/ptpTotalLoad.aspx?format=xml";
pub const MISO_WIND_URL: &str = "https://www.misoenergy.org/ria/windgenResponse.aspx?format=xml";
pub const MISO_WIND_FORECAST_URL: &str = "https://www.misoenergy.org/ria/WindGenDayAhead.aspx";

// Weather observation history (NWS)
pub const WEATHER_BASE_URL: &str = "http://w1.weather.gov/obhistory/";

/// (region, station, page) for each default weather zone, in run order.
pub const WEATHER_ZONES: &[(&str, &str, &str)] = &[
    ("North", "Wichita Falls", "KSPS.html"),
    ("Coast", "Houston, Sugar Land Muni", "KSGR.html"),
    ("East", "Tyler", "KTYR.html"),
    ("South", "Corpus Christi Naval Air Station", "KNGP.html"),
    ("West", "Abilene Regional Airport", "KABI.html"),
    ("Far West", "Midland Airpark", "KMDD.html"),
    ("North Central", "Dallas Love Field", "KDAL.html"),
    ("South Central", "Austin-Bergstrom International Airport", "KAUS.html"),
];

// Inter-request delays, seconds
pub const GRID_CONDITIONS_DELAY_SECS: u64 = 6;
pub const LOAD_GENERATION_DELAY_SECS: u64 = 31;
pub const WEATHER_DELAY_SECS: u64 = 5;

// Store document locations
pub const GRID_CONDITIONS_COLLECTION: &str = "ercot";
pub const GRID_CONDITIONS_DOCUMENT: &str = "rt_conditions.json";
pub const LOAD_GENERATION_COLLECTION: &str = "miso";
pub const LOAD_GENERATION_DOCUMENT: &str = "load_wind.json";
pub const WEATHER_COLLECTION: &str = "weather";
pub const WEATHER_DOCUMENT: &str = "texas_zones.json";

/// Length of the "Last Updated:" prefix in front of the ERCOT snapshot time.
pub const GRID_TIMESTAMP_OFFSET: usize = 13;

// Cadences
pub const GRID_CONDITIONS_INTERVAL_MINUTES: u32 = 5;
pub const DAILY_JOB_HOUR: u32 = 23;
pub const DAILY_JOB_MINUTE: u32 = 58;

pub const DEFAULT_CONFIG_PATH: &str = "gridwatch.toml";
pub const CONFIG_PATH_ENV: &str = "GRIDWATCH_CONFIG";
pub const CONNECT_TIMEOUT_ENV: &str = "GRIDWATCH_CONNECT_TIMEOUT_SECS";
pub const READ_TIMEOUT_ENV: &str = "GRIDWATCH_READ_TIMEOUT_SECS";
pub const METRICS_PORT_ENV: &str = "GRIDWATCH_METRICS_PORT";

