use async_trait::async_trait;
use chrono::NaiveDate;
use gridwatch::clock::FixedClock;
use gridwatch::config::{Config, DocumentLocation, ResourceConfig, ZoneConfig};
use gridwatch::fetcher::{AttemptFailure, Fetcher, HttpClientPort, HttpGetResult};
use gridwatch::jobs::{grid_conditions, load_generation, weather, JobContext, JobRegistry};
use gridwatch::store::{load_dataset, DatasetStore, InMemoryDatasetStore};
use gridwatch::types::{FieldValue, Observation};
use gridwatch::ScraperError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serves canned pages by URL; unknown URLs always time out.
#[derive(Default)]
struct FakeHttp {
    pages: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHttp {
    fn serve(&self, url: &str, body: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), body.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClientPort for FakeHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult, AttemptFailure> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.pages.lock().unwrap().get(url) {
            Some(body) => Ok(HttpGetResult {
                status: 200,
                body: body.clone(),
            }),
            None => Err(AttemptFailure::Timeout),
        }
    }
}

/// In-memory store whose reads or writes can be switched off.
#[derive(Default)]
struct UnreliableStore {
    inner: InMemoryDatasetStore,
    fail_get: bool,
    fail_put: bool,
}

#[async_trait]
impl DatasetStore for UnreliableStore {
    async fn get(&self, location: &DocumentLocation) -> gridwatch::Result<Option<String>> {
        if self.fail_get {
            return Err(ScraperError::store(&location.collection, &location.key, "connection refused"));
        }
        self.inner.get(location).await
    }

    async fn put(&self, location: &DocumentLocation, document: String) -> gridwatch::Result<()> {
        if self.fail_put {
            return Err(ScraperError::store(&location.collection, &location.key, "503 from object store"));
        }
        self.inner.put(location, document).await
    }
}

fn context_with_store(http: Arc<FakeHttp>, store: Arc<UnreliableStore>) -> JobContext {
    JobContext {
        config: Arc::new(test_config()),
        fetcher: Fetcher::new(http),
        store,
        clock: Arc::new(FixedClock::at_date(march_5())),
    }
}

struct Harness {
    http: Arc<FakeHttp>,
    store: Arc<InMemoryDatasetStore>,
    clock: Arc<FixedClock>,
    ctx: JobContext,
}

fn test_config() -> Config {
    let mut config = Config::with_timeouts(10, 10);
    config.grid_conditions.delay_secs = 0;
    config.grid_conditions.resources = vec![
        ResourceConfig::new("ercot_rt_conditions", "http://grid.test/rt"),
        ResourceConfig::new("ercot_as_capacity", "http://grid.test/as"),
    ];
    config.load_generation.delay_secs = 0;
    config.load_generation.resources = vec![
        ResourceConfig::new("miso_load", "http://load.test/load"),
        ResourceConfig::new("miso_wind", "http://load.test/wind"),
    ];
    config.weather.delay_secs = 0;
    config.weather.zones = vec![
        ZoneConfig {
            region: "North".into(),
            station: "Wichita Falls".into(),
            url: "http://wx.test/KSPS.html".into(),
            key: None,
        },
        ZoneConfig {
            region: "Far West".into(),
            station: "Midland Airpark".into(),
            url: "http://wx.test/KMDD.html".into(),
            key: None,
        },
    ];
    config
}

fn harness(date: NaiveDate) -> Harness {
    let http = Arc::new(FakeHttp::default());
    let store = Arc::new(InMemoryDatasetStore::new());
    let clock = Arc::new(FixedClock::at_date(date));
    let ctx = JobContext {
        config: Arc::new(test_config()),
        fetcher: Fetcher::new(http.clone()),
        store: store.clone(),
        clock: clock.clone(),
    };
    Harness {
        http,
        store,
        clock,
        ctx,
    }
}

fn march_5() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

fn grid_page(updated: &str, demand: &str) -> String {
    format!(
        "<html><body><span>Last Updated: {}</span>\
         <span>Actual System Demand</span><span>{}</span>\
         <span>Status</span><span>Normal</span></body></html>",
        updated, demand
    )
}

fn weather_row(day: &str, time: &str, temp: &str) -> String {
    let cells = [
        day, time, "S 10", "10.00", "", "Fair", temp, "55", "75", "68", "57%", "NA", "NA", "30.01",
        "1016.2", "", "", "",
    ];
    let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
    format!("<tr>{}</tr>", tds)
}

fn weather_page(rows: &[String]) -> String {
    format!(
        "<html><body><table cellspacing=\"3\">\
         <tr><th>title</th></tr><tr><th>h1</th></tr><tr><th>h2</th></tr>{}</table></body></html>",
        rows.concat()
    )
}

#[tokio::test]
async fn grid_conditions_job_is_idempotent_and_first_write_wins() {
    let h = harness(march_5());
    h.http.serve("http://grid.test/rt", &grid_page("Mar 05, 2024 10:15:00", "41,234"));
    h.http.serve("http://grid.test/as", &grid_page("Mar 05, 2024 10:15:00", "7,000"));

    let first = grid_conditions::run(&h.ctx).await.unwrap();
    assert_eq!(first.added, 2);
    assert!(first.written);
    assert_eq!(first.latest_key.as_deref(), Some(" Mar 05, 2024 10:15:00"));

    // Same snapshot time, different reading: stored value must not change.
    h.http.serve("http://grid.test/rt", &grid_page("Mar 05, 2024 10:15:00", "99,999"));
    let second = grid_conditions::run(&h.ctx).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped, 2);

    let location = &h.ctx.config.grid_conditions.document;
    let ds = load_dataset(h.store.as_ref(), location).await.unwrap();
    let Some(Observation::Fields(rec)) = ds.observation("ercot_rt_conditions", " Mar 05, 2024 10:15:00") else {
        panic!("missing snapshot");
    };
    assert_eq!(rec["Actual System Demand"], FieldValue::from("41,234"));
    assert!(!rec.contains_key("Status"));
}

#[tokio::test]
async fn load_generation_runs_once_per_day() {
    let h = harness(march_5());
    h.http.serve("http://load.test/load", "<Load>70000</Load>");
    h.http.serve("http://load.test/wind", "<Wind>9000</Wind>");

    let first = load_generation::run(&h.ctx).await.unwrap();
    assert!(!first.skipped_run);
    assert_eq!(first.added, 2);
    assert_eq!(h.http.calls().len(), 2);
    assert_eq!(h.store.put_count(), 1);

    let second = load_generation::run(&h.ctx).await.unwrap();
    assert!(second.skipped_run);
    assert!(!second.written);
    assert_eq!(h.http.calls().len(), 2, "second run must not fetch");
    assert_eq!(h.store.put_count(), 1, "second run must not write");

    let location = &h.ctx.config.load_generation.document;
    let ds = load_dataset(h.store.as_ref(), location).await.unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(
        ds.observation("miso_load", "03-05-2024"),
        Some(&Observation::Raw("<Load>70000</Load>".to_string()))
    );

    // Next day captures a new snapshot.
    h.clock.set(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap().and_hms_opt(23, 58, 0).unwrap());
    let third = load_generation::run(&h.ctx).await.unwrap();
    assert_eq!(third.added, 2);
    assert_eq!(h.store.put_count(), 2);
}

#[tokio::test]
async fn fetch_exhaustion_aborts_without_writing() {
    let h = harness(march_5());
    h.http.serve("http://grid.test/rt", &grid_page("Mar 05, 2024 10:15:00", "41,234"));
    // http://grid.test/as is never served and always times out

    let err = grid_conditions::run(&h.ctx).await.unwrap_err();

    assert!(matches!(err, ScraperError::FetchExhausted { attempts: 5, .. }));
    let as_calls = h.http.calls().iter().filter(|u| u.ends_with("/as")).count();
    assert_eq!(as_calls, 5);
    assert_eq!(h.store.put_count(), 0);
}

#[tokio::test]
async fn weather_job_initializes_new_zones_and_resolves_dates() {
    let h = harness(march_5());
    let location = h.ctx.config.weather.document.clone();
    // Existing document only knows the North zone.
    h.store.insert(&location, r#"{"North": {"2024-03-05 09:53": {"temp_F": 60}}}"#);

    h.http.serve(
        "http://wx.test/KSPS.html",
        &weather_page(&[weather_row("5", "09:53", "71"), weather_row("28", "23:53", "48")]),
    );
    h.http.serve("http://wx.test/KMDD.html", &weather_page(&[]));

    let report = weather::run(&h.ctx).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped, 1);

    let ds = load_dataset(h.store.as_ref(), &location).await.unwrap();
    assert!(ds.get("Far West").is_some_and(|obs| obs.is_empty()));

    let Some(Observation::Fields(kept)) = ds.observation("North", "2024-03-05 09:53") else {
        panic!("existing observation lost");
    };
    assert_eq!(kept["temp_F"], FieldValue::Int(60));

    let Some(Observation::Fields(rolled)) = ds.observation("North", "2024-02-28 23:53") else {
        panic!("rolled-over observation missing");
    };
    assert_eq!(rolled["temp_F"], FieldValue::Int(48));
}

#[tokio::test]
async fn daily_job_isolates_domain_failures() {
    let h = harness(march_5());
    // Load feeds are down; weather pages are up.
    h.http.serve("http://wx.test/KSPS.html", &weather_page(&[weather_row("5", "09:53", "71")]));
    h.http.serve("http://wx.test/KMDD.html", &weather_page(&[weather_row("5", "09:55", "80")]));

    let registry = JobRegistry::default();
    let result = registry.run("load_and_weather", &h.ctx).await;

    assert!(matches!(result, Err(ScraperError::FetchExhausted { .. })));
    assert_eq!(h.store.put_count(), 1, "weather still persisted");
    assert!(h.store.document(&h.ctx.config.load_generation.document).is_none());
    assert!(h.store.document(&h.ctx.config.weather.document).is_some());
}

#[tokio::test]
async fn unknown_job_is_rejected() {
    let h = harness(march_5());
    let registry = JobRegistry::default();
    let err = registry.run("nope", &h.ctx).await.unwrap_err();
    assert!(matches!(err, ScraperError::UnknownJob(name) if name == "nope"));
}

#[tokio::test]
async fn unreadable_store_aborts_before_any_fetch() {
    let http = Arc::new(FakeHttp::default());
    http.serve("http://grid.test/rt", &grid_page("Mar 05, 2024 10:15:00", "41,234"));
    http.serve("http://grid.test/as", &grid_page("Mar 05, 2024 10:15:00", "7,000"));
    let store = Arc::new(UnreliableStore {
        fail_get: true,
        ..UnreliableStore::default()
    });
    let ctx = context_with_store(http.clone(), store.clone());

    let err = grid_conditions::run(&ctx).await.unwrap_err();

    assert!(matches!(err, ScraperError::Store { ref collection, .. } if collection == "ercot"));
    assert!(http.calls().is_empty());
    assert_eq!(store.inner.put_count(), 0);
}

#[tokio::test]
async fn failed_write_keeps_previous_document() {
    let http = Arc::new(FakeHttp::default());
    http.serve("http://wx.test/KSPS.html", &weather_page(&[weather_row("5", "09:53", "71")]));
    http.serve("http://wx.test/KMDD.html", &weather_page(&[weather_row("5", "09:55", "80")]));
    let store = Arc::new(UnreliableStore {
        fail_put: true,
        ..UnreliableStore::default()
    });
    let location = test_config().weather.document;
    let previous = r#"{"North":{"2024-03-04 23:53":{"temp_F":52}}}"#;
    store.inner.insert(&location, previous);
    let ctx = context_with_store(http.clone(), store.clone());

    let err = weather::run(&ctx).await.unwrap_err();

    assert!(matches!(err, ScraperError::Store { .. }));
    assert_eq!(http.calls().len(), 2, "both zones fetched before the write");
    assert_eq!(store.inner.document(&location).as_deref(), Some(previous));
    assert_eq!(store.inner.put_count(), 0);
}

#[tokio::test]
async fn daily_guard_needs_a_readable_store() {
    let http = Arc::new(FakeHttp::default());
    http.serve("http://load.test/load", "<Load>70000</Load>");
    let store = Arc::new(UnreliableStore {
        fail_get: true,
        ..UnreliableStore::default()
    });
    let ctx = context_with_store(http.clone(), store);

    let err = load_generation::run(&ctx).await.unwrap_err();

    assert!(matches!(err, ScraperError::Store { .. }));
    assert!(http.calls().is_empty());
}
