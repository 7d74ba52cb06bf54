use crate::constants::METRICS_PORT_ENV;
use std::net::SocketAddr;
use tracing::{info, warn};

/// Install the Prometheus exporter when `GRIDWATCH_METRICS_PORT` is set.
/// Without it, counters are recorded into the no-op recorder.
pub fn init_metrics() {
    let Some(port) = std::env::var(METRICS_PORT_ENV)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    else {
        return;
    };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed: {}", e),
    }
}
