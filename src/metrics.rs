//! Metrics for the relay, following standard Prometheus naming conventions.
//!
//! Recording functions are organized by phase (sessions, scan) so each part
//! of the pipeline owns its own counters.

use std::net::SocketAddr;
use tracing::{info, warn};

/// Install the Prometheus exporter. Idempotent from the caller's point of
/// view: a second install attempt is logged and ignored.
pub fn init_metrics() {
    let port: u16 = std::env::var("RELAY_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9899);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}

/// Session registry metrics
pub mod sessions {
    pub fn created() {
        ::metrics::counter!("relay_sessions_created_total").increment(1);
    }

    pub fn expired_on_read() {
        ::metrics::counter!("relay_sessions_expired_on_read_total").increment(1);
    }

    pub fn swept(count: usize) {
        ::metrics::counter!("relay_sessions_swept_total").increment(count as u64);
    }

    pub fn active(count: usize) {
        ::metrics::gauge!("relay_sessions_active").set(count as f64);
    }
}

/// Scan/upload path metrics
pub mod scan {
    pub fn accepted() {
        ::metrics::counter!("relay_scans_accepted_total").increment(1);
    }

    pub fn extraction_failed() {
        ::metrics::counter!("relay_scans_extraction_failed_total").increment(1);
    }

    pub fn upstream_failed() {
        ::metrics::counter!("relay_scans_upstream_failed_total").increment(1);
    }

    pub fn recognize_duration(duration_secs: f64) {
        ::metrics::histogram!("relay_recognize_duration_seconds").record(duration_secs);
    }

    pub fn extract_duration(duration_secs: f64) {
        ::metrics::histogram!("relay_extract_duration_seconds").record(duration_secs);
    }
}
