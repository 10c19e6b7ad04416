//! Prometheus metrics.
//!
//! Counters and histograms are recorded with the `metrics` macros at the
//! call sites; this module describes them and installs the exporter.
//!
//! ```rust,no_run
//! use pgpal_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to configure the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus scrape endpoint.
#[derive(Clone, Copy, Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Serve metrics on `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Describe every metric, install the global recorder and start the
    /// HTTP listener.
    ///
    /// Must be called once, from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or a
    /// recorder is already installed.
    pub fn start(&self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        builder
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        register_metrics();
        tracing::info!(addr = %self.addr, "Metrics exporter listening");
        Ok(())
    }
}

/// Describe every metric the service records.
pub fn register_metrics() {
    describe_counter!(
        "pgpal_dues_created_total",
        "Due payments created by the recurring generator"
    );
    describe_counter!(
        "pgpal_dues_runs_total",
        "Dues generator runs by trigger and outcome"
    );
    describe_histogram!(
        "pgpal_dues_run_duration_seconds",
        "Wall time of one dues generator run"
    );
    describe_counter!(
        "pgpal_reminders_total",
        "Rent reminders by delivery outcome"
    );
    describe_counter!("pgpal_tenants_created_total", "Tenants registered");
    describe_counter!("pgpal_tenants_vacated_total", "Tenants vacated");
    describe_counter!("pgpal_tenants_transferred_total", "Tenant bed transfers");
    describe_counter!(
        "pgpal_lifecycle_conflicts_total",
        "Lifecycle operations rejected by a conflict, by reason"
    );
}
