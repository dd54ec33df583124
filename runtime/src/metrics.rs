//! Prometheus metrics for observability and monitoring.
//!
//! Runtime-level metrics cover:
//! - Ledger commits and optimistic concurrency conflicts
//! - Domain event delivery
//! - Conflict retries
//!
//! Domain crates describe their own business counters and call
//! [`MetricsServer::start`] once from the binary.
//!
//! # Example
//!
//! ```rust,no_run
//! use seatledger_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Serve metrics on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Installs the global recorder and exposes it on an HTTP endpoint for
/// Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder and spawn the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), the call
    /// logs a warning and leaves [`MetricsServer::render`] returning `None`.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();
        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                register_metrics();
                let addr = self.addr;
                tokio::spawn(async move {
                    if exporter.await.is_err() {
                        tracing::error!(addr = %addr, "Metrics exporter stopped");
                    }
                });
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all runtime metric descriptions.
fn register_metrics() {
    // Ledger
    describe_counter!(
        "seatledger_ledger_commits_total",
        "Total number of transactions committed to the ledger"
    );
    describe_counter!(
        "seatledger_ledger_keys_written_total",
        "Total number of keys written by committed transactions"
    );
    describe_counter!(
        "seatledger_ledger_conflicts_total",
        "Total number of commits rejected by optimistic concurrency control"
    );
    describe_histogram!(
        "seatledger_commit_duration_seconds",
        "Time taken to commit a transaction"
    );

    // Events
    describe_counter!(
        "seatledger_events_published_total",
        "Total number of domain events delivered"
    );
    describe_counter!(
        "seatledger_event_publish_errors_total",
        "Total number of domain events dropped after a failed delivery"
    );

    // Retry
    describe_counter!(
        "seatledger_retries_total",
        "Total number of invocations re-run after a conflict"
    );
    describe_counter!(
        "seatledger_retry_successes_total",
        "Total number of invocations that succeeded after at least one retry"
    );
    describe_counter!(
        "seatledger_retries_exhausted_total",
        "Total number of invocations that gave up after max retries"
    );
}

/// Ledger metrics recorder.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record a successful commit.
    pub fn record_commit(operation: &'static str, written: usize, duration: Duration) {
        counter!("seatledger_ledger_commits_total", "operation" => operation).increment(1);
        counter!("seatledger_ledger_keys_written_total").increment(written as u64);
        histogram!("seatledger_commit_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a commit rejected by a concurrency conflict.
    pub fn record_conflict(operation: &'static str) {
        counter!("seatledger_ledger_conflicts_total", "operation" => operation).increment(1);
    }
}

/// Event delivery metrics recorder.
pub struct EventMetrics;

impl EventMetrics {
    /// Record a delivered event.
    pub fn record_published() {
        counter!("seatledger_events_published_total").increment(1);
    }

    /// Record a dropped event.
    pub fn record_publish_error() {
        counter!("seatledger_event_publish_errors_total").increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("seatledger_retries_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("seatledger_retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("seatledger_retries_exhausted_total").increment(1);
    }
}
