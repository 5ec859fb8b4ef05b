//! Observability: in-process metrics for the signal pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Metrics collector for tracking engine health.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

struct MetricsInner {
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    histograms: HashMap<String, Vec<f64>>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner {
                counters: HashMap::new(),
                gauges: HashMap::new(),
                histograms: HashMap::new(),
                start_time: Instant::now(),
            })),
        }
    }

    /// Increment a counter
    pub async fn increment(&self, name: &str, value: u64) {
        let mut inner = self.inner.write().await;
        let counter = inner.counters.entry(name.to_string()).or_insert(0);
        *counter += value;
    }

    /// Set a gauge value
    pub async fn gauge(&self, name: &str, value: f64) {
        let mut inner = self.inner.write().await;
        inner.gauges.insert(name.to_string(), value);
    }

    /// Record a histogram value
    pub async fn histogram(&self, name: &str, value: f64) {
        let mut inner = self.inner.write().await;
        inner
            .histograms
            .entry(name.to_string())
            .or_insert_with(Vec::new)
            .push(value);
    }

    /// Get all metrics as JSON-serializable format
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read().await;
        let histogram_means = inner
            .histograms
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| {
                (
                    name.clone(),
                    values.iter().sum::<f64>() / values.len() as f64,
                )
            })
            .collect();
        MetricsSnapshot {
            counters: inner.counters.clone(),
            gauges: inner.gauges.clone(),
            histogram_means,
            uptime_secs: inner.start_time.elapsed().as_secs(),
        }
    }

    /// Get specific counter
    pub async fn get_counter(&self, name: &str) -> u64 {
        let inner = self.inner.read().await;
        inner.counters.get(name).copied().unwrap_or(0)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub histogram_means: HashMap<String, f64>,
    pub uptime_secs: u64,
}

/// Predefined metric names
pub mod metrics {
    // Signal pipeline
    pub const SIGNAL_REQUESTS: &str = "signal_requests_total";
    pub const SIGNAL_BUY: &str = "signal_buy_total";
    pub const SIGNAL_SELL: &str = "signal_sell_total";
    pub const SIGNAL_NONE: &str = "signal_no_signal_total";
    pub const SIGNAL_EVAL_DURATION_MS: &str = "signal_eval_duration_ms";

    // Input quality
    pub const VALIDATION_ERRORS: &str = "validation_errors_total";
    pub const UNKNOWN_LABELS: &str = "unknown_labels_total";

    // API
    pub const API_ERRORS: &str = "api_errors_total";
    pub const UNAUTHORIZED: &str = "unauthorized_total";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        tokio_test::block_on(async {
            let collector = MetricsCollector::new();
            collector.increment(metrics::SIGNAL_REQUESTS, 1).await;
            collector.increment(metrics::SIGNAL_REQUESTS, 2).await;
            assert_eq!(collector.get_counter(metrics::SIGNAL_REQUESTS).await, 3);
        });
    }

    #[test]
    fn snapshot_includes_histogram_means() {
        tokio_test::block_on(async {
            let collector = MetricsCollector::new();
            collector.histogram(metrics::SIGNAL_EVAL_DURATION_MS, 2.0).await;
            collector.histogram(metrics::SIGNAL_EVAL_DURATION_MS, 4.0).await;
            let snapshot = collector.snapshot().await;
            assert_eq!(
                snapshot.histogram_means[metrics::SIGNAL_EVAL_DURATION_MS],
                3.0
            );
        });
    }
}
