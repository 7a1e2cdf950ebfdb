//! Outbound fetch metrics
//!
//! Tracks latency percentiles and success rates for printings fetches.

use crate::constants::METRICS_WINDOW;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Metrics for the printings provider
#[derive(Debug, Clone, PartialEq)]
pub struct FetchMetrics {
    /// Name of the provider
    pub provider_name: String,
    /// 50th percentile latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of fetches tracked
    pub total_requests: u64,
    /// Number of failed fetches
    pub failed_requests: u64,
}

impl FetchMetrics {
    /// Creates metrics with no data
    pub fn empty(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    total: u64,
    failed: u64,
}

/// Collects and computes fetch metrics
pub struct MetricsCollector {
    provider_name: String,
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            counters: RwLock::new(Counters {
                samples: VecDeque::with_capacity(METRICS_WINDOW),
                total: 0,
                failed: 0,
            }),
        }
    }

    /// Records a fetch with its duration and success status
    pub async fn record_request(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.total += 1;
        if !success {
            counters.failed += 1;
        }

        if counters.samples.len() >= METRICS_WINDOW {
            counters.samples.pop_front();
        }
        counters.samples.push_back(LatencySample {
            duration_ms: duration.as_micros() as f64 / 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> FetchMetrics {
        let counters = self.counters.read().await;
        if counters.samples.is_empty() {
            return FetchMetrics::empty(&self.provider_name);
        }

        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        let success_rate = if counters.total > 0 {
            (counters.total - counters.failed) as f64 / counters.total as f64
        } else {
            1.0
        };

        FetchMetrics {
            provider_name: self.provider_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: counters.total,
            failed_requests: counters.failed,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
