//! Latency statistics for benchmark runs.

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Collects per-query latencies and summarizes them.
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    samples_us: Vec<f64>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one query's duration.
    pub fn record(&mut self, duration: Duration) {
        self.samples_us.push(duration.as_secs_f64() * 1e6);
    }

    pub fn count(&self) -> usize {
        self.samples_us.len()
    }

    /// Raw samples in recording order, in microseconds.
    pub fn samples_us(&self) -> &[f64] {
        &self.samples_us
    }

    /// Mean latency in microseconds.
    pub fn mean_us(&self) -> f64 {
        if self.samples_us.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples_us.iter().sum();
        sum / self.samples_us.len() as f64
    }

    /// Get a percentile of latency (e.g., 50.0, 95.0, 99.0) in microseconds.
    pub fn percentile_us(&self, percentile: f64) -> f64 {
        if self.samples_us.is_empty() {
            return 0.0;
        }

        let mut sorted = self.samples_us.clone();
        sorted.sort_by(f64::total_cmp);

        let index = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[index.min(sorted.len() - 1)]
    }
}

#[derive(Serialize)]
struct LatencySummary<'a> {
    count: usize,
    mean_us: f64,
    p50_us: f64,
    p95_us: f64,
    p99_us: f64,
    samples_us: &'a [f64],
}

impl Serialize for LatencyStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        LatencySummary {
            count: self.count(),
            mean_us: self.mean_us(),
            p50_us: self.percentile_us(50.0),
            p95_us: self.percentile_us(95.0),
            p99_us: self.percentile_us(99.0),
            samples_us: &self.samples_us,
        }
        .serialize(serializer)
    }
}
