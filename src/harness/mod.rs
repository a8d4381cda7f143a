//! Recall and latency benchmark comparing the approximate indexes against
//! an exact brute-force scan.

pub mod format;

pub use format::BenchmarkData;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{
    BENCH_DEFAULT_DIM, BENCH_DEFAULT_K, BENCH_DEFAULT_N, BENCH_DEFAULT_QUERIES, DEFAULT_SEED,
};
use crate::dataset::VectorDataset;
use crate::distance::DistanceMetric;
use crate::error::{NnsError, Result};
use crate::flat_index::BruteForceIndex;
use crate::hnsw::HnswParams;
use crate::index::{check_k, AnyIndex, Index, IndexKind, IndexParams};
use crate::lsh::LshParams;
use crate::metrics::LatencyStats;
use crate::topk::Candidate;

/// Benchmark sizes and the parameters for both approximate indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub n: usize,
    pub d: usize,
    pub k: usize,
    pub nq: usize,
    pub seed: u64,
    pub metric: DistanceMetric,
    pub lsh: LshParams,
    pub hnsw: HnswParams,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            n: BENCH_DEFAULT_N,
            d: BENCH_DEFAULT_DIM,
            k: BENCH_DEFAULT_K,
            nq: BENCH_DEFAULT_QUERIES,
            seed: DEFAULT_SEED,
            metric: DistanceMetric::default(),
            lsh: LshParams::default(),
            hnsw: HnswParams::default(),
        }
    }
}

/// Results for one approximate index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub kind: IndexKind,
    pub build_ms: f64,
    /// Mean of `per_query_recall`.
    pub recall_at_k: f64,
    pub per_query_recall: Vec<f64>,
    /// Queries whose first result is the exact nearest neighbor.
    pub top1_hits: usize,
    pub latency: LatencyStats,
    /// Ground-truth mean latency divided by this index's mean latency.
    pub speedup: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub n: usize,
    pub d: usize,
    pub k: usize,
    pub nq: usize,
    pub metric: DistanceMetric,
    pub ground_truth_latency: LatencyStats,
    pub indexes: Vec<IndexReport>,
}

impl BenchmarkReport {
    pub fn index(&self, kind: IndexKind) -> Option<&IndexReport> {
        self.indexes.iter().find(|report| report.kind == kind)
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "n={} d={} k={} nq={} metric={}",
            self.n, self.d, self.k, self.nq, self.metric
        )?;
        writeln!(
            f,
            "{:<12} {:>10} {:>10} {:>8} {:>12} {:>12} {:>9}",
            "index", "build_ms", "recall@k", "top1", "mean_us", "p95_us", "speedup"
        )?;
        writeln!(
            f,
            "{:<12} {:>10} {:>10.4} {:>8} {:>12.1} {:>12.1} {:>9.2}",
            IndexKind::BruteForce.name(),
            "-",
            1.0,
            format!("{}/{}", self.nq, self.nq),
            self.ground_truth_latency.mean_us(),
            self.ground_truth_latency.percentile_us(95.0),
            1.0
        )?;
        for report in &self.indexes {
            writeln!(
                f,
                "{:<12} {:>10.1} {:>10.4} {:>8} {:>12.1} {:>12.1} {:>9.2}",
                report.kind.name(),
                report.build_ms,
                report.recall_at_k,
                format!("{}/{}", report.top1_hits, self.nq),
                report.latency.mean_us(),
                report.latency.percentile_us(95.0),
                report.speedup
            )?;
        }
        Ok(())
    }
}

/// Fraction of the exact ids that also appear in the approximate result.
///
/// The denominator is the size of the exact result, i.e. `min(k, n)`. An
/// empty exact result (empty dataset) counts as perfect recall.
pub fn recall_at_k(approx: &[Candidate], exact: &[Candidate]) -> f64 {
    if exact.is_empty() {
        return 1.0;
    }
    let exact_ids: HashSet<usize> = exact.iter().map(|c| c.id).collect();
    let hits = approx
        .iter()
        .map(|c| c.id)
        .collect::<HashSet<usize>>()
        .intersection(&exact_ids)
        .count();
    hits as f64 / exact.len() as f64
}

/// Mean [`recall_at_k`] over paired result lists.
pub fn mean_recall(approx: &[Vec<Candidate>], exact: &[Vec<Candidate>]) -> f64 {
    if exact.is_empty() {
        return 1.0;
    }
    let total: f64 = approx
        .iter()
        .zip(exact)
        .map(|(a, e)| recall_at_k(a, e))
        .sum();
    total / exact.len() as f64
}

/// Exact top-`k` for every query.
pub fn ground_truth(
    dataset: Arc<VectorDataset>,
    metric: DistanceMetric,
    queries: &VectorDataset,
    k: usize,
) -> Result<Vec<Vec<Candidate>>> {
    BruteForceIndex::build(dataset, metric).search_batch(queries, k)
}

pub struct BenchmarkHarness {
    config: BenchmarkConfig,
}

impl BenchmarkHarness {
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        check_k(config.k)?;
        if config.d == 0 {
            return Err(NnsError::invalid("d", "must be at least 1"));
        }
        config.lsh.validate()?;
        config.hnsw.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Synthetic dataset and queries drawn from the configured seed.
    pub fn generate(&self) -> Result<BenchmarkData> {
        let c = &self.config;
        let mut rng = StdRng::seed_from_u64(c.seed);
        BenchmarkData::synthetic(c.n, c.d, c.k, c.nq, &mut rng)
    }

    /// Generate synthetic data and benchmark it.
    pub fn run(&self) -> Result<BenchmarkReport> {
        let data = self.generate()?;
        self.run_on(&data)
    }

    /// Benchmark a prepared dataset. `data.k` overrides the configured `k`.
    pub fn run_on(&self, data: &BenchmarkData) -> Result<BenchmarkReport> {
        check_k(data.k)?;
        let dimension = data.dataset.dimension();
        if data.queries.dimension() != dimension {
            return Err(NnsError::DimensionMismatch {
                expected: dimension,
                actual: data.queries.dimension(),
            });
        }

        let metric = self.config.metric;
        let dataset = Arc::new(data.dataset.clone());

        let brute = BruteForceIndex::build(Arc::clone(&dataset), metric);
        let mut ground_truth_latency = LatencyStats::new();
        let mut truth = Vec::with_capacity(data.queries.len());
        for (_, query) in data.queries.iter() {
            let start = Instant::now();
            truth.push(brute.search(query, data.k)?);
            ground_truth_latency.record(start.elapsed());
        }
        tracing::info!(
            n = dataset.len(),
            nq = data.queries.len(),
            mean_us = ground_truth_latency.mean_us(),
            "Computed brute-force ground truth"
        );

        let candidates = [
            IndexParams::Hash(self.config.lsh.clone()),
            IndexParams::Hnsw(self.config.hnsw.clone()),
        ];
        let mut indexes = Vec::with_capacity(candidates.len());
        for params in &candidates {
            let start = Instant::now();
            let index = AnyIndex::build(
                Arc::clone(&dataset),
                metric,
                params,
                StdRng::seed_from_u64(self.config.seed),
            )?;
            let build_ms = start.elapsed().as_secs_f64() * 1e3;
            let report = evaluate(&index, build_ms, data, &truth, &ground_truth_latency)?;
            tracing::info!(
                index = %report.kind,
                build_ms = report.build_ms,
                recall = report.recall_at_k,
                top1 = report.top1_hits,
                mean_us = report.latency.mean_us(),
                "Benchmarked index"
            );
            indexes.push(report);
        }

        Ok(BenchmarkReport {
            n: dataset.len(),
            d: dimension,
            k: data.k,
            nq: data.queries.len(),
            metric,
            ground_truth_latency,
            indexes,
        })
    }
}

fn evaluate(
    index: &dyn Index,
    build_ms: f64,
    data: &BenchmarkData,
    truth: &[Vec<Candidate>],
    ground_truth_latency: &LatencyStats,
) -> Result<IndexReport> {
    let mut latency = LatencyStats::new();
    let mut per_query_recall = Vec::with_capacity(truth.len());
    let mut top1_hits = 0;

    for ((_, query), exact) in data.queries.iter().zip(truth) {
        let start = Instant::now();
        let approx = index.search(query, data.k)?;
        latency.record(start.elapsed());

        if let (Some(a), Some(e)) = (approx.first(), exact.first()) {
            if a.id == e.id {
                top1_hits += 1;
            }
        }
        per_query_recall.push(recall_at_k(&approx, exact));
    }

    let recall_at_k = if per_query_recall.is_empty() {
        1.0
    } else {
        per_query_recall.iter().sum::<f64>() / per_query_recall.len() as f64
    };
    let speedup = if latency.mean_us() > 0.0 {
        ground_truth_latency.mean_us() / latency.mean_us()
    } else {
        0.0
    };

    Ok(IndexReport {
        kind: index.kind(),
        build_ms,
        recall_at_k,
        per_query_recall,
        top1_hits,
        latency,
        speedup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[usize]) -> Vec<Candidate> {
        ids.iter().map(|&id| Candidate::new(id, id as f32)).collect()
    }

    fn small_config() -> BenchmarkConfig {
        BenchmarkConfig {
            n: 200,
            d: 8,
            k: 5,
            nq: 6,
            hnsw: HnswParams::new(8, 32, 32),
            ..BenchmarkConfig::default()
        }
    }

    #[test]
    fn test_recall_at_k() {
        assert_eq!(recall_at_k(&ids(&[1, 2, 3, 4]), &ids(&[4, 3, 2, 1])), 1.0);
        assert_eq!(recall_at_k(&ids(&[1, 2, 9, 8]), &ids(&[1, 2, 3, 4])), 0.5);
        assert_eq!(recall_at_k(&[], &ids(&[1, 2])), 0.0);
        assert_eq!(recall_at_k(&[], &[]), 1.0);
    }

    #[test]
    fn test_mean_recall() {
        let approx = vec![ids(&[1, 2]), ids(&[5, 6])];
        let exact = vec![ids(&[1, 2]), ids(&[5, 7])];
        assert_eq!(mean_recall(&approx, &exact), 0.75);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BenchmarkConfig {
            k: 0,
            ..small_config()
        };
        assert!(matches!(
            BenchmarkHarness::new(config),
            Err(NnsError::InvalidParameter { name: "k", .. })
        ));

        let config = BenchmarkConfig {
            lsh: LshParams::new(0, 8, 1),
            ..small_config()
        };
        assert!(BenchmarkHarness::new(config).is_err());
    }

    #[test]
    fn test_generate_is_seeded() {
        let harness = BenchmarkHarness::new(small_config()).unwrap();
        let a = harness.generate().unwrap();
        let b = harness.generate().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dataset.len(), 200);
        assert_eq!(a.queries.len(), 6);
        assert_eq!(a.dataset.dimension(), 8);
    }

    #[test]
    fn test_run_reports_both_indexes() {
        let harness = BenchmarkHarness::new(small_config()).unwrap();
        let report = harness.run().unwrap();

        assert_eq!(report.nq, 6);
        assert_eq!(report.ground_truth_latency.count(), 6);
        assert_eq!(report.indexes.len(), 2);
        for kind in [IndexKind::Hash, IndexKind::Hnsw] {
            let index = report.index(kind).unwrap();
            assert_eq!(index.per_query_recall.len(), 6);
            assert_eq!(index.latency.count(), 6);
            assert!((0.0..=1.0).contains(&index.recall_at_k));
            assert!(index.top1_hits <= 6);
        }
        assert!(report.index(IndexKind::Hnsw).unwrap().recall_at_k > 0.8);
        assert!(report.to_string().contains("hnsw"));
    }

    #[test]
    fn test_run_on_empty_dataset() {
        let harness = BenchmarkHarness::new(small_config()).unwrap();
        let data = BenchmarkData {
            k: 3,
            dataset: VectorDataset::new(4).unwrap(),
            queries: VectorDataset::from_rows(4, [vec![0.0; 4]]).unwrap(),
        };
        let report = harness.run_on(&data).unwrap();
        for index in &report.indexes {
            assert_eq!(index.recall_at_k, 1.0);
            assert_eq!(index.top1_hits, 0);
        }
    }

    #[test]
    fn test_run_on_mismatched_queries() {
        let harness = BenchmarkHarness::new(small_config()).unwrap();
        let data = BenchmarkData {
            k: 3,
            dataset: VectorDataset::from_rows(4, [vec![0.0; 4]]).unwrap(),
            queries: VectorDataset::from_rows(3, [vec![0.0; 3]]).unwrap(),
        };
        assert!(matches!(
            harness.run_on(&data),
            Err(NnsError::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }
}
