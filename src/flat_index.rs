//! Brute-force flat index: exact O(n·d) k-NN search and the ground-truth oracle

use std::sync::Arc;
use std::time::Instant;

use crate::config::SCAN_BATCH;
use crate::dataset::VectorDataset;
use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::{check_k, Index, IndexKind};
use crate::topk::{Candidate, TopKSelector};

/// A flat index that computes the distance to every stored vector.
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    vectors: Arc<VectorDataset>,
    metric: DistanceMetric,
}

/// Outcome of a scan bounded by a deadline.
#[derive(Debug, Clone)]
pub struct PartialSearch {
    /// Best top-k among the vectors scanned.
    pub results: Vec<Candidate>,
    /// Number of vectors compared before stopping.
    pub scanned: usize,
    /// Whether every vector was compared.
    pub complete: bool,
}

impl BruteForceIndex {
    /// Wrap a dataset. No preprocessing happens beyond sharing the storage.
    pub fn build(vectors: Arc<VectorDataset>, metric: DistanceMetric) -> Self {
        Self { vectors, metric }
    }

    /// Exact search that stops early once `deadline` has passed.
    ///
    /// The deadline is checked between batches of [`SCAN_BATCH`] comparisons,
    /// so an aborted scan still returns a consistent best-so-far top-k.
    pub fn search_until(
        &self,
        query: &[f32],
        k: usize,
        deadline: Instant,
    ) -> Result<PartialSearch> {
        check_k(k)?;
        self.vectors.check_dimension(query)?;

        let mut selector = TopKSelector::new(k.min(self.vectors.len()));
        let mut scanned = 0;
        for (id, vector) in self.vectors.iter() {
            if scanned % SCAN_BATCH == 0 && scanned > 0 && Instant::now() >= deadline {
                tracing::warn!(
                    scanned,
                    total = self.vectors.len(),
                    "brute-force scan hit deadline"
                );
                return Ok(PartialSearch {
                    results: selector.into_sorted_vec(),
                    scanned,
                    complete: false,
                });
            }
            selector.push(Candidate::new(id, self.metric.distance(query, vector)));
            scanned += 1;
        }

        Ok(PartialSearch {
            results: selector.into_sorted_vec(),
            scanned,
            complete: true,
        })
    }
}

impl Index for BruteForceIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::BruteForce
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn vectors(&self) -> &VectorDataset {
        &self.vectors
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>> {
        check_k(k)?;
        self.vectors.check_dimension(query)?;

        let mut selector = TopKSelector::new(k.min(self.vectors.len()));
        selector.extend(
            self.vectors
                .iter()
                .map(|(id, vector)| Candidate::new(id, self.metric.distance(query, vector))),
        );
        Ok(selector.into_sorted_vec())
    }
}
