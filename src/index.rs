//! Index trait and the tagged choice between index variants

use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::dataset::VectorDataset;
use crate::distance::DistanceMetric;
use crate::error::{NnsError, Result};
use crate::flat_index::BruteForceIndex;
use crate::hnsw::{HnswIndex, HnswParams};
use crate::lsh::{HashIndex, LshParams};
use crate::topk::Candidate;

/// A nearest-neighbor index over a fixed-dimension vector collection.
///
/// Ids are dense dataset positions. Results are sorted ascending by
/// `(distance, id)` and hold at most `min(k, len)` unique ids.
pub trait Index: Send + Sync {
    /// Which algorithm backs this index.
    fn kind(&self) -> IndexKind;

    /// The distance metric used by this index.
    fn metric(&self) -> DistanceMetric;

    /// The vectors this index searches over.
    fn vectors(&self) -> &VectorDataset;

    fn dimension(&self) -> usize {
        self.vectors().dimension()
    }

    fn len(&self) -> usize {
        self.vectors().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Search for the `k` nearest neighbors of `query`.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>>;

    /// Run every row of `queries` as an independent search, in parallel.
    fn search_batch(&self, queries: &VectorDataset, k: usize) -> Result<Vec<Vec<Candidate>>> {
        if queries.dimension() != self.dimension() {
            return Err(NnsError::DimensionMismatch {
                expected: self.dimension(),
                actual: queries.dimension(),
            });
        }
        queries.par_rows().map(|query| self.search(query, k)).collect()
    }

    /// Append a vector and return its id. Only the graph index supports this.
    fn insert(&mut self, _vector: &[f32]) -> Result<usize> {
        Err(NnsError::InsertUnsupported {
            kind: self.kind().name(),
        })
    }
}

pub(crate) fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(NnsError::invalid("k", "must be at least 1"));
    }
    Ok(())
}

/// The available index algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    BruteForce,
    Hash,
    Hnsw,
}

impl IndexKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::BruteForce => "brute_force",
            IndexKind::Hash => "hash",
            IndexKind::Hnsw => "hnsw",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An index algorithm together with its tuning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexParams {
    BruteForce,
    Hash(LshParams),
    Hnsw(HnswParams),
}

impl IndexParams {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexParams::BruteForce => IndexKind::BruteForce,
            IndexParams::Hash(_) => IndexKind::Hash,
            IndexParams::Hnsw(_) => IndexKind::Hnsw,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            IndexParams::BruteForce => Ok(()),
            IndexParams::Hash(params) => params.validate(),
            IndexParams::Hnsw(params) => params.validate(),
        }
    }
}

/// One built index of any kind, usable through the [`Index`] trait.
#[derive(Debug)]
pub enum AnyIndex {
    BruteForce(BruteForceIndex),
    Hash(HashIndex),
    Hnsw(HnswIndex),
}

impl AnyIndex {
    /// Build the index described by `params` over `dataset`.
    ///
    /// `rng` seeds every randomized choice (hyperplanes, layer draws); the
    /// graph index keeps it for later insertions.
    pub fn build(
        dataset: Arc<VectorDataset>,
        metric: DistanceMetric,
        params: &IndexParams,
        mut rng: StdRng,
    ) -> Result<Self> {
        params.validate()?;
        let index = match params {
            IndexParams::BruteForce => {
                AnyIndex::BruteForce(BruteForceIndex::build(dataset, metric))
            }
            IndexParams::Hash(lsh) => {
                AnyIndex::Hash(HashIndex::build(dataset, metric, lsh.clone(), &mut rng)?)
            }
            IndexParams::Hnsw(hnsw) => {
                AnyIndex::Hnsw(HnswIndex::build(&dataset, metric, hnsw.clone(), rng)?)
            }
        };
        Ok(index)
    }

    fn as_index(&self) -> &dyn Index {
        match self {
            AnyIndex::BruteForce(index) => index,
            AnyIndex::Hash(index) => index,
            AnyIndex::Hnsw(index) => index,
        }
    }

    fn as_index_mut(&mut self) -> &mut dyn Index {
        match self {
            AnyIndex::BruteForce(index) => index,
            AnyIndex::Hash(index) => index,
            AnyIndex::Hnsw(index) => index,
        }
    }
}

impl Index for AnyIndex {
    fn kind(&self) -> IndexKind {
        self.as_index().kind()
    }

    fn metric(&self) -> DistanceMetric {
        self.as_index().metric()
    }

    fn vectors(&self) -> &VectorDataset {
        self.as_index().vectors()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>> {
        self.as_index().search(query, k)
    }

    fn search_batch(&self, queries: &VectorDataset, k: usize) -> Result<Vec<Vec<Candidate>>> {
        self.as_index().search_batch(queries, k)
    }

    fn insert(&mut self, vector: &[f32]) -> Result<usize> {
        self.as_index_mut().insert(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn dataset() -> Arc<VectorDataset> {
        Arc::new(
            VectorDataset::from_rows(
                3,
                vec![
                    vec![1.0, 0.0, 0.0],
                    vec![0.0, 1.0, 0.0],
                    vec![0.0, 0.0, 1.0],
                    vec![1.0, 1.0, 0.0],
                ],
            )
            .unwrap(),
        )
    }

    fn all_params() -> Vec<IndexParams> {
        vec![
            IndexParams::BruteForce,
            IndexParams::Hash(LshParams::new(4, 2, 2)),
            IndexParams::Hnsw(HnswParams::new(4, 16, 16)),
        ]
    }

    #[test]
    fn test_every_kind_finds_exact_match() {
        for params in all_params() {
            let index = AnyIndex::build(
                dataset(),
                DistanceMetric::SquaredEuclidean,
                &params,
                StdRng::seed_from_u64(1),
            )
            .unwrap();
            assert_eq!(index.kind(), params.kind());
            assert_eq!(index.len(), 4);

            let results = index.search(&[1.0, 0.0, 0.0], 1).unwrap();
            assert_eq!(results[0].id, 0, "{} missed exact match", params.kind());
            assert_eq!(results[0].distance, 0.0);
        }
    }

    #[test]
    fn test_insert_only_on_graph_index() {
        for params in all_params() {
            let mut index = AnyIndex::build(
                dataset(),
                DistanceMetric::SquaredEuclidean,
                &params,
                StdRng::seed_from_u64(1),
            )
            .unwrap();
            let result = index.insert(&[0.5, 0.5, 0.5]);
            match params.kind() {
                IndexKind::Hnsw => assert_eq!(result.unwrap(), 4),
                _ => assert!(matches!(result, Err(NnsError::InsertUnsupported { .. }))),
            }
        }
    }

    #[test]
    fn test_search_batch_matches_single_queries() {
        let index = AnyIndex::build(
            dataset(),
            DistanceMetric::SquaredEuclidean,
            &IndexParams::BruteForce,
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        let queries =
            VectorDataset::from_rows(3, vec![vec![0.0, 1.0, 0.1], vec![0.9, 0.9, 0.0]]).unwrap();
        let batch = index.search_batch(&queries, 2).unwrap();
        assert_eq!(batch.len(), 2);
        for (i, query) in queries.iter() {
            assert_eq!(batch[i], index.search(query, 2).unwrap());
        }
    }

    #[test]
    fn test_search_batch_dimension_mismatch() {
        let index = AnyIndex::build(
            dataset(),
            DistanceMetric::SquaredEuclidean,
            &IndexParams::BruteForce,
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        let queries = VectorDataset::from_rows(2, vec![vec![0.0, 1.0]]).unwrap();
        assert!(matches!(
            index.search_batch(&queries, 1),
            Err(NnsError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_params_rejected_before_build() {
        let result = AnyIndex::build(
            dataset(),
            DistanceMetric::SquaredEuclidean,
            &IndexParams::Hash(LshParams::new(0, 4, 0)),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(NnsError::InvalidParameter { name: "num_tables", .. })));
    }
}
