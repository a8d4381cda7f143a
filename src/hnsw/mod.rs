//! HNSW (Hierarchical Navigable Small World) index module.

pub mod graph;
pub mod neighbor_queue;

pub use graph::{HnswGraph, HnswParams};

use rand::rngs::StdRng;

use crate::dataset::VectorDataset;
use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::{Index, IndexKind};
use crate::topk::Candidate;

/// An HNSW-based approximate nearest neighbor index.
///
/// The only index kind that accepts vectors after the initial build. There
/// is no deletion; removal means rebuilding from a filtered dataset.
#[derive(Debug)]
pub struct HnswIndex {
    graph: HnswGraph,
}

impl HnswIndex {
    /// Create an empty index. `rng` drives layer assignment for every insert.
    pub fn new(
        dimension: usize,
        metric: DistanceMetric,
        params: HnswParams,
        rng: StdRng,
    ) -> Result<Self> {
        Ok(Self {
            graph: HnswGraph::new(dimension, metric, params, rng)?,
        })
    }

    /// Build the index by inserting every vector of `dataset` in id order.
    pub fn build(
        dataset: &VectorDataset,
        metric: DistanceMetric,
        params: HnswParams,
        rng: StdRng,
    ) -> Result<Self> {
        let mut index = Self::new(dataset.dimension(), metric, params, rng)?;
        for (_, vector) in dataset.iter() {
            index.graph.insert(vector)?;
        }
        tracing::debug!(
            nodes = index.graph.len(),
            max_level = index.graph.max_level(),
            entry_point = ?index.graph.entry_point(),
            "hnsw index built"
        );
        Ok(index)
    }

    /// Search with a specific ef value for runtime tuning.
    pub fn search_with_ef(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<Candidate>> {
        self.graph.search_knn(query, k, ef)
    }

    /// Read access to the underlying graph.
    pub fn graph(&self) -> &HnswGraph {
        &self.graph
    }
}

impl Index for HnswIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Hnsw
    }

    fn metric(&self) -> DistanceMetric {
        self.graph.metric()
    }

    fn vectors(&self) -> &VectorDataset {
        self.graph.vectors()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>> {
        self.graph.search_knn(query, k, self.graph.params().ef_search)
    }

    fn insert(&mut self, vector: &[f32]) -> Result<usize> {
        self.graph.insert(vector)
    }
}
