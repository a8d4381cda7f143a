//! Engine handle: one index of a configured kind behind a readers-writer lock.
//!
//! Searches take the read lock and may run from any number of threads at once.
//! Insertion and (re)build take the write lock, so at most one mutation is in
//! flight and no search ever observes it half-done.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config;
use crate::dataset::VectorDataset;
use crate::distance::DistanceMetric;
use crate::error::{NnsError, Result};
use crate::hnsw::HnswIndex;
use crate::index::{AnyIndex, Index, IndexKind, IndexParams};
use crate::topk::Candidate;

/// How the engine builds its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub metric: DistanceMetric,
    pub params: IndexParams,
    /// Seed for every randomized choice the index makes.
    pub seed: u64,
}

impl EngineConfig {
    pub fn new(metric: DistanceMetric, params: IndexParams) -> Self {
        Self {
            metric,
            params,
            seed: config::DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Owns at most one built index and serializes mutations against searches.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    index: RwLock<Option<AnyIndex>>,
}

impl Engine {
    /// Create an engine with no index yet. Parameters are validated here.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.params.validate()?;
        Ok(Self {
            config,
            index: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn kind(&self) -> IndexKind {
        self.config.params.kind()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<AnyIndex>> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<AnyIndex>> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_index(&self, dataset: VectorDataset) -> Result<AnyIndex> {
        let rng = StdRng::seed_from_u64(self.config.seed);
        AnyIndex::build(Arc::new(dataset), self.config.metric, &self.config.params, rng)
    }

    /// Build (or replace) the index over `dataset`.
    pub fn build(&self, dataset: VectorDataset) -> Result<()> {
        let n = dataset.len();
        let index = self.build_index(dataset)?;
        *self.write() = Some(index);
        tracing::info!(kind = %self.kind(), vectors = n, "index built");
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.read().is_some()
    }

    /// Number of indexed vectors; zero before the first build.
    pub fn len(&self) -> usize {
        self.read().as_ref().map_or(0, |index| index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Search for the `k` nearest neighbors of `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>> {
        match self.read().as_ref() {
            Some(index) => index.search(query, k),
            None => Err(NnsError::IndexNotBuilt),
        }
    }

    /// Run each row of `queries` as an independent search.
    pub fn search_batch(&self, queries: &VectorDataset, k: usize) -> Result<Vec<Vec<Candidate>>> {
        match self.read().as_ref() {
            Some(index) => index.search_batch(queries, k),
            None => Err(NnsError::IndexNotBuilt),
        }
    }

    /// Append one vector and return its id.
    ///
    /// Only graph indexes accept insertion. A graph engine that has not been
    /// built yet starts an empty graph with the vector's dimension.
    pub fn insert(&self, vector: &[f32]) -> Result<usize> {
        let mut guard = self.write();
        match guard.as_mut() {
            Some(index) => index.insert(vector),
            None => match &self.config.params {
                IndexParams::Hnsw(params) => {
                    let mut index = HnswIndex::new(
                        vector.len(),
                        self.config.metric,
                        params.clone(),
                        StdRng::seed_from_u64(self.config.seed),
                    )?;
                    let id = index.insert(vector)?;
                    *guard = Some(AnyIndex::Hnsw(index));
                    Ok(id)
                }
                _ => Err(NnsError::IndexNotBuilt),
            },
        }
    }

    /// Remove `ids` by rebuilding from the remaining vectors.
    ///
    /// Surviving vectors are renumbered densely; the returned vector maps each
    /// new id to its previous id.
    pub fn rebuild_without(&self, ids: &[usize]) -> Result<Vec<usize>> {
        let mut guard = self.write();
        let index = guard.as_ref().ok_or(NnsError::IndexNotBuilt)?;
        let (dataset, old_ids) = index.vectors().filtered(|id, _| !ids.contains(&id));
        let removed = index.len() - dataset.len();
        *guard = Some(self.build_index(dataset)?);
        tracing::info!(kind = %self.kind(), removed, remaining = old_ids.len(), "index rebuilt");
        Ok(old_ids)
    }
}
