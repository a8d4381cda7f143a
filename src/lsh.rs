//! Random-hyperplane locality-sensitive hashing index.
//!
//! Each of the `L` tables owns `h` random unit normals. A vector's signature in
//! a table is the `h`-bit pattern of signs of its projections onto those
//! normals; vectors sharing a signature share a bucket. A query gathers the ids
//! in its own bucket (plus buckets within the multi-probe Hamming radius) from
//! every table and ranks the union exactly.

use ndarray::{Array2, ArrayView1};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config;
use crate::dataset::VectorDataset;
use crate::distance::DistanceMetric;
use crate::error::{NnsError, Result};
use crate::index::{check_k, Index, IndexKind};
use crate::topk::{Candidate, TopKSelector};
use crate::vector::normalize;

/// Configuration parameters for the hash index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LshParams {
    /// Number of independent tables (`L`). More tables raise recall and cost.
    pub num_tables: usize,
    /// Hyperplanes per table (`h`), i.e. signature width in bits.
    pub num_bits: usize,
    /// Also probe buckets whose signature differs in up to this many bits.
    pub probe_radius: usize,
    /// Scan every vector when probing finds no candidates at all.
    ///
    /// Off by default: an empty probe normally yields an empty result.
    #[serde(default)]
    pub exhaustive_fallback: bool,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            num_tables: config::LSH_DEFAULT_TABLES,
            num_bits: config::LSH_DEFAULT_BITS,
            probe_radius: config::LSH_DEFAULT_PROBE_RADIUS,
            exhaustive_fallback: false,
        }
    }
}

impl LshParams {
    pub fn new(num_tables: usize, num_bits: usize, probe_radius: usize) -> Self {
        Self {
            num_tables,
            num_bits,
            probe_radius,
            exhaustive_fallback: false,
        }
    }

    pub fn with_exhaustive_fallback(mut self, enabled: bool) -> Self {
        self.exhaustive_fallback = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_tables == 0 {
            return Err(NnsError::invalid("num_tables", "must be at least 1"));
        }
        if self.num_bits == 0 || self.num_bits > config::LSH_MAX_BITS {
            return Err(NnsError::invalid(
                "num_bits",
                format!("must be in 1..={}, got {}", config::LSH_MAX_BITS, self.num_bits),
            ));
        }
        if self.probe_radius > self.num_bits {
            return Err(NnsError::invalid(
                "probe_radius",
                format!("must not exceed num_bits ({})", self.num_bits),
            ));
        }
        Ok(())
    }
}

/// One hash table: fixed hyperplane normals plus signature buckets.
#[derive(Debug, Clone)]
struct HashTable {
    /// `h x d`, one unit normal per row. Never regenerated after build.
    normals: Array2<f32>,
    buckets: HashMap<u64, Vec<usize>>,
}

impl HashTable {
    fn random<R: Rng + ?Sized>(num_bits: usize, dimension: usize, rng: &mut R) -> Self {
        let mut normals = Array2::<f32>::random_using((num_bits, dimension), StandardNormal, rng);
        if let Some(data) = normals.as_slice_mut() {
            for row in data.chunks_exact_mut(dimension) {
                // A zero draw is left as is; its bit is then always set.
                normalize(row).ok();
            }
        }
        Self {
            normals,
            buckets: HashMap::new(),
        }
    }

    /// Bit `i` is set when the projection onto normal `i` is non-negative.
    fn signature(&self, vector: &[f32]) -> u64 {
        let projections = self.normals.dot(&ArrayView1::from(vector));
        projections
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p >= 0.0)
            .fold(0u64, |key, (bit, _)| key | (1u64 << bit))
    }
}

/// All signatures within Hamming distance `radius` of `key`, `key` first.
fn probe_keys(key: u64, num_bits: usize, radius: usize) -> Vec<u64> {
    let mut keys = vec![key];
    // (signature, lowest bit still free to flip) keeps each combination unique
    let mut frontier = vec![(key, 0usize)];
    for _ in 0..radius {
        let mut next = Vec::new();
        for &(base, start) in &frontier {
            for bit in start..num_bits {
                let flipped = base ^ (1u64 << bit);
                keys.push(flipped);
                next.push((flipped, bit + 1));
            }
        }
        frontier = next;
    }
    keys
}

/// Number of signatures within Hamming distance `radius` of a `num_bits`-bit key.
fn hamming_ball_size(num_bits: usize, radius: usize) -> u128 {
    let (n, r) = (num_bits as u128, radius.min(num_bits) as u128);
    let mut binomial: u128 = 1;
    let mut total: u128 = 1;
    for i in 0..r {
        // C(n, i + 1) = C(n, i) * (n - i) / (i + 1), exact at every step
        binomial = binomial * (n - i) / (i + 1);
        total += binomial;
    }
    total
}

/// Approximate index that buckets vectors by random-projection signatures.
///
/// When probing gathers no candidates the result is empty rather than a
/// silent brute-force scan, unless [`LshParams::exhaustive_fallback`] is set.
#[derive(Debug, Clone)]
pub struct HashIndex {
    vectors: Arc<VectorDataset>,
    metric: DistanceMetric,
    params: LshParams,
    tables: Vec<HashTable>,
}

impl HashIndex {
    /// Draw the hyperplanes and bucket every vector.
    ///
    /// Tables are drawn from `rng` in order, so with the same seed an index with
    /// more tables extends one with fewer.
    pub fn build<R: Rng + ?Sized>(
        vectors: Arc<VectorDataset>,
        metric: DistanceMetric,
        params: LshParams,
        rng: &mut R,
    ) -> Result<Self> {
        params.validate()?;

        let mut tables = Vec::with_capacity(params.num_tables);
        for _ in 0..params.num_tables {
            tables.push(HashTable::random(params.num_bits, vectors.dimension(), rng));
        }

        // Signatures are independent per vector; buckets are filled in id order.
        let signatures: Vec<Vec<u64>> = vectors
            .par_rows()
            .map(|vector| tables.iter().map(|table| table.signature(vector)).collect())
            .collect();
        for (id, keys) in signatures.into_iter().enumerate() {
            for (table, key) in tables.iter_mut().zip(keys) {
                table.buckets.entry(key).or_default().push(id);
            }
        }

        let index = Self {
            vectors,
            metric,
            params,
            tables,
        };
        tracing::debug!(
            vectors = index.vectors.len(),
            tables = index.params.num_tables,
            bits = index.params.num_bits,
            buckets = index.num_buckets(),
            "hash index built"
        );
        Ok(index)
    }

    pub fn params(&self) -> &LshParams {
        &self.params
    }

    /// Total number of non-empty buckets across all tables.
    pub fn num_buckets(&self) -> usize {
        self.tables.iter().map(|t| t.buckets.len()).sum()
    }

    /// Ids found in the probed buckets of every table, deduplicated.
    fn gather(&self, query: &[f32]) -> HashSet<usize> {
        let radius = self.params.probe_radius;
        let ball = hamming_ball_size(self.params.num_bits, radius);
        let mut ids = HashSet::new();
        for table in &self.tables {
            let key = table.signature(query);
            if ball > table.buckets.len() as u128 {
                // Fewer occupied buckets than probe keys: test each bucket instead.
                for (bucket_key, bucket) in &table.buckets {
                    if ((key ^ bucket_key).count_ones() as usize) <= radius {
                        ids.extend(bucket.iter().copied());
                    }
                }
            } else {
                for probe in probe_keys(key, self.params.num_bits, radius) {
                    if let Some(bucket) = table.buckets.get(&probe) {
                        ids.extend(bucket.iter().copied());
                    }
                }
            }
        }
        ids
    }
}

impl Index for HashIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Hash
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
        if self.vectors.is_empty() {
            return Ok(vec![]);
        }

        let mut ids = self.gather(query);
        if ids.is_empty() {
            if !self.params.exhaustive_fallback {
                tracing::trace!("no bucket matched query");
                return Ok(vec![]);
            }
            ids.extend(0..self.vectors.len());
        }

        let mut selector = TopKSelector::new(k.min(ids.len()));
        selector.extend(ids.into_iter().filter_map(|id| {
            self.vectors
                .get(id)
                .map(|vector| Candidate::new(id, self.metric.distance(query, vector)))
        }));
        Ok(selector.into_sorted_vec())
    }
}
