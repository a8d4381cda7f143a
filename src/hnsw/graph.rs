//! HNSW graph: layered proximity links, insertion and layered search.
//!
//! Implements the Hierarchical Navigable Small World graph from:
//! "Efficient and robust approximate nearest neighbor search using
//!  Hierarchical Navigable Small World graphs" (Malkov & Yashunin, 2016/2018).
//!
//! Nodes live in an arena indexed by their dataset id; neighbor lists hold ids,
//! never references. Insertion takes `&mut self`, so one insertion completes
//! before the next begins and searches (`&self`) never observe a half-linked
//! node.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::dataset::VectorDataset;
use crate::distance::DistanceMetric;
use crate::error::{NnsError, Result};
use crate::index::check_k;
use crate::topk::{Candidate, TopKSelector};

use super::neighbor_queue::CandidateQueue;

/// Configuration parameters for the HNSW index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Max number of connections per node (layers > 0).
    pub m: usize,
    /// Max connections at layer 0 (typically 2 * m).
    pub m_max0: usize,
    /// Number of candidates during construction.
    pub ef_construction: usize,
    /// Number of candidates during search.
    pub ef_search: usize,
    /// Level generation factor: 1 / ln(m).
    pub ml: f64,
    /// Maximum number of layers.
    pub max_layers: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::new(
            config::HNSW_DEFAULT_M,
            config::HNSW_DEFAULT_EF_CONSTRUCTION,
            config::HNSW_DEFAULT_EF_SEARCH,
        )
    }
}

impl HnswParams {
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            m,
            m_max0: 2 * m,
            ef_construction,
            ef_search,
            ml: level_multiplier(m),
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(NnsError::invalid("m", "must be at least 1"));
        }
        if self.m_max0 == 0 {
            return Err(NnsError::invalid("m_max0", "must be at least 1"));
        }
        if self.ef_construction < self.m {
            return Err(NnsError::invalid(
                "ef_construction",
                format!("must be at least m ({}), got {}", self.m, self.ef_construction),
            ));
        }
        if self.ef_search == 0 {
            return Err(NnsError::invalid("ef_search", "must be at least 1"));
        }
        if !(self.ml.is_finite() && self.ml > 0.0) {
            return Err(NnsError::invalid(
                "ml",
                format!("must be finite and positive, got {}", self.ml),
            ));
        }
        if self.max_layers == 0 {
            return Err(NnsError::invalid("max_layers", "must be at least 1"));
        }
        Ok(())
    }
}

/// `1 / ln(m)`; `m = 1` would divide by zero, so it is treated as `m = 2`.
fn level_multiplier(m: usize) -> f64 {
    1.0 / (m.max(2) as f64).ln()
}

/// A node in the HNSW graph.
#[derive(Debug, Clone)]
struct HnswNode {
    /// The top layer this node was assigned.
    level: usize,
    /// Neighbors per layer. neighbors[l] is the list of neighbor IDs at layer l.
    neighbors: Vec<Vec<usize>>,
}

/// Links chosen for a new node, one entry per layer from the top down.
type LinkPlan = Vec<(usize, Vec<usize>)>;

/// The HNSW graph structure.
#[derive(Debug)]
pub struct HnswGraph {
    /// Vector arena; a node's id is its row here.
    vectors: VectorDataset,
    /// Nodes indexed by id, parallel to `vectors`.
    nodes: Vec<HnswNode>,
    /// Entry point node ID (highest-level node, lowest id on ties).
    entry_point: Option<usize>,
    /// Current maximum level in the graph.
    max_level: usize,
    params: HnswParams,
    metric: DistanceMetric,
    /// Injected RNG for level generation.
    rng: StdRng,
}

impl HnswGraph {
    pub fn new(
        dimension: usize,
        metric: DistanceMetric,
        params: HnswParams,
        rng: StdRng,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            vectors: VectorDataset::new(dimension)?,
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            params,
            metric,
            rng,
        })
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn vectors(&self) -> &VectorDataset {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn entry_point(&self) -> Option<usize> {
        self.entry_point
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Top layer assigned to node `id`.
    pub fn level(&self, id: usize) -> Option<usize> {
        self.nodes.get(id).map(|n| n.level)
    }

    /// Neighbor list of node `id` at `layer`, if the node reaches that layer.
    pub fn neighbors(&self, id: usize, layer: usize) -> Option<&[usize]> {
        self.nodes
            .get(id)
            .and_then(|n| n.neighbors.get(layer))
            .map(Vec::as_slice)
    }

    fn neighbors_or_empty(&self, id: usize, layer: usize) -> &[usize] {
        self.neighbors(id, layer).unwrap_or(&[])
    }

    /// Max neighbors a node may keep at `layer`.
    fn capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m_max0
        } else {
            self.params.m
        }
    }

    /// Generate a random level for a new node.
    fn random_level(&mut self) -> usize {
        let r: f64 = self.rng.gen();
        let level = (-r.ln() * self.params.ml).floor() as usize;
        level.min(self.params.max_layers - 1)
    }

    fn distance_to(&self, query: &[f32], id: usize) -> f32 {
        self.vectors
            .get(id)
            .map(|v| self.metric.distance(query, v))
            .unwrap_or(f32::INFINITY)
    }

    fn entry_candidate(&self, query: &[f32]) -> Result<Candidate> {
        let ep = self.entry_point.ok_or(NnsError::EmptyDataset {
            operation: "graph descent",
        })?;
        Ok(Candidate::new(ep, self.distance_to(query, ep)))
    }

    /// Single-best greedy walk at one layer: move to the closest neighbor until
    /// nothing improves.
    fn greedy_closest(&self, query: &[f32], mut current: Candidate, layer: usize) -> Candidate {
        loop {
            let mut best = current;
            for &neighbor_id in self.neighbors_or_empty(current.id, layer) {
                let c = Candidate::new(neighbor_id, self.distance_to(query, neighbor_id));
                if c < best {
                    best = c;
                }
            }
            if best == current {
                return current;
            }
            current = best;
        }
    }

    /// SEARCH-LAYER: Algorithm 2 from the HNSW paper.
    ///
    /// Beam search of one layer from `entry_points`, keeping the `ef` closest
    /// nodes found. Returns them ascending by distance.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[Candidate],
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let mut visited: HashSet<usize> = entry_points.iter().map(|c| c.id).collect();
        let mut candidates = CandidateQueue::new(); // closest candidate on top
        let mut results = TopKSelector::new(ef); // furthest result on top

        for &ep in entry_points {
            candidates.push(ep);
            results.push(ep);
        }

        while let Some(c) = candidates.pop() {
            // If the closest candidate is further than the furthest result, stop
            if matches!(results.worst(), Some(furthest) if c > *furthest) {
                break;
            }

            for &neighbor_id in self.neighbors_or_empty(c.id, layer) {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                let neighbor = Candidate::new(neighbor_id, self.distance_to(query, neighbor_id));
                if results.accepts(&neighbor) {
                    candidates.push(neighbor);
                    results.push(neighbor);
                }
            }
        }

        results.into_sorted_vec()
    }

    /// SELECT-NEIGHBORS-HEURISTIC: Algorithm 4 from the HNSW paper.
    ///
    /// `candidates` must be sorted ascending by distance to the base point.
    /// A candidate is skipped when it is closer to an already selected
    /// neighbor than to the base point.
    fn select_neighbors(&self, candidates: &[Candidate], m: usize) -> Vec<usize> {
        let mut selected: Vec<Candidate> = Vec::with_capacity(m);
        for &candidate in candidates {
            if selected.len() >= m {
                break;
            }
            let vector = match self.vectors.get(candidate.id) {
                Some(v) => v,
                None => continue,
            };
            let dominated = selected
                .iter()
                .any(|s| self.distance_to(vector, s.id) < candidate.distance);
            if !dominated {
                selected.push(candidate);
            }
        }
        selected.into_iter().map(|c| c.id).collect()
    }

    /// Shrink a node's neighbor list at `layer` back to `m` with the heuristic.
    fn prune_neighbors(&mut self, node_id: usize, layer: usize, m: usize) {
        let kept = {
            let base = match self.vectors.get(node_id) {
                Some(v) => v,
                None => return,
            };
            let mut scored: Vec<Candidate> = self
                .neighbors_or_empty(node_id, layer)
                .iter()
                .map(|&id| Candidate::new(id, self.distance_to(base, id)))
                .collect();
            scored.sort();
            self.select_neighbors(&scored, m)
        };

        if let Some(list) = self
            .nodes
            .get_mut(node_id)
            .and_then(|n| n.neighbors.get_mut(layer))
        {
            *list = kept;
        }
    }

    /// Decide the links of a vector that would enter at `level`, without
    /// touching the graph.
    fn plan_links(&self, vector: &[f32], level: usize) -> Result<LinkPlan> {
        let mut current = self.entry_candidate(vector)?;

        // Phase 1: Greedy descent from top layer down to level+1
        for layer in (level + 1..=self.max_level).rev() {
            current = self.greedy_closest(vector, current, layer);
        }

        // Phase 2: beam search and neighbor selection from min(level, max_level) down to 0
        let mut plan = Vec::new();
        let mut entry_points = vec![current];
        for layer in (0..=level.min(self.max_level)).rev() {
            let found =
                self.search_layer(vector, &entry_points, self.params.ef_construction, layer);
            plan.push((layer, self.select_neighbors(&found, self.capacity(layer))));
            entry_points = found;
        }
        Ok(plan)
    }

    /// INSERT: Algorithm 1 from the HNSW paper. Returns the new node's id.
    ///
    /// The vector is validated and every layer's links are planned before the
    /// graph is modified, so a failed insert leaves the graph untouched.
    pub fn insert(&mut self, vector: &[f32]) -> Result<usize> {
        self.vectors.check_dimension(vector)?;

        let level = self.random_level();
        let plan = match self.entry_point {
            Some(_) => self.plan_links(vector, level)?,
            None => LinkPlan::new(),
        };

        let id = self.vectors.push(vector)?;
        self.nodes.push(HnswNode {
            level,
            neighbors: vec![Vec::new(); level + 1],
        });

        // Add bidirectional connections, pruning neighbors that overflow
        for (layer, selected) in plan {
            let m = self.capacity(layer);
            for &neighbor_id in &selected {
                let needs_pruning = match self
                    .nodes
                    .get_mut(neighbor_id)
                    .and_then(|n| n.neighbors.get_mut(layer))
                {
                    Some(list) => {
                        list.push(id);
                        list.len() > m
                    }
                    None => false,
                };
                if needs_pruning {
                    self.prune_neighbors(neighbor_id, layer, m);
                }
            }
            self.nodes[id].neighbors[layer] = selected;
        }

        // First node, or new node has a higher level: it becomes the entry point
        if self.entry_point.is_none() || level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }

        Ok(id)
    }

    /// SEARCH: Algorithm 5 from the HNSW paper.
    ///
    /// `ef` is raised to at least `k`. An empty graph yields an empty result.
    pub fn search_knn(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<Candidate>> {
        check_k(k)?;
        if ef == 0 {
            return Err(NnsError::invalid("ef_search", "must be at least 1"));
        }
        self.vectors.check_dimension(query)?;
        if self.is_empty() {
            return Ok(vec![]);
        }

        let mut current = self.entry_candidate(query)?;

        // Phase 1: Greedy descent from top layer to layer 1
        for layer in (1..=self.max_level).rev() {
            current = self.greedy_closest(query, current, layer);
        }

        // Phase 2: Search layer 0 with max(ef, k) candidates
        let found = self.search_layer(query, &[current], ef.max(k), 0);

        let mut selector = TopKSelector::new(k);
        selector.extend(found);
        Ok(selector.into_sorted_vec())
    }
}
