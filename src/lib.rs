//! # NNS Engine
//!
//! Nearest-neighbor search over fixed-dimension `f32` vectors.
//!
//! This library provides:
//! - Distance metrics (squared Euclidean, cosine)
//! - Exact brute-force search, used as ground truth
//! - Random-hyperplane LSH with multi-probe lookup
//! - An HNSW graph index with incremental insertion
//! - A benchmark harness measuring recall@k and latency
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use nns_engine::{BruteForceIndex, DistanceMetric, Index, VectorDataset};
//!
//! let dataset = VectorDataset::from_rows(
//!     3,
//!     vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![1.1, 2.1, 3.1]],
//! )
//! .unwrap();
//! let index = BruteForceIndex::build(Arc::new(dataset), DistanceMetric::SquaredEuclidean);
//!
//! let results = index.search(&[1.0, 2.0, 3.0], 2).unwrap();
//! assert_eq!(results[0].id, 0);
//! assert_eq!(results[1].id, 2);
//! ```

pub mod config;
pub mod dataset;
pub mod distance;
pub mod engine;
pub mod error;
pub mod flat_index;
pub mod harness;
pub mod hnsw;
pub mod index;
pub mod lsh;
pub mod metrics;
pub mod topk;
pub mod vector;

pub use dataset::VectorDataset;
pub use distance::DistanceMetric;
pub use engine::{Engine, EngineConfig};
pub use error::{NnsError, Result};
pub use flat_index::{BruteForceIndex, PartialSearch};
pub use harness::{BenchmarkConfig, BenchmarkData, BenchmarkHarness, BenchmarkReport};
pub use hnsw::{HnswIndex, HnswParams};
pub use index::{AnyIndex, Index, IndexKind, IndexParams};
pub use lsh::{HashIndex, LshParams};
pub use metrics::LatencyStats;
pub use topk::{Candidate, TopKSelector};
