//! Default tuning parameters and limits.
//!
//! These are compile-time constants; runtime configuration goes through the
//! parameter structs (`HnswParams`, `LshParams`) and the CLI flags in `main.rs`.

/// Default number of links per HNSW node above layer 0.
///
/// Layer 0 uses twice this value.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default candidate list size while inserting into the HNSW graph.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default candidate list size while searching the HNSW graph.
///
/// Always raised to at least `k` at query time.
pub const HNSW_DEFAULT_EF_SEARCH: usize = 50;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_DEFAULT_MAX_LAYERS: usize = 16;

/// Default number of independent LSH tables (`L`).
pub const LSH_DEFAULT_TABLES: usize = 8;

/// Default number of hyperplanes per LSH table (`h`).
pub const LSH_DEFAULT_BITS: usize = 8;

/// Default multi-probe Hamming radius.
pub const LSH_DEFAULT_PROBE_RADIUS: usize = 1;

/// Signatures are packed into a `u64`.
pub const LSH_MAX_BITS: usize = 64;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: u64 = 42;

/// Number of distance computations between deadline checks in a brute-force scan.
pub const SCAN_BATCH: usize = 1024;

/// Benchmark defaults, matching the reference data generator.
pub const BENCH_DEFAULT_N: usize = 1000;
pub const BENCH_DEFAULT_DIM: usize = 1536;
pub const BENCH_DEFAULT_K: usize = 10;
pub const BENCH_DEFAULT_QUERIES: usize = 10;
