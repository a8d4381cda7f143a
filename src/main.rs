//! CLI for generating benchmark data, running benchmarks and ad-hoc search

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use nns_engine::config;
use nns_engine::vector::parse_components;
use nns_engine::{
    BenchmarkConfig, BenchmarkData, BenchmarkHarness, DistanceMetric, Engine, EngineConfig,
    HnswParams, IndexParams, LshParams,
};

#[derive(Parser)]
#[command(name = "nns_engine")]
#[command(about = "Nearest-neighbor search engine: brute force, LSH and HNSW", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum IndexType {
    Brute,
    Hash,
    Hnsw,
}

#[derive(ValueEnum, Clone, Copy)]
enum Metric {
    Euclidean,
    Cosine,
}

impl From<Metric> for DistanceMetric {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Euclidean => DistanceMetric::SquaredEuclidean,
            Metric::Cosine => DistanceMetric::Cosine,
        }
    }
}

/// Tuning flags shared by `bench` and `search`.
#[derive(Args)]
struct IndexArgs {
    /// Distance metric
    #[arg(long, value_enum, default_value = "euclidean")]
    metric: Metric,

    /// Number of LSH tables (L)
    #[arg(long, default_value_t = config::LSH_DEFAULT_TABLES)]
    tables: usize,

    /// Hyperplanes per LSH table (h)
    #[arg(long, default_value_t = config::LSH_DEFAULT_BITS)]
    bits: usize,

    /// Multi-probe Hamming radius
    #[arg(long, default_value_t = config::LSH_DEFAULT_PROBE_RADIUS)]
    probe: usize,

    /// Fall back to a full scan when no LSH bucket matches
    #[arg(long)]
    exhaustive_fallback: bool,

    /// HNSW links per node (M)
    #[arg(long, default_value_t = config::HNSW_DEFAULT_M)]
    m: usize,

    /// HNSW candidate list size during construction
    #[arg(long, default_value_t = config::HNSW_DEFAULT_EF_CONSTRUCTION)]
    ef_construction: usize,

    /// HNSW candidate list size during search
    #[arg(long, default_value_t = config::HNSW_DEFAULT_EF_SEARCH)]
    ef_search: usize,

    /// Seed for data generation and index randomness
    #[arg(long, default_value_t = config::DEFAULT_SEED)]
    seed: u64,
}

impl IndexArgs {
    fn lsh(&self) -> LshParams {
        LshParams::new(self.tables, self.bits, self.probe)
            .with_exhaustive_fallback(self.exhaustive_fallback)
    }

    fn hnsw(&self) -> HnswParams {
        HnswParams::new(self.m, self.ef_construction, self.ef_search)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic benchmark file
    Generate {
        /// Number of dataset vectors
        #[arg(short, long, default_value_t = config::BENCH_DEFAULT_N)]
        n: usize,
        /// Vector dimension
        #[arg(short, long, default_value_t = config::BENCH_DEFAULT_DIM)]
        d: usize,
        /// Neighbors to evaluate
        #[arg(short, long, default_value_t = config::BENCH_DEFAULT_K)]
        k: usize,
        /// Number of queries
        #[arg(long, default_value_t = config::BENCH_DEFAULT_QUERIES)]
        nq: usize,
        #[arg(long, default_value_t = config::DEFAULT_SEED)]
        seed: u64,
        /// Output path
        #[arg(short, long, default_value = "input.txt")]
        output: PathBuf,
    },
    /// Compare LSH and HNSW against brute force
    Bench {
        /// Benchmark file; synthetic data is generated when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value_t = config::BENCH_DEFAULT_N)]
        n: usize,
        #[arg(short, long, default_value_t = config::BENCH_DEFAULT_DIM)]
        d: usize,
        #[arg(short, long, default_value_t = config::BENCH_DEFAULT_K)]
        k: usize,
        #[arg(long, default_value_t = config::BENCH_DEFAULT_QUERIES)]
        nq: usize,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Search the dataset of a benchmark file
    Search {
        /// Benchmark file providing the dataset
        #[arg(short, long)]
        input: PathBuf,
        /// Index type to search with
        #[arg(long, value_enum, default_value = "hnsw")]
        index_type: IndexType,
        /// Query vector as comma-separated values (e.g., "1.0,2.0,3.0")
        query: String,
        /// Number of results to return
        #[arg(short, long, default_value = "5")]
        k: usize,
        #[command(flatten)]
        index: IndexArgs,
    },
}

fn generate(n: usize, d: usize, k: usize, nq: usize, seed: u64, output: PathBuf) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = BenchmarkData::synthetic(n, d, k, nq, &mut rng)?;
    data.write_file(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {} vectors and {} queries to {}", n, nq, output.display());
    Ok(())
}

fn bench(input: Option<PathBuf>, config: BenchmarkConfig, json: bool) -> Result<()> {
    let harness = BenchmarkHarness::new(config)?;
    let report = match input {
        Some(path) => {
            let data = BenchmarkData::read_file(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            harness.run_on(&data)?
        }
        None => harness.run()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn search(
    input: PathBuf,
    index_type: IndexType,
    query: &str,
    k: usize,
    args: &IndexArgs,
) -> Result<()> {
    let data = BenchmarkData::read_file(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let params = match index_type {
        IndexType::Brute => IndexParams::BruteForce,
        IndexType::Hash => IndexParams::Hash(args.lsh()),
        IndexType::Hnsw => IndexParams::Hnsw(args.hnsw()),
    };

    let engine = Engine::new(EngineConfig::new(args.metric.into(), params).with_seed(args.seed))?;
    engine.build(data.dataset)?;

    let q = parse_components(query)?;
    let results = engine.search(&q, k)?;

    if results.is_empty() {
        println!("No results found");
    } else {
        println!("Top {} results:", results.len());
        for (i, result) in results.iter().enumerate() {
            println!("{}. {} (distance: {:.4})", i + 1, result.id, result.distance);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            n,
            d,
            k,
            nq,
            seed,
            output,
        } => generate(n, d, k, nq, seed, output),
        Commands::Bench {
            input,
            n,
            d,
            k,
            nq,
            json,
            index,
        } => {
            let config = BenchmarkConfig {
                n,
                d,
                k,
                nq,
                seed: index.seed,
                metric: index.metric.into(),
                lsh: index.lsh(),
                hnsw: index.hnsw(),
            };
            bench(input, config, json)
        }
        Commands::Search {
            input,
            index_type,
            query,
            k,
            index,
        } => search(input, index_type, &query, k, &index),
    }
}
