//! Integration tests for the search engine

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

use nns_engine::{
    AnyIndex, BenchmarkConfig, BenchmarkData, BenchmarkHarness, BruteForceIndex, DistanceMetric,
    Engine, EngineConfig, HnswParams, Index, IndexKind, IndexParams, LshParams, NnsError,
    VectorDataset,
};

// The hash parameters probe every bucket, so on tiny inputs all three kinds
// return exact results.
fn all_params() -> Vec<IndexParams> {
    vec![
        IndexParams::BruteForce,
        IndexParams::Hash(LshParams::new(4, 2, 2)),
        IndexParams::Hnsw(HnswParams::new(4, 16, 16)),
    ]
}

fn axes() -> VectorDataset {
    VectorDataset::from_rows(
        3,
        vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
    )
    .unwrap()
}

#[test]
fn test_basic_workflow() {
    for params in all_params() {
        let engine =
            Engine::new(EngineConfig::new(DistanceMetric::SquaredEuclidean, params)).unwrap();
        engine.build(axes()).unwrap();
        assert_eq!(engine.len(), 3);

        let results = engine.search(&[1.0, 0.1, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2, "{}", engine.kind());
        assert_eq!(results[0].id, 0);
        assert_eq!(results[1].id, 1);

        // Removal is a rebuild; ids are renumbered densely.
        let old_ids = engine.rebuild_without(&[0]).unwrap();
        assert_eq!(old_ids, vec![1, 2]);
        assert_eq!(engine.len(), 2);
        let results = engine.search(&[1.0, 0.1, 0.0], 1).unwrap();
        assert_eq!(old_ids[results[0].id], 1);
    }
}

#[test]
fn test_different_metrics() {
    for metric in [DistanceMetric::SquaredEuclidean, DistanceMetric::Cosine] {
        for params in all_params() {
            let engine = Engine::new(EngineConfig::new(metric, params)).unwrap();
            let dataset =
                VectorDataset::from_rows(3, vec![vec![1.0, 2.0, 3.0], vec![-3.0, 0.5, 1.0]])
                    .unwrap();
            engine.build(dataset).unwrap();
            let results = engine.search(&[1.0, 2.0, 3.0], 1).unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].id, 0);
        }
    }
}

#[test]
fn test_empty_dataset_for_every_kind() {
    for params in all_params() {
        let index = AnyIndex::build(
            Arc::new(VectorDataset::new(4).unwrap()),
            DistanceMetric::SquaredEuclidean,
            &params,
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[0.0; 4], 5).unwrap().is_empty());
    }
}

#[test]
fn test_k_larger_than_dataset() {
    for params in all_params() {
        let index = AnyIndex::build(
            Arc::new(axes()),
            DistanceMetric::SquaredEuclidean,
            &params,
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        let results = index.search(&[0.0, 0.0, 0.0], 10).unwrap();
        let kind = index.kind();
        assert_eq!(results.len(), 3, "{kind}");
        // All three are at distance 1; ties break by ascending id.
        let ids: Vec<usize> = results.iter().map(|c| c.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted, "{kind}");
    }
}

#[test]
fn test_dimension_mismatch_and_invalid_k() {
    for params in all_params() {
        let index = AnyIndex::build(
            Arc::new(axes()),
            DistanceMetric::SquaredEuclidean,
            &params,
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(NnsError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 0),
            Err(NnsError::InvalidParameter { name: "k", .. })
        ));
    }
}

#[test]
fn test_insert_only_on_graph_index() {
    let flat = Engine::new(EngineConfig::new(
        DistanceMetric::SquaredEuclidean,
        IndexParams::BruteForce,
    ))
    .unwrap();
    flat.build(axes()).unwrap();
    assert!(matches!(
        flat.insert(&[1.0, 1.0, 1.0]),
        Err(NnsError::InsertUnsupported { .. })
    ));

    let graph = Engine::new(EngineConfig::new(
        DistanceMetric::SquaredEuclidean,
        IndexParams::Hnsw(HnswParams::new(4, 16, 16)),
    ))
    .unwrap();
    graph.build(axes()).unwrap();
    assert_eq!(graph.insert(&[1.0, 1.0, 1.0]).unwrap(), 3);
    assert!(matches!(
        graph.insert(&[1.0, 1.0]),
        Err(NnsError::DimensionMismatch { .. })
    ));
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.search(&[0.9, 0.9, 0.9], 1).unwrap()[0].id, 3);
}

#[test]
fn test_batch_search_matches_single_queries() {
    let mut rng = StdRng::seed_from_u64(8);
    let dataset = VectorDataset::random(300, 12, &mut rng).unwrap();
    let queries = VectorDataset::random(20, 12, &mut rng).unwrap();
    for params in all_params() {
        let index = AnyIndex::build(
            Arc::new(dataset.clone()),
            DistanceMetric::SquaredEuclidean,
            &params,
            StdRng::seed_from_u64(8),
        )
        .unwrap();
        let batch = index.search_batch(&queries, 5).unwrap();
        for ((_, q), results) in queries.iter().zip(&batch) {
            assert_eq!(index.search(q, 5).unwrap(), *results);
        }
    }
}

#[test]
fn test_deadline_scan_returns_partial_results() {
    let dataset = VectorDataset::random(5000, 8, &mut StdRng::seed_from_u64(4)).unwrap();
    let index = BruteForceIndex::build(Arc::new(dataset), DistanceMetric::SquaredEuclidean);

    let expired = index
        .search_until(&[0.5; 8], 3, Instant::now() - Duration::from_millis(1))
        .unwrap();
    assert!(!expired.complete);
    assert!(expired.scanned < 5000);

    let full = index
        .search_until(&[0.5; 8], 3, Instant::now() + Duration::from_secs(60))
        .unwrap();
    assert!(full.complete);
    assert_eq!(full.scanned, 5000);
    assert_eq!(full.results, index.search(&[0.5; 8], 3).unwrap());
}

#[test]
fn test_benchmark_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("input.txt");

    let data = BenchmarkData::synthetic(50, 6, 4, 3, &mut StdRng::seed_from_u64(12)).unwrap();
    data.write_file(&path).unwrap();
    let loaded = BenchmarkData::read_file(&path).unwrap();
    assert_eq!(loaded, data);

    let missing = BenchmarkData::read_file(dir.path().join("missing.txt"));
    assert!(matches!(missing, Err(NnsError::IoError(_))));
}

#[test]
fn test_harness_on_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("input.txt");
    BenchmarkData::synthetic(400, 8, 5, 10, &mut StdRng::seed_from_u64(6))
        .unwrap()
        .write_file(&path)
        .unwrap();

    let config = BenchmarkConfig {
        hnsw: HnswParams::new(8, 64, 32),
        ..BenchmarkConfig::default()
    };
    let harness = BenchmarkHarness::new(config).unwrap();
    let report = harness.run_on(&BenchmarkData::read_file(&path).unwrap()).unwrap();

    assert_eq!((report.n, report.d, report.k, report.nq), (400, 8, 5, 10));
    let hnsw = report.index(IndexKind::Hnsw).unwrap();
    assert!(hnsw.recall_at_k >= 0.9, "hnsw recall {}", hnsw.recall_at_k);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["indexes"].as_array().unwrap().len(), 2);
    assert_eq!(json["indexes"][1]["kind"], "hnsw");
    assert_eq!(json["ground_truth_latency"]["count"], 10);
}
