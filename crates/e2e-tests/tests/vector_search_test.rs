//! Add/search E2E tests over a live HTTP server.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use e2e_tests::{cosine_similarity, random_vector, unit_vector, TestHarness};
use vecstore_client::Metadata;
use vecstore_types::DEFAULT_K;

fn meta(value: serde_json::Value) -> Metadata {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_add_then_search_returns_exact_match_first() {
    let harness = TestHarness::flat(4).await;
    let client = &harness.client;

    client
        .add("a", vec![1.0, 0.0, 0.0, 0.0], meta(json!({"tag": "x"})))
        .await
        .unwrap();
    client
        .add("b", vec![0.0, 1.0, 0.0, 0.0], Metadata::new())
        .await
        .unwrap();

    let response = client.search(vec![1.0, 0.0, 0.0, 0.0], Some(1)).await.unwrap();
    assert_eq!(response.status, "success");
    assert_eq!(response.count, 1);
    let hit = &response.results[0];
    assert_eq!(hit.id, "a");
    assert_eq!(hit.metadata, meta(json!({"tag": "x"})));
    assert!((hit.score - 1.0).abs() < 1e-5);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.items, 2);
    assert_eq!(health.dimension, 4);
}

#[tokio::test]
async fn test_scores_are_cosine_and_descending() {
    let harness = TestHarness::flat(8).await;
    let mut rng = StdRng::seed_from_u64(7);

    let mut vectors = Vec::new();
    for i in 0..20 {
        let v = random_vector(&mut rng, 8);
        harness
            .client
            .add(&format!("v{}", i), v.clone(), Metadata::new())
            .await
            .unwrap();
        vectors.push(v);
    }

    let query = random_vector(&mut rng, 8);
    let response = harness.client.search(query.clone(), Some(5)).await.unwrap();
    assert_eq!(response.count, 5);

    let scores: Vec<f32> = response.results.iter().map(|h| h.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "scores: {:?}", scores);

    for hit in &response.results {
        let idx: usize = hit.id[1..].parse().unwrap();
        let expected = cosine_similarity(&vectors[idx], &query);
        assert!(
            (hit.score - expected).abs() < 1e-4,
            "{}: {} vs {}",
            hit.id,
            hit.score,
            expected
        );
    }
}

#[tokio::test]
async fn test_default_k_and_k_larger_than_store() {
    let harness = TestHarness::flat(8).await;
    for i in 0..8 {
        harness
            .client
            .add(&format!("axis-{}", i), unit_vector(8, i), Metadata::new())
            .await
            .unwrap();
    }

    let response = harness.client.search(vec![1.0; 8], None).await.unwrap();
    assert_eq!(response.count, DEFAULT_K);

    let response = harness.client.search(vec![1.0; 8], Some(50)).await.unwrap();
    assert_eq!(response.count, 8);
    assert_eq!(response.results.len(), 8);
}

#[tokio::test]
async fn test_search_empty_store() {
    let harness = TestHarness::flat(3).await;
    let response = harness.client.search(vec![1.0, 0.0, 0.0], Some(3)).await.unwrap();
    assert_eq!(response.status, "success");
    assert_eq!(response.count, 0);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_hnsw_finds_inserted_vectors() {
    let harness = TestHarness::hnsw(16).await;
    let mut rng = StdRng::seed_from_u64(42);

    let mut vectors = Vec::new();
    for i in 0..50 {
        let v = random_vector(&mut rng, 16);
        harness
            .client
            .add(&format!("doc-{}", i), v.clone(), meta(json!({"n": i})))
            .await
            .unwrap();
        vectors.push(v);
    }

    for probe in [0usize, 17, 49] {
        let response = harness
            .client
            .search(vectors[probe].clone(), Some(1))
            .await
            .unwrap();
        let hit = &response.results[0];
        assert_eq!(hit.id, format!("doc-{}", probe));
        assert_eq!(hit.metadata["n"], probe);
        assert!(hit.score > 0.99);
    }
}

#[tokio::test]
async fn test_status_reports_configured_capacity_after_growth() {
    let config = vecstore_index::EngineConfig::new(vecstore_types::EngineKind::Flat, 2)
        .with_capacity(3);
    let harness = TestHarness::start(config).await;

    for i in 0..5 {
        harness
            .client
            .add(&format!("p{}", i), vec![1.0, i as f32], Metadata::new())
            .await
            .unwrap();
    }

    let status = harness.client.status().await.unwrap();
    assert_eq!(status.status, "running");
    assert_eq!(status.items, 5);
    assert_eq!(status.max_elements, 3);
    assert!(harness.store.stats().capacity >= 5);
}

#[tokio::test]
async fn test_concurrent_adds_all_land() {
    let harness = TestHarness::flat(4).await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = harness.client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .add(&format!("c{}", i), unit_vector(4, i), Metadata::new())
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(harness.client.health().await.unwrap().items, 16);
    let mut slots: Vec<u64> = (0..16)
        .flat_map(|i| harness.store.slots_for_id(&format!("c{}", i)))
        .collect();
    slots.sort_unstable();
    assert_eq!(slots, (0..16).collect::<Vec<u64>>());
}
