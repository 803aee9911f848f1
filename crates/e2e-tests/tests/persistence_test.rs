//! Restart E2E tests: state written by one server is served by the next.

use std::fs;

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{unit_vector, TestHarness};
use vecstore_client::Metadata;
use vecstore_index::{EngineConfig, INDEX_FILE};
use vecstore_types::EngineKind;

#[tokio::test]
async fn test_restart_preserves_vectors_and_metadata() {
    let harness = TestHarness::flat(4).await;
    let metadata = json!({"source": "doc.md", "chunk": 3})
        .as_object()
        .cloned()
        .unwrap();
    harness
        .client
        .add("kept", vec![0.0, 0.0, 1.0, 0.0], metadata.clone())
        .await
        .unwrap();
    harness
        .client
        .add("other", vec![1.0, 0.0, 0.0, 0.0], Metadata::new())
        .await
        .unwrap();

    let harness = harness.restart().await;

    assert_eq!(harness.client.health().await.unwrap().items, 2);
    let response = harness
        .client
        .search(vec![0.0, 0.0, 1.0, 0.0], Some(1))
        .await
        .unwrap();
    assert_eq!(response.results[0].id, "kept");
    assert_eq!(response.results[0].metadata, metadata);
}

#[tokio::test]
async fn test_inserts_after_restart_continue_slot_sequence() {
    let harness = TestHarness::flat(4).await;
    for i in 0..3 {
        harness
            .client
            .add(&format!("before-{}", i), unit_vector(4, i), Metadata::new())
            .await
            .unwrap();
    }

    let harness = harness.restart().await;
    harness
        .client
        .add("after", unit_vector(4, 3), Metadata::new())
        .await
        .unwrap();

    assert_eq!(harness.store.slots_for_id("after"), vec![3]);
    assert_eq!(harness.store.len(), 4);

    let response = harness.client.search(unit_vector(4, 0), Some(4)).await.unwrap();
    assert_eq!(response.count, 4);
    assert_eq!(response.results[0].id, "before-0");
}

#[tokio::test]
async fn test_hnsw_state_survives_restart_after_growth() {
    let config = EngineConfig::new(EngineKind::Hnsw, 8).with_capacity(4);
    let harness = TestHarness::start(config).await;
    for i in 0..10 {
        let mut v = unit_vector(8, i);
        v[(i + 1) % 8] = 0.25;
        harness
            .client
            .add(&format!("h{}", i), v, Metadata::new())
            .await
            .unwrap();
    }

    let harness = harness.restart().await;
    let status = harness.client.status().await.unwrap();
    assert_eq!(status.items, 10);
    assert_eq!(status.max_elements, 4);

    let mut query = unit_vector(8, 2);
    query[3] = 0.25;
    let response = harness.client.search(query, Some(1)).await.unwrap();
    assert_eq!(response.results[0].id, "h2");

    // The restored index is full, so this insert goes through growth
    let late = vec![0.5, 0.5, 0.0, 0.0, 0.5, 0.0, 0.0, 0.5];
    harness
        .client
        .add("late", late.clone(), Metadata::new())
        .await
        .unwrap();
    assert_eq!(harness.client.status().await.unwrap().items, 11);

    let response = harness.client.search(late, Some(1)).await.unwrap();
    assert_eq!(response.results[0].id, "late");
    assert!(response.results[0].score > 0.99);
}

#[tokio::test]
async fn test_corrupt_blob_starts_fresh_and_is_kept_aside() {
    let mut harness = TestHarness::flat(4).await;
    harness
        .client
        .add("lost", unit_vector(4, 0), Metadata::new())
        .await
        .unwrap();
    harness.stop().await;

    let index_path = harness.data_dir().join(INDEX_FILE);
    fs::write(&index_path, b"definitely not a store").unwrap();

    let harness = harness.restart().await;
    assert_eq!(harness.client.health().await.unwrap().items, 0);

    let quarantined: Vec<String> = fs::read_dir(harness.data_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(&format!("{}.corrupt-", INDEX_FILE)))
        .collect();
    assert_eq!(quarantined.len(), 1);

    // The fresh store is fully usable and persists again
    harness
        .client
        .add("fresh", unit_vector(4, 1), Metadata::new())
        .await
        .unwrap();
    let harness = harness.restart().await;
    assert_eq!(harness.client.health().await.unwrap().items, 1);
}

#[tokio::test]
async fn test_empty_store_restarts_empty() {
    let harness = TestHarness::flat(4).await;
    let harness = harness.restart().await;
    let health = harness.client.health().await.unwrap();
    assert_eq!(health.items, 0);
    assert_eq!(health.dimension, 4);
}
