use std::{path::Path, time::Duration};

use order_etl_engine::{
    test_utils::{envelope, prepare_test_env, random_file_name, write_export_file, MemoryStore, RawOrderBuilder},
    AnalyticsStore,
    EtlPipeline,
    PipelineConfig,
    PipelineError,
    RetryPolicy,
    StoreTable,
};
use serde_json::json;

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: dir.to_path_buf(),
        batch_size: 3,
        poll_interval: Duration::from_millis(50),
        retry: RetryPolicy { max_attempts: 10, delay: Duration::from_millis(50) },
        ..Default::default()
    }
}

fn orders(ids: std::ops::RangeInclusive<u64>) -> serde_json::Value {
    envelope(ids.map(|id| RawOrderBuilder::new().id(id).line_items(2).build()).collect())
}

async fn wait_for_orders(store: &MemoryStore, n: u64) -> bool {
    for _ in 0..100 {
        if store.count_rows(StoreTable::Orders).await.unwrap() >= n {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn bulk_pass_loads_existing_files() {
    prepare_test_env();
    let dir = tempfile::tempdir().unwrap();
    write_export_file(dir.path(), "a.json", &orders(1..=4));
    write_export_file(dir.path(), "b.json", &orders(5..=6));
    write_export_file(dir.path(), "customers.json", &json!({"customers": []}));
    write_export_file(dir.path(), "broken.json", &json!({"orders": 17}));
    std::fs::write(dir.path().join("c.json"), "{ not json").unwrap();
    std::fs::write(dir.path().join("ignored.csv"), "id,name").unwrap();

    let store = MemoryStore::new();
    let pipeline = EtlPipeline::in_memory(store.clone(), config(dir.path())).unwrap();
    let summary = pipeline.run_bulk_pass().await.unwrap();
    assert_eq!(summary.extracted, 6);
    assert_eq!(summary.transformed, 6);
    assert_eq!(summary.items, 12);
    assert_eq!(store.order_insert_calls(), vec![3, 3]);
    assert_eq!(store.count_rows(StoreTable::OrderItems).await.unwrap(), 12);
}

#[tokio::test]
async fn bulk_pass_is_idempotent() {
    prepare_test_env();
    let dir = tempfile::tempdir().unwrap();
    write_export_file(dir.path(), "a.json", &orders(1..=4));
    let store = MemoryStore::new();
    let pipeline = EtlPipeline::in_memory(store.clone(), config(dir.path())).unwrap();
    pipeline.run_bulk_pass().await.unwrap();
    pipeline.run_bulk_pass().await.unwrap();
    assert_eq!(store.count_rows(StoreTable::Orders).await.unwrap(), 4);
    assert_eq!(store.orders().len(), 4);
}

#[tokio::test]
async fn missing_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = EtlPipeline::in_memory(MemoryStore::new(), config(&dir.path().join("missing"))).unwrap_err();
    assert!(matches!(err, PipelineError::Extract(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn new_files_are_picked_up_by_the_live_loop() {
    prepare_test_env();
    let dir = tempfile::tempdir().unwrap();
    write_export_file(dir.path(), "existing.json", &orders(1..=2));
    let store = MemoryStore::new();
    let pipeline = EtlPipeline::in_memory(store.clone(), config(dir.path())).unwrap();
    pipeline.run().await.unwrap();
    assert_eq!(store.count_rows(StoreTable::Orders).await.unwrap(), 2);

    write_export_file(dir.path(), &random_file_name("live"), &orders(10..=12));
    assert!(wait_for_orders(&store, 5).await, "Live file was not loaded");

    pipeline.stop().await;
    pipeline.stop().await;
    write_export_file(dir.path(), &random_file_name("late"), &orders(20..=20));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.count_rows(StoreTable::Orders).await.unwrap(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_bulk_load_does_not_block_the_live_loop() {
    prepare_test_env();
    let dir = tempfile::tempdir().unwrap();
    write_export_file(dir.path(), "existing.json", &orders(1..=2));
    let store = MemoryStore::new();
    store.fail_order_insert_on_call(1);
    let pipeline = EtlPipeline::in_memory(store.clone(), config(dir.path())).unwrap();
    pipeline.run().await.unwrap();
    assert_eq!(store.count_rows(StoreTable::Orders).await.unwrap(), 0);

    write_export_file(dir.path(), &random_file_name("live"), &orders(7..=8));
    assert!(wait_for_orders(&store, 2).await, "Live file was not loaded");
    pipeline.stop().await;
}
