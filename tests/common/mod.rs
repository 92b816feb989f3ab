//! Shared helpers for binding tests.

#![allow(dead_code)]

use live_bindings::{MemoryCollection, Record};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Install a tracing subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn rec(id: &str, n: i64) -> Record {
    Record::new(id).with("n", n)
}

pub fn n_of(record: &Record) -> i64 {
    record.get("n").and_then(|v| v.as_i64()).unwrap_or_default()
}

pub fn ids(items: &[Record]) -> Vec<String> {
    items.iter().map(|r| r.id.to_string()).collect()
}

pub fn values(items: &[Record]) -> Vec<i64> {
    items.iter().map(n_of).collect()
}

pub fn source_with(name: &str, records: Vec<Record>) -> Arc<MemoryCollection<Record>> {
    init_tracing();
    Arc::new(MemoryCollection::new(name).with_records(records))
}

/// `count` records with ids `r00`, `r01`, ... and `n` equal to their index.
pub fn numbered(count: usize) -> Vec<Record> {
    (0..count).map(|i| rec(&format!("r{i:02}"), i as i64)).collect()
}

/// Poll `condition` until it holds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..5000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

/// Await `future` with a generous timeout.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("timed out")
}
