//! Subscription lifecycle tests: acquisition, release, degradation and
//! detached contexts.

mod common;

use common::{eventually, ids, n_of, rec, source_with, values, within};
use live_bindings::{
    CollectionBinding, CollectionOptions, ExecutionContext, LoadState, MemoryCollection,
    MemoryStats, PageOptions, PaginatedBinding, Record, RecordBinding, RecordOptions,
};
use std::sync::Arc;
use std::time::Duration;

type Binding = CollectionBinding<MemoryCollection<Record>>;

fn bind(source: &Arc<MemoryCollection<Record>>, options: CollectionOptions<Record>) -> Binding {
    CollectionBinding::new(source.clone(), options, ExecutionContext::live()).unwrap()
}

// --- Release ---

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let source = source_with("tasks", vec![rec("a", 1)]);
    let binding = bind(&source, CollectionOptions::default());

    let observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;
    assert!(binding.is_live());

    binding.teardown().await;
    binding.teardown().await;
    drop(observer);

    assert!(!binding.is_live());
    assert_eq!(source.subscription_count(), 0);
    assert_eq!(source.stats().subscriptions_acquired, 1);
    assert_eq!(source.stats().subscriptions_released, 1);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_while_acquiring_releases_once_acquired() {
    let source = source_with("tasks", vec![]);
    source.set_subscribe_delay(Some(Duration::from_millis(100)));
    let binding = bind(&source, CollectionOptions::default().with_initial(vec![]));

    let observer = binding.subscribe();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(source.stats().subscriptions_acquired, 0);

    observer.unsubscribe().await;

    let stats = source.stats();
    assert_eq!(stats.subscriptions_acquired, 1);
    assert_eq!(stats.subscriptions_released, 1);
    assert_eq!(source.subscription_count(), 0);
}

#[tokio::test]
async fn test_last_observer_releases_stream() {
    let source = source_with("tasks", vec![rec("a", 1)]);
    let binding = bind(&source, CollectionOptions::default());

    let first = binding.subscribe();
    let second = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;
    assert_eq!(binding.observer_count(), 2);

    first.unsubscribe().await;
    assert_eq!(binding.observer_count(), 1);
    assert!(binding.is_live());
    assert_eq!(source.stats().subscriptions_released, 0);

    second.unsubscribe().await;
    assert_eq!(binding.observer_count(), 0);
    assert!(!binding.is_live());
    assert_eq!(source.subscription_count(), 0);

    let stats = source.stats();
    assert_eq!(stats.subscriptions_acquired, 1);
    assert_eq!(stats.subscriptions_released, 1);
}

#[tokio::test]
async fn test_dropped_observer_releases_stream() {
    let source = source_with("tasks", vec![]);
    let binding = bind(&source, CollectionOptions::default());

    let observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;

    drop(observer);
    eventually(|| source.stats().subscriptions_released == 1).await;
    assert_eq!(source.subscription_count(), 0);
}

#[tokio::test]
async fn test_resubscribe_reloads_and_reacquires() {
    let source = source_with("tasks", vec![rec("a", 1)]);
    let binding = bind(&source, CollectionOptions::default());

    let observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;
    observer.unsubscribe().await;

    // Missed while nobody was listening.
    source.create(rec("b", 2)).unwrap();
    assert_eq!(ids(&binding.value()), vec!["a"]);

    let mut observer = binding.subscribe();
    let items = within(observer.wait_for(|items| items.len() == 2))
        .await
        .unwrap();
    eventually(|| source.subscription_count() == 1).await;

    assert_eq!(ids(&items), vec!["a", "b"]);
    let stats = source.stats();
    assert_eq!(stats.list_reads, 2);
    assert_eq!(stats.subscriptions_acquired, 2);
    assert_eq!(stats.subscriptions_released, 1);
}

#[tokio::test]
async fn test_updates_after_reattach_still_apply() {
    let source = source_with("posts", vec![rec("a", 0)]);
    let binding = RecordBinding::new(
        source.clone(),
        "a",
        RecordOptions::default(),
        ExecutionContext::live(),
    )
    .unwrap();

    let mut observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;
    for n in 1..=3 {
        source.update(rec("a", n)).unwrap();
    }
    within(observer.wait_for(|v| v.as_ref().map(n_of) == Some(3))).await;
    observer.unsubscribe().await;

    let mut observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;
    assert_eq!(source.stats().point_reads, 2);

    source.update(rec("a", 100)).unwrap();
    let value = within(observer.wait_for(|v| v.as_ref().map(n_of) == Some(100))).await;
    assert_eq!(value, Some(Some(rec("a", 100))));

    source.delete(&"a".into()).unwrap();
    within(observer.wait_for(|v| v.is_none())).await;
}

#[tokio::test]
async fn test_events_after_reload_apply_to_known_ids() {
    let source = source_with("tasks", vec![rec("a", 1), rec("b", 2)]);
    let binding = bind(&source, CollectionOptions::default());

    let mut observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;
    source.update(rec("a", 10)).unwrap();
    source.update(rec("b", 20)).unwrap();
    within(observer.wait_for(|items| values(items) == vec![10, 20])).await;

    binding.reload().await.unwrap();
    source.update(rec("a", 11)).unwrap();
    source.delete(&"b".into()).unwrap();

    let items = within(observer.wait_for(|items| items.len() == 1))
        .await
        .unwrap();
    assert_eq!(values(&items), vec![11]);
    assert!(binding.is_live());
}

// --- Degradation ---

#[tokio::test]
async fn test_refused_subscription_degrades_to_fetch_only() {
    let source = source_with("tasks", vec![rec("a", 1)]);
    source.refuse_subscriptions(true);
    let binding = bind(&source, CollectionOptions::default());

    let mut observer = binding.subscribe();
    within(observer.wait_for(|items| !items.is_empty())).await;
    eventually(|| !binding.is_live()).await;

    source.create(rec("b", 2)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(ids(&binding.value()), vec!["a"]);
    assert_eq!(binding.state(), LoadState::Loaded);
    assert_eq!(source.stats().subscriptions_acquired, 0);

    // Manual reload still works.
    binding.reload().await.unwrap();
    assert_eq!(ids(&binding.value()), vec!["a", "b"]);
}

#[tokio::test]
async fn test_slow_binding_loses_stream_and_releases() {
    let source = source_with("tasks", vec![]);
    let binding = bind(&source, CollectionOptions::default().with_event_buffer(1));

    let _observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;

    // Emitted without yielding: the buffer holds one event, the rest overflow.
    for i in 0..5 {
        source.create(rec(&format!("t{i}"), i)).unwrap();
    }

    eventually(|| !binding.is_live()).await;
    assert_eq!(source.subscription_count(), 0);
    assert_eq!(source.stats().subscriptions_released, 1);
    assert_eq!(ids(&binding.value()), vec!["t0"]);
}

// --- Detached context ---

#[tokio::test]
async fn test_detached_bindings_are_inert() {
    let source = source_with("tasks", vec![rec("a", 1)]);
    let detached = ExecutionContext::detached();

    let record = RecordBinding::new(
        source.clone(),
        "a",
        RecordOptions::default().with_initial(rec("a", 1)),
        detached,
    )
    .unwrap();
    let collection =
        CollectionBinding::new(source.clone(), CollectionOptions::default(), detached).unwrap();
    let paginated =
        PaginatedBinding::new(source.clone(), PageOptions::default(), detached).unwrap();

    assert!(record.is_inert());
    assert!(collection.is_inert());
    assert!(paginated.is_inert());

    let _record_observer = record.subscribe();
    let _collection_observer = collection.subscribe();
    let _page_observer = paginated.subscribe();

    record.reload().await.unwrap();
    collection.load().await.unwrap();
    assert!(!paginated.set_page(1).await.unwrap());
    assert!(!paginated.next().await.unwrap());
    source.update(rec("a", 2)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(record.value(), None);
    assert!(collection.value().is_empty());
    assert!(paginated.items().is_empty());
    assert_eq!(record.state(), LoadState::Idle);
    assert!(!collection.is_live());
    assert_eq!(source.stats(), MemoryStats::default());
    assert_eq!(source.subscription_count(), 0);
}

#[tokio::test]
async fn test_live_context_is_default() {
    assert_eq!(ExecutionContext::default(), ExecutionContext::live());
    assert!(ExecutionContext::live().has_live_connection);
    assert!(!ExecutionContext::detached().has_live_connection);
}
