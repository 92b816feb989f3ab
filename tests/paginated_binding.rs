//! Paginated binding tests.

mod common;

use common::{eventually, ids, n_of, numbered, rec, source_with, within};
use live_bindings::{
    ExecutionContext, ListPolicy, MemoryCollection, PageOptions, PageWindow, PaginatedBinding,
    Record, RecordId, SubscriptionScope,
};
use std::sync::Arc;

type Binding = PaginatedBinding<MemoryCollection<Record>>;

fn bind(source: &Arc<MemoryCollection<Record>>, options: PageOptions<Record>) -> Binding {
    PaginatedBinding::new(source.clone(), options, ExecutionContext::live()).unwrap()
}

/// 45 records at 20 per page: pages of 20, 20 and 5.
fn forty_five() -> Arc<MemoryCollection<Record>> {
    source_with("items", numbered(45))
}

// --- Loading ---

#[tokio::test]
async fn test_loads_first_page_by_default() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());

    binding.load().await.unwrap();
    let window = binding.value();

    assert_eq!(window.page, 1);
    assert_eq!(window.per_page, 20);
    assert_eq!(window.total_items, 45);
    assert_eq!(window.total_pages, 3);
    assert_eq!(window.items.len(), 20);
    assert_eq!(window.items[0].id, RecordId::from("r00"));
    assert_eq!(source.stats().page_reads, 1);
}

#[tokio::test]
async fn test_loads_requested_page() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default().with_page(3, 20));

    binding.load().await.unwrap();

    assert_eq!(binding.page(), 3);
    assert_eq!(ids(&binding.items()), vec!["r40", "r41", "r42", "r43", "r44"]);
}

#[tokio::test]
async fn test_initial_window_skips_fetch() {
    let source = forty_five();
    let initial = PageWindow {
        items: vec![rec("seed", 0)],
        page: 1,
        per_page: 20,
        total_items: 1,
        total_pages: 1,
    };
    let binding = bind(&source, PageOptions::default().with_initial(initial));

    let _observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;

    assert_eq!(ids(&binding.items()), vec!["seed"]);
    assert_eq!(source.stats().page_reads, 0);
}

// --- Live events ---

#[tokio::test]
async fn test_listens_to_whole_collection() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());

    let _observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;

    assert_eq!(
        source.subscription_scopes(),
        vec![SubscriptionScope::Collection]
    );
}

#[tokio::test]
async fn test_events_touch_items_not_metadata() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());

    let mut observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;

    source.create(rec("new", 100)).unwrap();
    let window = within(observer.wait_for(|w| w.items.len() == 21))
        .await
        .unwrap();

    assert_eq!(window.items.last().map(|r| r.id.as_str()), Some("new"));
    assert_eq!(window.page, 1);
    assert_eq!(window.total_items, 45);
    assert_eq!(window.total_pages, 3);
}

#[tokio::test]
async fn test_events_sorted_and_filtered_on_page() {
    let source = source_with("items", numbered(5));
    let policy = ListPolicy::new()
        .sorted_by(|a: &Record, b: &Record| n_of(b).cmp(&n_of(a)))
        .retain(|r| n_of(r) % 2 == 0);
    let binding = bind(&source, PageOptions::default().with_policy(policy));

    let mut observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;
    assert_eq!(ids(&binding.items()), vec!["r04", "r02", "r00"]);

    source.create(rec("big", 10)).unwrap();
    source.create(rec("odd", 11)).unwrap();
    let window = within(observer.wait_for(|w| w.items.len() == 4))
        .await
        .unwrap();

    assert_eq!(ids(&window.items), vec!["big", "r04", "r02", "r00"]);
}

// --- Navigation ---

#[tokio::test]
async fn test_set_page_resets_local_mutations() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());

    let mut observer = binding.subscribe();
    eventually(|| source.subscription_count() == 1).await;

    source.delete(&RecordId::from("r00")).unwrap();
    within(observer.wait_for(|w| w.items.len() == 19)).await;

    assert!(binding.set_page(2).await.unwrap());

    let window = binding.value();
    assert_eq!(window.page, 2);
    assert_eq!(window.items.len(), 20);
    // r00 is gone from the source, so page 2 starts one record later.
    assert_eq!(window.items[0].id, RecordId::from("r21"));
    assert_eq!(window.total_items, 44);
    assert_eq!(source.stats().page_reads, 2);
}

#[tokio::test]
async fn test_out_of_range_navigation_is_noop() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());
    binding.load().await.unwrap();
    let before = binding.value();

    assert!(!binding.set_page(0).await.unwrap());
    assert!(!binding.set_page(4).await.unwrap());

    assert_eq!(binding.value(), before);
    assert_eq!(source.stats().page_reads, 1);
}

#[tokio::test]
async fn test_next_and_prev_stop_at_bounds() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());
    binding.load().await.unwrap();

    assert!(!binding.prev().await.unwrap());
    assert!(binding.next().await.unwrap());
    assert!(binding.next().await.unwrap());
    assert_eq!(binding.page(), 3);
    assert_eq!(binding.items().len(), 5);

    assert!(!binding.next().await.unwrap());
    assert!(binding.prev().await.unwrap());
    assert_eq!(binding.page(), 2);
    assert_eq!(source.stats().page_reads, 4);
}

#[tokio::test]
async fn test_navigation_before_load_is_noop() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());

    assert_eq!(binding.total_pages(), 0);
    assert!(!binding.set_page(1).await.unwrap());
    assert_eq!(source.stats().page_reads, 0);
}

#[tokio::test]
async fn test_reload_refetches_current_page() {
    let source = forty_five();
    let binding = bind(&source, PageOptions::default());
    binding.load().await.unwrap();
    binding.set_page(2).await.unwrap();

    source.create(rec("extra", 99)).unwrap();
    binding.reload().await.unwrap();

    let window = binding.value();
    assert_eq!(window.page, 2);
    assert_eq!(window.total_items, 46);
    assert_eq!(source.stats().page_reads, 3);
}
