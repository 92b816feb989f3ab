//! In-memory collection source.

use super::manager::{SubscriptionId, SubscriptionManager};
use crate::error::{SourceError, SourceResult};
use crate::source::{CollectionSource, EventSink, LiveSubscription};
use crate::types::{
    ChangeEvent, Entity, PageWindow, QueryParams, RecordId, SubscriptionScope,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Server-side expansion applied on point reads that ask for it.
pub type Expander<E> = Arc<dyn Fn(&E, &str) -> E + Send + Sync>;

/// Call counters for a [`MemoryCollection`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub point_reads: u64,
    pub list_reads: u64,
    pub page_reads: u64,
    pub subscriptions_acquired: u64,
    pub subscriptions_released: u64,
}

#[derive(Default)]
struct Counters {
    point_reads: AtomicU64,
    list_reads: AtomicU64,
    page_reads: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> MemoryStats {
        MemoryStats {
            point_reads: self.point_reads.load(Ordering::SeqCst),
            list_reads: self.list_reads.load(Ordering::SeqCst),
            page_reads: self.page_reads.load(Ordering::SeqCst),
            subscriptions_acquired: self.acquired.load(Ordering::SeqCst),
            subscriptions_released: self.released.load(Ordering::SeqCst),
        }
    }
}

/// Failure and latency knobs.
#[derive(Default)]
struct Faults {
    failing_reads: usize,
    refuse_subscriptions: bool,
    subscribe_delay: Option<Duration>,
    read_delays: HashMap<RecordId, Duration>,
}

/// A collection held in process memory.
///
/// Records keep insertion order. Query filters and sorts are opaque to this
/// source and ignored; `expand` is honored on point reads when an expander is
/// installed. Every mutation is broadcast to matching subscriptions.
pub struct MemoryCollection<E: Entity> {
    name: String,
    records: RwLock<Vec<E>>,
    manager: Arc<SubscriptionManager<E>>,
    counters: Arc<Counters>,
    faults: Mutex<Faults>,
    expander: Option<Expander<E>>,
}

impl<E: Entity> MemoryCollection<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
            manager: Arc::new(SubscriptionManager::new()),
            counters: Arc::new(Counters::default()),
            faults: Mutex::new(Faults::default()),
            expander: None,
        }
    }

    /// Seed records without broadcasting.
    pub fn with_records(self, records: impl IntoIterator<Item = E>) -> Self {
        self.records.write().extend(records);
        self
    }

    /// Install server-side expansion for point reads.
    pub fn with_expander(mut self, expander: impl Fn(&E, &str) -> E + Send + Sync + 'static) -> Self {
        self.expander = Some(Arc::new(expander));
        self
    }

    // --- Mutations ---

    /// Insert a new record and broadcast `create`.
    pub fn create(&self, record: E) -> SourceResult<()> {
        {
            let mut records = self.records.write();
            if records.iter().any(|r| r.id() == record.id()) {
                return Err(SourceError::Transport(format!(
                    "record {} already exists",
                    record.id()
                )));
            }
            records.push(record.clone());
        }
        self.manager.broadcast(&ChangeEvent::create(record));
        Ok(())
    }

    /// Replace an existing record and broadcast `update`.
    pub fn update(&self, record: E) -> SourceResult<()> {
        {
            let mut records = self.records.write();
            let slot = records
                .iter_mut()
                .find(|r| r.id() == record.id())
                .ok_or_else(|| SourceError::NotFound(record.id().clone()))?;
            *slot = record.clone();
        }
        self.manager.broadcast(&ChangeEvent::update(record));
        Ok(())
    }

    /// Remove a record and broadcast `delete`.
    pub fn delete(&self, id: &RecordId) -> SourceResult<E> {
        let removed = {
            let mut records = self.records.write();
            let index = records
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| SourceError::NotFound(id.clone()))?;
            records.remove(index)
        };
        self.manager.broadcast(&ChangeEvent::delete(removed.clone()));
        Ok(removed)
    }

    /// Broadcast an event without touching stored records.
    pub fn emit(&self, event: ChangeEvent<E>) -> usize {
        self.manager.broadcast(&event)
    }

    pub fn records(&self) -> Vec<E> {
        self.records.read().clone()
    }

    pub fn stats(&self) -> MemoryStats {
        self.counters.snapshot()
    }

    pub fn subscription_count(&self) -> usize {
        self.manager.subscription_count()
    }

    pub fn subscription_scopes(&self) -> Vec<SubscriptionScope> {
        self.manager.scopes()
    }

    // --- Fault injection ---

    /// Fail the next `count` reads of any kind.
    pub fn fail_next_reads(&self, count: usize) {
        self.faults.lock().failing_reads = count;
    }

    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.faults.lock().refuse_subscriptions = refuse;
    }

    /// Delay subscription acquisition.
    pub fn set_subscribe_delay(&self, delay: Option<Duration>) {
        self.faults.lock().subscribe_delay = delay;
    }

    /// Delay point reads of one record.
    pub fn set_read_delay(&self, id: impl Into<RecordId>, delay: Duration) {
        self.faults.lock().read_delays.insert(id.into(), delay);
    }

    fn take_read_failure(&self) -> SourceResult<()> {
        let mut faults = self.faults.lock();
        if faults.failing_reads > 0 {
            faults.failing_reads -= 1;
            return Err(SourceError::Transport("injected read failure".to_string()));
        }
        Ok(())
    }

    fn read_delay(&self, id: &RecordId) -> Option<Duration> {
        self.faults.lock().read_delays.get(id).copied()
    }
}

#[async_trait]
impl<E: Entity> CollectionSource for MemoryCollection<E> {
    type Item = E;

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_one(&self, id: &RecordId, query: &QueryParams) -> SourceResult<E> {
        self.counters.point_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay(id) {
            tokio::time::sleep(delay).await;
        }
        self.take_read_failure()?;

        let record = self
            .records
            .read()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(id.clone()))?;

        match (query.expand_directive(), &self.expander) {
            (Some(expand), Some(expander)) => Ok(expander(&record, expand)),
            _ => Ok(record),
        }
    }

    async fn get_full_list(&self, _query: &QueryParams) -> SourceResult<Vec<E>> {
        self.counters.list_reads.fetch_add(1, Ordering::SeqCst);
        self.take_read_failure()?;
        Ok(self.records())
    }

    async fn get_page(
        &self,
        page: u32,
        per_page: u32,
        _query: &QueryParams,
    ) -> SourceResult<PageWindow<E>> {
        self.counters.page_reads.fetch_add(1, Ordering::SeqCst);
        self.take_read_failure()?;

        let records = self.records.read();
        let total_items = records.len() as u64;
        let start = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);
        let items = records
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();

        Ok(PageWindow {
            items,
            page,
            per_page,
            total_items,
            total_pages: PageWindow::<E>::total_pages_for(total_items, per_page),
        })
    }

    async fn subscribe(
        &self,
        scope: SubscriptionScope,
        sink: EventSink<E>,
    ) -> SourceResult<Box<dyn LiveSubscription>> {
        let (refuse, delay) = {
            let faults = self.faults.lock();
            (faults.refuse_subscriptions, faults.subscribe_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if refuse {
            return Err(SourceError::Refused(format!(
                "subscriptions to '{}' are disabled",
                self.name
            )));
        }

        let id = self.manager.subscribe(scope, sink);
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySubscription {
            id,
            manager: Arc::clone(&self.manager),
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// Release handle for a [`MemoryCollection`] subscription.
struct MemorySubscription<E: Entity> {
    id: SubscriptionId,
    manager: Arc<SubscriptionManager<E>>,
    counters: Arc<Counters>,
}

#[async_trait]
impl<E: Entity> LiveSubscription for MemorySubscription<E> {
    async fn release(self: Box<Self>) -> SourceResult<()> {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        if !self.manager.unsubscribe(self.id) {
            debug!(id = ?self.id, "subscription was already dropped");
        }
        Ok(())
    }
}
