//! Shared lifecycle for every binding shape.
//!
//! An [`Engine`] owns the observable value and load state, counts observers,
//! and runs one pump task while observed. The pump performs the initial load,
//! acquires the change stream, and feeds each event through the expansion
//! resolver and the shape's reducer.
//!
//! Locks are only held across synchronous sections, never across `.await`.

use super::observer::{LoadState, ObserverHost};
use crate::error::{BindingError, Result, SourceResult};
use crate::expand;
use crate::reconcile::SequenceGuard;
use crate::source::{CollectionSource, EventSink};
use crate::types::{ChangeEvent, Sequence, SubscriptionScope};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Item type of a shape's source.
pub(crate) type ItemOf<K> = <<K as Shape>::Source as CollectionSource>::Item;

/// What differs between record, collection and page bindings.
#[async_trait]
pub(crate) trait Shape: Send + Sync + 'static {
    type Source: CollectionSource;
    type Value: Clone + Send + Sync + 'static;

    fn scope(&self) -> SubscriptionScope;

    /// Fetch a fresh value. `current` is the value being replaced.
    async fn fetch(&self, source: &Self::Source, current: &Self::Value)
        -> SourceResult<Self::Value>;

    fn reduce(
        &self,
        current: Self::Value,
        event: ChangeEvent<<Self::Source as CollectionSource>::Item>,
    ) -> Self::Value;
}

/// Construction parameters common to every shape.
pub(crate) struct EngineConfig<V> {
    pub placeholder: V,
    pub initial: Option<V>,
    pub expand: Option<String>,
    pub realtime: bool,
    pub inert: bool,
    pub label: Option<String>,
    pub event_buffer: usize,
}

struct Pump {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Lifecycle {
    observers: usize,
    pump: Option<Pump>,
}

pub(crate) struct Engine<K: Shape> {
    source: Arc<K::Source>,
    shape: K,
    expand: Option<String>,
    realtime: bool,
    inert: bool,
    label: String,
    event_buffer: usize,
    value: watch::Sender<K::Value>,
    state: watch::Sender<LoadState>,
    /// A value has been fetched or seeded at least once.
    has_value: AtomicBool,
    /// The seeded initial value has not been consumed by a start yet.
    seeded: AtomicBool,
    /// Last delivery sequence handed out. Never reset, so sequences from
    /// one pump always sort below those of the next.
    sequence: AtomicU64,
    guard: Mutex<SequenceGuard>,
    lifecycle: Mutex<Lifecycle>,
}

impl<K: Shape> Engine<K> {
    pub(crate) fn new(
        source: Arc<K::Source>,
        shape: K,
        config: EngineConfig<K::Value>,
    ) -> Arc<Self> {
        let label = config.label.unwrap_or_else(|| source.name().to_string());

        let seeded = config.initial.is_some() && !config.inert;
        let (value, state) = match config.initial {
            Some(initial) if !config.inert => (initial, LoadState::Loaded),
            _ => (config.placeholder, LoadState::Idle),
        };

        let (value, _) = watch::channel(value);
        let (state, _) = watch::channel(state);

        Arc::new(Self {
            source,
            shape,
            expand: config.expand,
            realtime: config.realtime && !config.inert,
            inert: config.inert,
            label,
            event_buffer: config.event_buffer,
            value,
            state,
            has_value: AtomicBool::new(seeded),
            seeded: AtomicBool::new(seeded),
            sequence: AtomicU64::new(0),
            guard: Mutex::new(SequenceGuard::new()),
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    pub(crate) fn source(&self) -> &K::Source {
        &self.source
    }

    pub(crate) fn shape(&self) -> &K {
        &self.shape
    }

    pub(crate) fn is_inert(&self) -> bool {
        self.inert
    }

    pub(crate) fn value(&self) -> K::Value {
        self.value.borrow().clone()
    }

    pub(crate) fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe_value(&self) -> watch::Receiver<K::Value> {
        self.value.subscribe()
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    /// Whether a pump is currently running for this binding.
    pub(crate) fn is_live(&self) -> bool {
        self.lifecycle
            .lock()
            .pump
            .as_ref()
            .is_some_and(|pump| !pump.task.is_finished())
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.lifecycle.lock().observers
    }

    // --- Fetching ---

    /// Fetch once if nothing has been loaded yet.
    pub(crate) async fn load(&self) -> Result<()> {
        if self.inert || self.has_value.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.reload().await
    }

    /// Re-run the initial fetch.
    pub(crate) async fn reload(&self) -> Result<()> {
        if self.inert {
            return Ok(());
        }
        let current = self.value();
        self.replace_with(self.shape.fetch(self.source.as_ref(), &current))
            .await
    }

    /// Replace the whole value with the result of `fetch`.
    ///
    /// On failure the value is left as it was and the state records the
    /// error.
    pub(crate) async fn replace_with<F>(&self, fetch: F) -> Result<()>
    where
        F: Future<Output = SourceResult<K::Value>>,
    {
        if self.inert {
            return Ok(());
        }

        let reloading = self.has_value.load(Ordering::SeqCst);
        self.state.send_replace(if reloading {
            LoadState::Reloading
        } else {
            LoadState::Loading
        });

        match fetch.await {
            Ok(next) => {
                self.value.send_replace(next);
                self.has_value.store(true, Ordering::SeqCst);
                self.state.send_replace(LoadState::Loaded);
                debug!(binding = %self.label, "fetch complete");
                Ok(())
            }
            Err(source) => {
                warn!(binding = %self.label, error = %source, "fetch failed");
                self.state.send_replace(LoadState::Failed {
                    message: source.to_string(),
                    reloading,
                });
                Err(BindingError::Fetch {
                    collection: self.source.name().to_string(),
                    source,
                })
            }
        }
    }

    // --- Reconciliation ---

    fn next_sequence(&self) -> Sequence {
        Sequence(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Apply a resolved event unless a later event for the same record has
    /// already been applied.
    pub(crate) fn commit(&self, sequence: Sequence, event: ChangeEvent<ItemOf<K>>) -> bool {
        if !self.guard.lock().admit(event.id(), sequence) {
            debug!(
                binding = %self.label,
                id = %event.id(),
                ?sequence,
                "discarding superseded event"
            );
            return false;
        }

        self.value.send_modify(|value| {
            let current = value.clone();
            *value = self.shape.reduce(current, event);
        });
        true
    }

    /// Expand (if needed) and commit one delivered event.
    pub(crate) async fn handle_event(&self, sequence: Sequence, event: ChangeEvent<ItemOf<K>>) {
        let ChangeEvent { action, record } = event;

        let record = if action.carries_record() {
            match expand::resolve(self.source.as_ref(), record, self.expand.as_deref()).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(binding = %self.label, %action, error = %e, "dropping event");
                    return;
                }
            }
        } else {
            record
        };

        self.commit(sequence, ChangeEvent { action, record });
    }

    // --- Lifecycle ---

    fn start(self: &Arc<Self>, lifecycle: &mut Lifecycle) {
        let load_first = !self.seeded.swap(false, Ordering::SeqCst);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(self).run(shutdown_rx, load_first));
        lifecycle.pump = Some(Pump { shutdown, task });
        debug!(binding = %self.label, load_first, "binding started");
    }

    /// Register an observer, starting the binding for the first one.
    pub(crate) fn attach(self: &Arc<Self>) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.observers += 1;
        if lifecycle.observers == 1 && !self.inert && lifecycle.pump.is_none() {
            self.start(&mut lifecycle);
        }
    }

    /// Signal the pump to stop. Safe to call any number of times.
    fn stop(&self, lifecycle: &mut Lifecycle) -> Option<JoinHandle<()>> {
        let pump = lifecycle.pump.take()?;
        let _ = pump.shutdown.send(true);
        debug!(binding = %self.label, "binding stopping");
        Some(pump.task)
    }

    /// Stop the live stream and wait for it to be released.
    pub(crate) async fn teardown(&self) {
        let task = {
            let mut lifecycle = self.lifecycle.lock();
            self.stop(&mut lifecycle)
        };
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>, load_first: bool) {
        if load_first {
            // Failures are surfaced through the load state.
            let _ = self.reload().await;
        }

        if !self.realtime || *shutdown.borrow() {
            return;
        }

        // Entries left by an earlier pump only refer to handlers that are gone.
        self.guard.lock().clear();

        let (sink, mut events) = EventSink::channel(self.event_buffer);
        let scope = self.shape.scope();
        let subscription = match self.source.subscribe(scope.clone(), sink).await {
            Ok(subscription) => subscription,
            Err(source) => {
                let e = BindingError::SubscriptionAcquire {
                    collection: self.source.name().to_string(),
                    source,
                };
                warn!(binding = %self.label, error = %e, "continuing without live updates");
                return;
            }
        };
        info!(binding = %self.label, topic = scope.topic(), "subscription acquired");

        let mut handlers: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();
        let mut stream_open = true;

        // A stop requested while acquiring is seen on the first pass.
        while !*shutdown.borrow_and_update() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                received = events.recv(), if stream_open => match received {
                    Some(event) => {
                        let sequence = self.next_sequence();
                        let engine = Arc::clone(&self);
                        handlers.push(
                            async move { engine.handle_event(sequence, event).await }.boxed(),
                        );
                    }
                    None => {
                        warn!(binding = %self.label, "change stream closed by source");
                        stream_open = false;
                    }
                },
                Some(()) = handlers.next(), if !handlers.is_empty() => {
                    // With nothing in flight every future event sorts above
                    // every committed one.
                    if handlers.is_empty() {
                        self.guard.lock().clear();
                    }
                }
            }

            if !stream_open && handlers.is_empty() {
                break;
            }
        }

        drop(events);
        match subscription.release().await {
            Ok(()) => info!(binding = %self.label, "subscription released"),
            Err(e) => warn!(binding = %self.label, error = %e, "release failed"),
        }
    }
}

impl<K: Shape> ObserverHost for Engine<K> {
    fn detach(&self) -> Option<JoinHandle<()>> {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.observers = lifecycle.observers.saturating_sub(1);
        if lifecycle.observers > 0 {
            return None;
        }
        self.stop(&mut lifecycle)
    }
}
