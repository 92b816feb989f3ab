//! Single-record binding.

use super::engine::{Engine, EngineConfig, Shape};
use super::observer::{LoadFlags, LoadState, Observer};
use crate::config::RecordOptions;
use crate::context::ExecutionContext;
use crate::error::{Result, SourceResult};
use crate::reconcile::apply_record_event;
use crate::source::CollectionSource;
use crate::types::{ChangeEvent, QueryParams, RecordId, SubscriptionScope};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) struct RecordShape<S> {
    id: RecordId,
    query: QueryParams,
    _source: PhantomData<fn() -> S>,
}

#[async_trait]
impl<S: CollectionSource> Shape for RecordShape<S> {
    type Source = S;
    type Value = Option<S::Item>;

    fn scope(&self) -> SubscriptionScope {
        SubscriptionScope::Record(self.id.clone())
    }

    async fn fetch(&self, source: &S, _current: &Self::Value) -> SourceResult<Self::Value> {
        source.get_one(&self.id, &self.query).await.map(Some)
    }

    fn reduce(&self, current: Self::Value, event: ChangeEvent<S::Item>) -> Self::Value {
        apply_record_event(current, event)
    }
}

/// Keeps one record in sync with its change stream.
///
/// The value is `None` until loaded, after a delete, and always in a context
/// without a live connection.
pub struct RecordBinding<S: CollectionSource> {
    engine: Arc<Engine<RecordShape<S>>>,
}

impl<S: CollectionSource> Clone for RecordBinding<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: CollectionSource> RecordBinding<S> {
    /// Bind record `id` of `source`.
    pub fn new(
        source: Arc<S>,
        id: impl Into<RecordId>,
        options: RecordOptions<S::Item>,
        context: ExecutionContext,
    ) -> Result<Self> {
        options.validate()?;

        let shape = RecordShape {
            id: id.into(),
            query: options.query.clone(),
            _source: PhantomData,
        };
        let config = EngineConfig {
            placeholder: None,
            initial: options.initial.map(Some),
            expand: options.query.expand_directive().map(str::to_string),
            realtime: !options.disable_realtime,
            inert: !context.has_live_connection,
            label: options.label,
            event_buffer: options.event_buffer,
        };

        Ok(Self {
            engine: Engine::new(source, shape, config),
        })
    }

    pub fn id(&self) -> &RecordId {
        &self.engine.shape().id
    }

    /// Observe the record. The first observer starts the binding.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> Observer<Option<S::Item>> {
        self.engine.attach();
        Observer::new(
            self.engine.subscribe_value(),
            self.engine.subscribe_state(),
            self.engine.clone(),
        )
    }

    pub fn value(&self) -> Option<S::Item> {
        self.engine.value()
    }

    pub fn state(&self) -> LoadState {
        self.engine.state()
    }

    pub fn flags(&self) -> LoadFlags {
        self.engine.state().flags()
    }

    /// Fetch the record unless it has already been loaded.
    pub async fn load(&self) -> Result<()> {
        self.engine.load().await
    }

    /// Fetch the record again.
    pub async fn reload(&self) -> Result<()> {
        self.engine.reload().await
    }

    /// Release the change stream now. Safe to call repeatedly.
    pub async fn teardown(&self) {
        self.engine.teardown().await
    }

    pub fn is_live(&self) -> bool {
        self.engine.is_live()
    }

    /// True when created without a live connection.
    pub fn is_inert(&self) -> bool {
        self.engine.is_inert()
    }

    pub fn observer_count(&self) -> usize {
        self.engine.observer_count()
    }
}
