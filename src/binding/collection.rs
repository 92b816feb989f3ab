//! Unpaginated collection binding.

use super::engine::{Engine, EngineConfig, Shape};
use super::observer::{LoadFlags, LoadState, Observer};
use crate::config::{CollectionOptions, ListPolicy};
use crate::context::ExecutionContext;
use crate::error::{Result, SourceResult};
use crate::reconcile::{apply_list_event, apply_policy};
use crate::source::CollectionSource;
use crate::types::{ChangeEvent, QueryParams, SubscriptionScope};
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) struct CollectionShape<S: CollectionSource> {
    query: QueryParams,
    policy: ListPolicy<S::Item>,
}

#[async_trait]
impl<S: CollectionSource> Shape for CollectionShape<S> {
    type Source = S;
    type Value = Vec<S::Item>;

    fn scope(&self) -> SubscriptionScope {
        SubscriptionScope::Collection
    }

    async fn fetch(&self, source: &S, _current: &Self::Value) -> SourceResult<Self::Value> {
        let items = source.get_full_list(&self.query).await?;
        Ok(apply_policy(items, &self.policy))
    }

    fn reduce(&self, current: Self::Value, event: ChangeEvent<S::Item>) -> Self::Value {
        apply_list_event(current, event, &self.policy)
    }
}

/// Keeps a whole collection in sync with its change stream.
///
/// Fetched records and every later event are run through the configured
/// [`ListPolicy`]: sort first, then filter.
pub struct CollectionBinding<S: CollectionSource> {
    engine: Arc<Engine<CollectionShape<S>>>,
}

impl<S: CollectionSource> Clone for CollectionBinding<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: CollectionSource> CollectionBinding<S> {
    pub fn new(
        source: Arc<S>,
        options: CollectionOptions<S::Item>,
        context: ExecutionContext,
    ) -> Result<Self> {
        options.validate()?;

        let initial = options
            .initial
            .map(|items| apply_policy(items, &options.policy));
        let shape = CollectionShape {
            query: options.query.clone(),
            policy: options.policy,
        };
        let config = EngineConfig {
            placeholder: Vec::new(),
            initial,
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

    /// Observe the collection. The first observer starts the binding.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> Observer<Vec<S::Item>> {
        self.engine.attach();
        Observer::new(
            self.engine.subscribe_value(),
            self.engine.subscribe_state(),
            self.engine.clone(),
        )
    }

    pub fn value(&self) -> Vec<S::Item> {
        self.engine.value()
    }

    pub fn len(&self) -> usize {
        self.engine.value().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> LoadState {
        self.engine.state()
    }

    pub fn flags(&self) -> LoadFlags {
        self.engine.state().flags()
    }

    pub async fn load(&self) -> Result<()> {
        self.engine.load().await
    }

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

    pub fn is_inert(&self) -> bool {
        self.engine.is_inert()
    }

    pub fn observer_count(&self) -> usize {
        self.engine.observer_count()
    }
}
