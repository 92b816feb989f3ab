//! Paginated collection binding.
//!
//! Only one page is held at a time, but the binding listens to the whole
//! collection's change stream. Events reshape the held items; paging metadata
//! only changes when a page is fetched.

use super::engine::{Engine, EngineConfig, Shape};
use super::observer::{LoadFlags, LoadState, Observer};
use crate::config::{ListPolicy, PageOptions};
use crate::context::ExecutionContext;
use crate::error::{Result, SourceResult};
use crate::reconcile::{apply_page_event, apply_policy};
use crate::source::CollectionSource;
use crate::types::{ChangeEvent, PageWindow, QueryParams, SubscriptionScope};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub(crate) struct PageShape<S: CollectionSource> {
    query: QueryParams,
    policy: ListPolicy<S::Item>,
}

impl<S: CollectionSource> PageShape<S> {
    async fn fetch_page(
        &self,
        source: &S,
        page: u32,
        per_page: u32,
    ) -> SourceResult<PageWindow<S::Item>> {
        let mut window = source.get_page(page, per_page, &self.query).await?;
        window.items = apply_policy(std::mem::take(&mut window.items), &self.policy);
        Ok(window)
    }
}

#[async_trait]
impl<S: CollectionSource> Shape for PageShape<S> {
    type Source = S;
    type Value = PageWindow<S::Item>;

    fn scope(&self) -> SubscriptionScope {
        SubscriptionScope::Collection
    }

    async fn fetch(&self, source: &S, current: &Self::Value) -> SourceResult<Self::Value> {
        self.fetch_page(source, current.page, current.per_page).await
    }

    fn reduce(&self, current: Self::Value, event: ChangeEvent<S::Item>) -> Self::Value {
        apply_page_event(current, event, &self.policy)
    }
}

/// Keeps one page of a collection in sync with the collection's change
/// stream.
pub struct PaginatedBinding<S: CollectionSource> {
    engine: Arc<Engine<PageShape<S>>>,
}

impl<S: CollectionSource> Clone for PaginatedBinding<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: CollectionSource> PaginatedBinding<S> {
    pub fn new(
        source: Arc<S>,
        options: PageOptions<S::Item>,
        context: ExecutionContext,
    ) -> Result<Self> {
        options.validate()?;

        let initial = options.initial.map(|mut window| {
            window.items = apply_policy(std::mem::take(&mut window.items), &options.policy);
            window
        });
        let shape = PageShape {
            query: options.query.clone(),
            policy: options.policy,
        };
        let config = EngineConfig {
            placeholder: PageWindow::empty(options.page, options.per_page),
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

    /// Observe the current page. The first observer starts the binding.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> Observer<PageWindow<S::Item>> {
        self.engine.attach();
        Observer::new(
            self.engine.subscribe_value(),
            self.engine.subscribe_state(),
            self.engine.clone(),
        )
    }

    pub fn value(&self) -> PageWindow<S::Item> {
        self.engine.value()
    }

    pub fn items(&self) -> Vec<S::Item> {
        self.engine.value().items
    }

    pub fn page(&self) -> u32 {
        self.engine.value().page
    }

    pub fn total_pages(&self) -> u32 {
        self.engine.value().total_pages
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

    /// Fetch the current page again.
    pub async fn reload(&self) -> Result<()> {
        self.engine.reload().await
    }

    /// Fetch `page` and replace the whole window with it.
    ///
    /// Pages outside `1..=total_pages` are ignored. Returns whether a fetch
    /// was issued.
    pub async fn set_page(&self, page: u32) -> Result<bool> {
        if self.engine.is_inert() {
            return Ok(false);
        }

        let current = self.engine.value();
        if !current.contains_page(page) {
            debug!(
                page,
                total_pages = current.total_pages,
                "ignoring navigation outside known pages"
            );
            return Ok(false);
        }

        let fetch = self
            .engine
            .shape()
            .fetch_page(self.engine.source(), page, current.per_page);
        self.engine.replace_with(fetch).await?;
        Ok(true)
    }

    pub async fn next(&self) -> Result<bool> {
        let page = self.engine.value().page;
        self.set_page(page.saturating_add(1)).await
    }

    pub async fn prev(&self) -> Result<bool> {
        let page = self.engine.value().page;
        self.set_page(page.saturating_sub(1)).await
    }

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
