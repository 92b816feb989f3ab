//! Transport seam.
//!
//! A [`CollectionSource`] is whatever talks to the backend: point reads,
//! full-list reads, page reads and the change stream. Bindings only ever see
//! this trait.

use crate::error::SourceResult;
use crate::types::{ChangeEvent, Entity, PageWindow, QueryParams, RecordId, SubscriptionScope};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Remote collection of records.
#[async_trait]
pub trait CollectionSource: Send + Sync + 'static {
    type Item: Entity;

    /// Collection name, used in errors and logs.
    fn name(&self) -> &str;

    /// Read one record by id. Fails with `SourceError::NotFound` if missing.
    async fn get_one(&self, id: &RecordId, query: &QueryParams) -> SourceResult<Self::Item>;

    /// Read every record matching `query`, unpaginated.
    async fn get_full_list(&self, query: &QueryParams) -> SourceResult<Vec<Self::Item>>;

    /// Read one page.
    async fn get_page(
        &self,
        page: u32,
        per_page: u32,
        query: &QueryParams,
    ) -> SourceResult<PageWindow<Self::Item>>;

    /// Open a change stream for `scope`.
    ///
    /// Events are pushed into `sink` in delivery order. The returned handle
    /// ends the stream when released.
    async fn subscribe(
        &self,
        scope: SubscriptionScope,
        sink: EventSink<Self::Item>,
    ) -> SourceResult<Box<dyn LiveSubscription>>;
}

/// An acquired change stream.
#[async_trait]
pub trait LiveSubscription: Send + Sync {
    /// End the stream. Called at most once per handle.
    async fn release(self: Box<Self>) -> SourceResult<()>;
}

/// Receiving end handed to a source on subscribe.
#[derive(Debug)]
pub struct EventSink<E> {
    sender: mpsc::Sender<ChangeEvent<E>>,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: Entity> EventSink<E> {
    /// Create a sink and the receiver a binding drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ChangeEvent<E>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Deliver an event without waiting.
    ///
    /// Returns false when the buffer is full or the binding has gone away.
    pub fn try_deliver(&self, event: ChangeEvent<E>) -> bool {
        self.sender.try_send(event).is_ok()
    }
}
