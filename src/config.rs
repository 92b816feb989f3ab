//! Binding configuration.
//!
//! One options struct per binding kind. Every struct has a `Default`, and is
//! validated when the binding is constructed.

use crate::error::{BindingError, Result};
use crate::types::{Entity, PageWindow, QueryParams};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Default capacity of a binding's event buffer.
pub const DEFAULT_EVENT_BUFFER: usize = 1000;

/// Largest accepted event buffer.
pub const MAX_EVENT_BUFFER: usize = 1 << 20;

/// Default page for paginated bindings.
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size for paginated bindings.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Total order over two records.
pub type SortFn<E> = Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

/// Predicate over a record, its index and the whole (sorted) sequence.
pub type FilterFn<E> = Arc<dyn Fn(&E, usize, &[E]) -> bool + Send + Sync>;

/// Local ordering and filtering applied after every live event.
///
/// Sort always runs before filter.
pub struct ListPolicy<E> {
    pub sort: Option<SortFn<E>>,
    pub filter: Option<FilterFn<E>>,
}

impl<E> ListPolicy<E> {
    pub fn new() -> Self {
        Self {
            sort: None,
            filter: None,
        }
    }

    pub fn sorted_by(mut self, sort: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static) -> Self {
        self.sort = Some(Arc::new(sort));
        self
    }

    /// Filter with a predicate that needs the index and full sequence.
    pub fn filtered_by(
        mut self,
        filter: impl Fn(&E, usize, &[E]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Filter with a predicate over the record alone.
    pub fn retain(self, keep: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.filtered_by(move |item, _, _| keep(item))
    }
}

impl<E> Default for ListPolicy<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ListPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            sort: self.sort.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<E> fmt::Debug for ListPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListPolicy")
            .field("sort", &self.sort.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Options for a single-record binding.
#[derive(Clone, Debug)]
pub struct RecordOptions<E> {
    /// Point-read parameters. Only `expand` is used for live events.
    pub query: QueryParams,

    /// Pre-fetched value; skips the initial fetch.
    pub initial: Option<E>,

    /// Fetch only, never open a change stream.
    pub disable_realtime: bool,

    /// Name recorded on log lines.
    pub label: Option<String>,

    /// Max buffered events before the source drops this binding.
    /// Default: 1000
    pub event_buffer: usize,
}

impl<E> Default for RecordOptions<E> {
    fn default() -> Self {
        Self {
            query: QueryParams::default(),
            initial: None,
            disable_realtime: false,
            label: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl<E: Entity> RecordOptions<E> {
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_initial(mut self, initial: E) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn without_realtime(mut self) -> Self {
        self.disable_realtime = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_buffer(self.event_buffer)
    }
}

/// Options for an unpaginated collection binding.
#[derive(Clone, Debug)]
pub struct CollectionOptions<E> {
    /// Full-list parameters. Only `expand` is used for live events.
    pub query: QueryParams,

    /// Pre-fetched records; skips the initial fetch.
    pub initial: Option<Vec<E>>,

    pub disable_realtime: bool,

    /// Sort and filter applied after every event.
    pub policy: ListPolicy<E>,

    pub label: Option<String>,

    /// Default: 1000
    pub event_buffer: usize,
}

impl<E> Default for CollectionOptions<E> {
    fn default() -> Self {
        Self {
            query: QueryParams::default(),
            initial: None,
            disable_realtime: false,
            policy: ListPolicy::default(),
            label: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl<E: Entity> CollectionOptions<E> {
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_initial(mut self, initial: Vec<E>) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_policy(mut self, policy: ListPolicy<E>) -> Self {
        self.policy = policy;
        self
    }

    pub fn without_realtime(mut self) -> Self {
        self.disable_realtime = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_buffer(self.event_buffer)
    }
}

/// Options for a paginated collection binding.
#[derive(Clone, Debug)]
pub struct PageOptions<E> {
    pub query: QueryParams,

    /// Pre-fetched page window; skips the initial fetch.
    pub initial: Option<PageWindow<E>>,

    pub disable_realtime: bool,

    /// Applied to the current page's items after every event.
    pub policy: ListPolicy<E>,

    /// First page to fetch, 1-based.
    /// Default: 1
    pub page: u32,

    /// Default: 20
    pub per_page: u32,

    pub label: Option<String>,

    /// Default: 1000
    pub event_buffer: usize,
}

impl<E> Default for PageOptions<E> {
    fn default() -> Self {
        Self {
            query: QueryParams::default(),
            initial: None,
            disable_realtime: false,
            policy: ListPolicy::default(),
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            label: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl<E: Entity> PageOptions<E> {
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_initial(mut self, initial: PageWindow<E>) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_policy(mut self, policy: ListPolicy<E>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn without_realtime(mut self) -> Self {
        self.disable_realtime = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_buffer(self.event_buffer)?;
        if self.page == 0 {
            return Err(BindingError::InvalidConfig(
                "page numbers start at 1".to_string(),
            ));
        }
        if self.per_page == 0 {
            return Err(BindingError::InvalidConfig(
                "per_page must be at least 1".to_string(),
            ));
        }
        if let Some(ref initial) = self.initial {
            if initial.per_page == 0 {
                return Err(BindingError::InvalidConfig(
                    "initial page window has per_page 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn validate_buffer(event_buffer: usize) -> Result<()> {
    if event_buffer == 0 {
        return Err(BindingError::InvalidConfig(
            "event_buffer must be at least 1".to_string(),
        ));
    }
    if event_buffer > MAX_EVENT_BUFFER {
        return Err(BindingError::InvalidConfig(format!(
            "event_buffer {event_buffer} exceeds {MAX_EVENT_BUFFER}"
        )));
    }
    Ok(())
}
