//! # Live Bindings
//!
//! Client-side bindings that keep a local copy of remote records in step with
//! a live change stream.
//!
//! ## Core Concepts
//!
//! - **Sources**: the transport seam; point, list and page reads plus a change stream
//! - **Bindings**: a single record, a whole collection, or one page of a collection
//! - **Reconciliation**: pure reducers that merge each change event into the held value
//! - **Expansion**: events carry only a record's own fields, so expanded
//!   bindings re-read the record by id
//!
//! ## Example
//!
//! ```ignore
//! use live_bindings::{
//!     CollectionBinding, CollectionOptions, ExecutionContext, ListPolicy, MemoryCollection, Record,
//! };
//!
//! let source = Arc::new(MemoryCollection::<Record>::new("tasks"));
//! let tasks = CollectionBinding::new(
//!     source.clone(),
//!     CollectionOptions::default().with_policy(
//!         ListPolicy::new().sorted_by(|a: &Record, b: &Record| a.id.cmp(&b.id)),
//!     ),
//!     ExecutionContext::live(),
//! )?;
//!
//! let mut observer = tasks.subscribe();
//! source.create(Record::new("t1").with("done", false))?;
//! let items = observer.wait_for(|items| items.len() == 1).await;
//! ```

pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod expand;
pub mod memory;
pub mod reconcile;
pub mod source;
pub mod types;

// Re-exports
pub use binding::{
    CollectionBinding, LoadFlags, LoadState, Observer, PaginatedBinding, RecordBinding,
};
pub use config::{
    CollectionOptions, FilterFn, ListPolicy, PageOptions, RecordOptions, SortFn,
    DEFAULT_EVENT_BUFFER, DEFAULT_PAGE, DEFAULT_PER_PAGE, MAX_EVENT_BUFFER,
};
pub use context::ExecutionContext;
pub use error::{BindingError, Result, SourceError, SourceResult};
pub use memory::{MemoryCollection, MemoryStats, SubscriptionId, SubscriptionManager};
pub use reconcile::{
    apply_list_event, apply_page_event, apply_policy, apply_record_event, SequenceGuard,
};
pub use source::{CollectionSource, EventSink, LiveSubscription};
pub use types::*;
