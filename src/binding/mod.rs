//! Live bindings.
//!
//! Three binding kinds share one lifecycle:
//! - [`RecordBinding`] holds a single record
//! - [`CollectionBinding`] holds a whole collection
//! - [`PaginatedBinding`] holds one page of a collection
//!
//! Each binding starts when its first [`Observer`] subscribes: it fetches
//! (unless seeded with an initial value), then opens a change stream. Events
//! are expanded if requested and reconciled into the held value. When the
//! last observer leaves, the stream is released.
//!
//! # Example
//!
//! ```ignore
//! let source = Arc::new(MemoryCollection::<Record>::new("posts"));
//! let posts = CollectionBinding::new(
//!     source.clone(),
//!     CollectionOptions::default(),
//!     ExecutionContext::live(),
//! )?;
//!
//! let mut observer = posts.subscribe();
//! source.create(Record::new("p1").with("title", "Hello"))?;
//! let items = observer.wait_for(|items| !items.is_empty()).await;
//! observer.unsubscribe().await;
//! ```

mod collection;
mod engine;
mod observer;
mod paginated;
mod record;

pub use collection::CollectionBinding;
pub use observer::{LoadFlags, LoadState, Observer};
pub use paginated::PaginatedBinding;
pub use record::RecordBinding;
