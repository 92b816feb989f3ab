//! In-process collection source.
//!
//! [`MemoryCollection`] implements [`CollectionSource`](crate::source::CollectionSource)
//! over records held in memory, with a [`SubscriptionManager`] fanning change
//! events out to scoped subscribers. It is useful for local-only data, demos,
//! and for exercising bindings without a backend.
//!
//! # Example
//!
//! ```ignore
//! let posts = Arc::new(MemoryCollection::<Record>::new("posts"));
//! let binding = RecordBinding::new(posts.clone(), "p1", RecordOptions::default(), ExecutionContext::live())?;
//! let observer = binding.subscribe();
//!
//! posts.create(Record::new("p1").with("title", "Hello"))?;
//! posts.update(Record::new("p1").with("title", "Hello again"))?;
//! ```

mod collection;
mod manager;

pub use collection::{Expander, MemoryCollection, MemoryStats};
pub use manager::{SubscriptionId, SubscriptionManager};
