//! Reconciliation of change events into snapshots.
//!
//! Each binding shape has a pure reducer `(snapshot, event) -> snapshot`.
//! The reducers know nothing about subscriptions, fetching or observers, so
//! they can be tested and benchmarked on their own.
//!
//! Events for the same record may finish expansion out of delivery order;
//! [`SequenceGuard`] decides which results are still allowed to land.

mod operations;
mod ordering;

pub use operations::{apply_list_event, apply_page_event, apply_policy, apply_record_event};
pub use ordering::SequenceGuard;
