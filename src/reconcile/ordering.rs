//! Same-record ordering guard.

use crate::types::{RecordId, Sequence};
use std::collections::HashMap;

/// Tracks the highest delivery sequence committed for each record.
///
/// A result whose sequence is lower than one already committed for the same
/// record is stale and must be discarded. Results for different records never
/// block each other.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    committed: HashMap<RecordId, Sequence>,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sequence` for `id` if it is not superseded.
    ///
    /// Returns false when a later event for `id` has already been committed.
    pub fn admit(&mut self, id: &RecordId, sequence: Sequence) -> bool {
        match self.committed.get(id) {
            Some(last) if *last > sequence => false,
            _ => {
                self.committed.insert(id.clone(), sequence);
                true
            }
        }
    }

    /// Highest committed sequence for `id`.
    pub fn last_committed(&self, id: &RecordId) -> Option<Sequence> {
        self.committed.get(id).copied()
    }

    /// Forget every committed sequence.
    ///
    /// Only valid once no handler holding an earlier sequence can still
    /// commit.
    pub fn clear(&mut self) {
        self.committed.clear();
    }
}
