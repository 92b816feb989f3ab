//! Expansion resolver.
//!
//! Change-stream payloads only carry a record's own fields. When a binding
//! was asked to expand relations, the record is re-read by id so the
//! expanded fields stay live.

use crate::error::{BindingError, Result};
use crate::source::CollectionSource;
use crate::types::{Entity, QueryParams};

/// Return `record` as-is when no expansion is requested, otherwise re-read it
/// by id with the expand directive.
pub async fn resolve<S: CollectionSource>(
    source: &S,
    record: S::Item,
    expand: Option<&str>,
) -> Result<S::Item> {
    let Some(expand) = expand.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(record);
    };

    let query = QueryParams::new().with_expand(expand);
    source
        .get_one(record.id(), &query)
        .await
        .map_err(|source| BindingError::Expansion {
            id: record.id().clone(),
            source,
        })
}
