//! Reducers for the three snapshot shapes.

use crate::config::ListPolicy;
use crate::types::{ChangeAction, ChangeEvent, Entity, PageWindow};

/// Apply an event to a single-record snapshot.
///
/// `None` means the record is absent.
pub fn apply_record_event<E: Entity>(current: Option<E>, event: ChangeEvent<E>) -> Option<E> {
    match event.action {
        ChangeAction::Create | ChangeAction::Update => Some(event.record),
        ChangeAction::Delete => None,
        ChangeAction::Unknown(_) => current,
    }
}

/// Apply an event to an unpaginated sequence, then sort and filter it.
pub fn apply_list_event<E: Entity>(
    mut items: Vec<E>,
    event: ChangeEvent<E>,
    policy: &ListPolicy<E>,
) -> Vec<E> {
    let position = items.iter().position(|item| item.id() == event.id());

    match event.action {
        ChangeAction::Create => match position {
            // A create for a record already held is treated as a replace
            // so the sequence never holds two entries for one id.
            Some(index) => items[index] = event.record,
            None => items.push(event.record),
        },
        ChangeAction::Update => {
            if let Some(index) = position {
                items[index] = event.record;
            }
        }
        ChangeAction::Delete => {
            if let Some(index) = position {
                items.remove(index);
            }
        }
        ChangeAction::Unknown(_) => return items,
    }

    apply_policy(items, policy)
}

/// Apply an event to the items of a page window.
///
/// Paging metadata is only refreshed by navigation, never by events.
pub fn apply_page_event<E: Entity>(
    window: PageWindow<E>,
    event: ChangeEvent<E>,
    policy: &ListPolicy<E>,
) -> PageWindow<E> {
    let PageWindow {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    } = window;

    PageWindow {
        items: apply_list_event(items, event, policy),
        page,
        per_page,
        total_items,
        total_pages,
    }
}

/// Sort, then filter.
pub fn apply_policy<E: Entity>(mut items: Vec<E>, policy: &ListPolicy<E>) -> Vec<E> {
    if let Some(ref sort) = policy.sort {
        items.sort_by(|a, b| sort(a, b));
    }

    if let Some(ref filter) = policy.filter {
        // Evaluate against the full sorted sequence before dropping anything.
        let keep: Vec<bool> = items
            .iter()
            .enumerate()
            .map(|(index, item)| filter(item, index, items.as_slice()))
            .collect();
        let mut keep = keep.into_iter();
        items.retain(|_| keep.next().unwrap_or(false));
    }

    items
}
