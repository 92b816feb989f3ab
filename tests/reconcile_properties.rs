//! Property tests for the reducers.

mod common;

use common::{n_of, rec, values};
use live_bindings::{
    apply_list_event, apply_page_event, apply_record_event, ChangeAction, ChangeEvent, ListPolicy,
    PageWindow, Record,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// (action, id, value). Action 3 is an unrecognized action name.
fn events() -> impl Strategy<Value = Vec<(u8, u8, i64)>> {
    prop::collection::vec((0u8..4, 0u8..6, -50i64..50), 0..64)
}

fn to_event((action, id, n): (u8, u8, i64)) -> ChangeEvent<Record> {
    let record = rec(&format!("id{id}"), n);
    match action {
        0 => ChangeEvent::create(record),
        1 => ChangeEvent::update(record),
        2 => ChangeEvent::delete(record),
        _ => ChangeEvent::new(ChangeAction::Unknown("touch".into()), record),
    }
}

fn by_n() -> ListPolicy<Record> {
    ListPolicy::new().sorted_by(|a: &Record, b: &Record| n_of(a).cmp(&n_of(b)))
}

proptest! {
    #[test]
    fn test_list_matches_keyed_model(ops in events()) {
        let policy = ListPolicy::new();
        let mut items = Vec::new();
        let mut model = BTreeMap::new();

        for op in ops {
            let event = to_event(op);
            let id = event.id().to_string();
            match event.action {
                ChangeAction::Create => {
                    model.insert(id, n_of(&event.record));
                }
                ChangeAction::Update => {
                    if let Some(slot) = model.get_mut(&id) {
                        *slot = n_of(&event.record);
                    }
                }
                ChangeAction::Delete => {
                    model.remove(&id);
                }
                ChangeAction::Unknown(_) => {}
            }
            items = apply_list_event(items, event, &policy);
        }

        let held: BTreeMap<String, i64> = items
            .iter()
            .map(|r| (r.id.to_string(), n_of(r)))
            .collect();
        prop_assert_eq!(held.len(), items.len());
        prop_assert_eq!(held, model);
    }

    #[test]
    fn test_list_stays_sorted(ops in events()) {
        let policy = by_n();
        let mut items = Vec::new();

        for op in ops {
            items = apply_list_event(items, to_event(op), &policy);
            let ns = values(&items);
            prop_assert!(ns.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn test_filter_holds_after_every_event(ops in events()) {
        let policy = by_n().retain(|r| n_of(r) >= 0);
        let mut items = Vec::new();

        for op in ops {
            items = apply_list_event(items, to_event(op), &policy);
            prop_assert!(items.iter().all(|r| n_of(r) >= 0));

            let unique: HashSet<_> = items.iter().map(|r| r.id.clone()).collect();
            prop_assert_eq!(unique.len(), items.len());
        }
    }

    #[test]
    fn test_record_follows_last_known_action(ops in events()) {
        let mut current = None;
        let mut expected = None;

        for op in ops {
            let event = to_event(op);
            match event.action {
                ChangeAction::Create | ChangeAction::Update => {
                    expected = Some(event.record.clone());
                }
                ChangeAction::Delete => expected = None,
                ChangeAction::Unknown(_) => {}
            }
            current = apply_record_event(current, event);
        }

        prop_assert_eq!(current, expected);
    }

    #[test]
    fn test_page_metadata_never_changes(ops in events(), page in 1u32..5, total in 0u64..200) {
        let total_pages = PageWindow::<Record>::total_pages_for(total, 20);
        let mut window = PageWindow {
            items: Vec::new(),
            page,
            per_page: 20,
            total_items: total,
            total_pages,
        };

        for op in ops {
            window = apply_page_event(window, to_event(op), &by_n());
        }

        prop_assert_eq!(window.page, page);
        prop_assert_eq!(window.per_page, 20);
        prop_assert_eq!(window.total_items, total);
        prop_assert_eq!(window.total_pages, total_pages);
    }
}
