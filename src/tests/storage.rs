use super::*;
use crate::test_utils::{int, lit};

/// Id of a fresh storage, standing in for a child mask's storage.
fn child_id() -> StorageId {
    PlainStorage::new().id()
}

// ========== PLAIN STORAGE ==========

#[test]
fn add_multi_is_idempotent() {
    let mut storage = PlainStorage::new();
    assert!(storage.add_multi("speed", lit("speed", [int(1)])));
    assert!(!storage.add_multi("speed", lit("speed", [int(1)])), "second add is a no-op");
    assert_eq!(storage.size_multi(), 1);
}

#[test]
fn size_multi_counts_every_fact() {
    let mut storage = PlainStorage::new();
    storage.add_multi("speed", lit("speed", [int(1)]));
    storage.add_multi("speed", lit("speed", [int(2)]));
    storage.add_multi("pos", lit("pos", [int(0)]));

    assert_eq!(storage.size_multi(), 3);
    assert_eq!(storage.size_single(), 0);
    assert_eq!(storage.size(), 3);
    assert_eq!(storage.multi("speed").len(), 2);
}

#[test]
fn add_single_refuses_taken_key() {
    let mut storage = PlainStorage::new();
    let a = child_id();
    let b = child_id();
    assert!(storage.add_single("child", a));
    assert!(!storage.add_single("child", b));
    assert_eq!(storage.single("child"), Some(a));
}

#[test]
fn removing_last_fact_prunes_key() {
    let mut storage = PlainStorage::new();
    let fact = lit("speed", [int(1)]);
    storage.add_multi("speed", fact.clone());
    assert!(storage.contains_multi("speed"));

    assert!(storage.remove_multi_element("speed", &fact));
    assert!(!storage.contains_multi("speed"), "empty set should be pruned");
    assert!(!storage.remove_multi_element("speed", &fact));
    assert!(storage.is_empty());
}

#[test]
fn remove_by_key() {
    let mut storage = PlainStorage::new();
    storage.add_multi("a", lit("a", [int(1)]));
    storage.add_single("b", child_id());

    assert!(storage.remove("a"));
    assert!(storage.remove("b"));
    assert!(!storage.remove("c"));
    assert!(storage.is_empty());
}

#[test]
fn contains_multi_element_checks_value() {
    let mut storage = PlainStorage::new();
    storage.add_multi("speed", lit("speed", [int(1)]));
    assert!(storage.contains_multi_element("speed", &lit("speed", [int(1)])));
    assert!(!storage.contains_multi_element("speed", &lit("speed", [int(2)])));
    assert!(!storage.contains_multi_element("pos", &lit("speed", [int(1)])));
}

#[test]
fn iterators_cover_content() {
    let mut storage = PlainStorage::new();
    storage.add_multi("a", lit("a", [int(1)]));
    storage.add_multi("a", lit("a", [int(2)]));
    storage.add_multi("b", lit("b", [int(3)]));
    storage.add_single("child", child_id());

    assert_eq!(storage.iter_multi().count(), 3);
    let children: Vec<_> = storage.iter_single().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].0.as_ref(), "child");
}

#[test]
fn clear_drops_everything() {
    let mut storage = PlainStorage::new();
    storage.add_multi("a", lit("a", [int(1)]));
    storage.add_single("b", child_id());
    assert!(storage.clear());
    assert!(storage.is_empty());
}

#[test]
fn storages_get_distinct_ids() {
    assert_ne!(PlainStorage::new().id(), PlainStorage::new().id());
    assert_ne!(SyncStorage::new().id(), SyncStorage::new().id());
}

// ========== SYNC STORAGE ==========

#[test]
fn sync_clones_share_content_and_id() {
    let mut left = SyncStorage::new();
    let right = left.clone();
    assert_eq!(left.id(), right.id());

    left.add_multi("shared", lit("shared", [int(1)]));
    assert!(right.contains_multi("shared"));
    assert_eq!(right.size_multi(), 1);
}

#[test]
fn sync_storage_concurrent_adds() {
    let storage = SyncStorage::new();
    std::thread::scope(|scope| {
        for t in 0..4i64 {
            let mut handle = storage.clone();
            scope.spawn(move || {
                for i in 0..50i64 {
                    handle.add_multi("n", lit("n", [int(t * 100 + i)]));
                    // Duplicate inserts from every thread must not grow the set.
                    handle.add_multi("dup", lit("dup", [int(i)]));
                }
            });
        }
    });
    assert_eq!(storage.multi("n").len(), 200);
    assert_eq!(storage.multi("dup").len(), 50);
}

#[test]
fn sync_iterators_are_snapshots() {
    let mut storage = SyncStorage::new();
    storage.add_multi("a", lit("a", [int(1)]));
    let facts: Vec<Literal> = storage.iter_multi().collect();
    storage.add_multi("a", lit("a", [int(2)]));
    assert_eq!(facts.len(), 1);
    assert_eq!(storage.iter_multi().count(), 2);
}

// ========== IMMUTABLE STORAGE ==========

#[test]
fn immutable_rejects_mutation() {
    let mut storage = ImmutableStorage::empty();
    assert!(!storage.add_multi("a", lit("a", [int(1)])));
    assert!(!storage.add_single("b", child_id()));
    assert!(!storage.remove("a"));
    assert!(!storage.clear());
    assert!(storage.is_empty());
}

#[test]
fn snapshot_is_frozen_copy() {
    let mut source = PlainStorage::new();
    source.add_multi("a", lit("a", [int(1)]));

    let mut snapshot = source.snapshot();
    source.add_multi("a", lit("a", [int(2)]));

    assert_eq!(snapshot.size_multi(), 1);
    assert!(snapshot.contains_multi_element("a", &lit("a", [int(1)])));
    assert!(!snapshot.remove_multi_element("a", &lit("a", [int(1)])));
    assert_ne!(snapshot.id(), source.id());
}

#[test]
fn sync_storage_refuses_children_while_shared() {
    let mut storage = SyncStorage::new();
    let other = storage.clone();
    assert_eq!(storage.mounts(), 0);

    storage.mounted();
    assert!(storage.add_single("first", child_id()));

    other.mounted();
    assert_eq!(storage.mounts(), 2);
    assert!(!storage.add_single("second", child_id()));
    assert!(storage.add_multi("fact", lit("fact", [int(1)])), "facts are still shared");

    other.unmounted();
    assert!(storage.add_single("second", child_id()));
    assert_eq!(storage.size_single(), 2);
}
