use super::*;
use crate::error::ErrorCode;

fn put_committed(store: &MemoryStore, key: &[u8], value: &[u8]) {
    let mut txn = store.begin().expect("begin");
    txn.put(key.to_vec(), value.to_vec()).expect("put");
    txn.commit().expect("commit");
}

#[test]
fn own_writes_are_visible_before_commit() {
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    txn.put(b"a".to_vec(), b"1".to_vec()).expect("put");
    assert_eq!(txn.get(b"a").expect("get"), Some(b"1".to_vec()));

    txn.delete(b"a".to_vec()).expect("delete");
    assert_eq!(txn.get(b"a").expect("get"), None);
}

#[test]
fn snapshot_does_not_see_later_commits() {
    let store = MemoryStore::new();
    put_committed(&store, b"a", b"1");

    let reader = store.begin().expect("begin");
    put_committed(&store, b"a", b"2");
    put_committed(&store, b"b", b"3");

    assert_eq!(reader.get(b"a").expect("get"), Some(b"1".to_vec()));
    assert_eq!(reader.get(b"b").expect("get"), None);

    let fresh = store.begin().expect("begin");
    assert_eq!(fresh.get(b"a").expect("get"), Some(b"2".to_vec()));
}

#[test]
fn commits_trim_versions_no_snapshot_can_read() {
    let store = MemoryStore::new();
    for i in 0..50u8 {
        put_committed(&store, b"hot", &[i]);
    }
    assert_eq!(store.version_count(b"hot"), 1);

    let mut txn = store.begin().expect("begin");
    txn.delete(b"hot".to_vec()).expect("delete");
    txn.commit().expect("commit");
    assert_eq!(store.version_count(b"hot"), 0);
    assert!(store.is_empty());

    put_committed(&store, b"hot", b"back");
    assert_eq!(store.version_count(b"hot"), 1);
}

#[test]
fn open_snapshot_pins_the_versions_it_reads() {
    let store = MemoryStore::new();
    put_committed(&store, b"k", b"old");

    let reader = store.begin().expect("begin");
    for i in 0..10u8 {
        put_committed(&store, b"k", &[i]);
    }
    assert_eq!(reader.get(b"k").expect("get"), Some(b"old".to_vec()));
    assert!(store.version_count(b"k") > 2);

    drop(reader);
    put_committed(&store, b"k", b"new");
    assert_eq!(store.version_count(b"k"), 1);
}

#[test]
fn aborted_writes_are_discarded() {
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");
    txn.put(b"a".to_vec(), b"1".to_vec()).expect("put");
    txn.abort();

    assert!(store.is_empty());
}

#[test]
fn concurrent_writers_to_one_key_conflict() {
    let store = MemoryStore::new();
    let mut first = store.begin().expect("begin");
    let mut second = store.begin().expect("begin");

    first.put(b"w".to_vec(), b"1".to_vec()).expect("put");
    second.put(b"w".to_vec(), b"2".to_vec()).expect("put");

    first.commit().expect("first committer wins");
    let err = second.commit().unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.code(), ErrorCode::TransientStorage);
    assert_eq!(store.begin().expect("begin").get(b"w").expect("get"), Some(b"1".to_vec()));
}

#[test]
fn disjoint_writers_both_commit() {
    let store = MemoryStore::new();
    let mut first = store.begin().expect("begin");
    let mut second = store.begin().expect("begin");

    first.put(b"a".to_vec(), b"1".to_vec()).expect("put");
    second.put(b"b".to_vec(), b"2".to_vec()).expect("put");

    first.commit().expect("commit");
    second.commit().expect("commit");
    assert_eq!(store.len(), 2);
}

#[test]
fn scan_merges_buffered_writes_in_key_order() {
    let store = MemoryStore::new();
    put_committed(&store, b"p1", b"a");
    put_committed(&store, b"p3", b"c");
    put_committed(&store, b"q1", b"z");

    let mut txn = store.begin().expect("begin");
    txn.put(b"p2".to_vec(), b"b".to_vec()).expect("put");
    txn.delete(b"p3".to_vec()).expect("delete");

    let rows = txn.scan(&KeyRange::prefix(b"p")).expect("scan");
    let keys: Vec<_> = rows.iter().map(|(k, _)| k.as_slice()).collect();
    assert_eq!(keys, vec![b"p1".as_slice(), b"p2".as_slice()]);
}

#[test]
fn prefix_successor_handles_trailing_max_bytes() {
    assert_eq!(prefix_successor(b"ab"), Some(b"ac".to_vec()));
    assert_eq!(prefix_successor(&[1, 0xFF]), Some(vec![2]));
    assert_eq!(prefix_successor(&[0xFF, 0xFF]), None);
}

#[test]
fn key_range_bounds() {
    let range = KeyRange::prefix(b"t1");
    assert!(range.contains(b"t1"));
    assert!(range.contains(b"t1zzz"));
    assert!(!range.contains(b"t2"));
    assert!(!range.is_empty());
}
