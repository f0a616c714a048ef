// HashTable through the public API.
//
// Invariants checked:
//  - A key is found iff it was inserted and not since removed; an equal key
//    is never stored twice.
//  - Bucket counts follow the prime size classes 7, 13, 31, 61, ...; a
//    preallocated table does not grow before its load limit.
//  - iter() and visit() see the same entries in the same order; keys() and
//    finalize() see every live entry exactly once.
//  - Custom hash and equality functions decide identity.
use rc_collections::{HashTable, InsertError, SizeClass, TableBuilder, TableConfig};
use std::collections::BTreeSet;
use std::ops::ControlFlow;

#[test]
fn string_keys_round_trip() {
    let mut t: HashTable<&str, i32> = HashTable::new();
    t.insert("a", 1).unwrap();
    t.insert("b", 2).unwrap();
    assert_eq!(t.lookup(&"a"), Some(&1));
    assert!(t.delete(&"a"));
    assert_eq!(t.lookup(&"a"), None);
    assert_eq!(t.len(), 1);
}

#[test]
fn duplicate_insert_rejected() {
    let mut t: HashTable<String, i32> = HashTable::new();
    t.insert("dup".to_string(), 1).unwrap();
    match t.insert("dup".to_string(), 2) {
        Err(InsertError::DuplicateKey) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(t.lookup(&"dup".to_string()), Some(&1));
}

#[test]
fn growth_follows_size_classes() {
    let mut t: HashTable<u64, u64> = HashTable::new();
    let mut seen = vec![];
    for i in 0..2_000 {
        t.insert(i, i).unwrap();
        if seen.last() != Some(&t.bucket_count()) {
            seen.push(t.bucket_count());
        }
    }
    assert_eq!(seen, vec![7, 13, 31, 61, 127, 251, 509, 1021, 2039, 4093]);
    for i in 0..2_000 {
        assert_eq!(t.lookup(&i), Some(&i));
    }
}

#[test]
fn preallocated_table_skips_early_growth() {
    let cfg = TableConfig::new().initial_size(3000);
    let mut t: HashTable<u64, ()> = HashTable::with_config(cfg).unwrap();
    assert_eq!(t.size_class(), SizeClass::for_request(4096));
    assert_eq!(t.bucket_count(), 4093);
    for i in 0..3000 {
        t.insert(i, ()).unwrap();
    }
    assert_eq!(t.bucket_count(), 4093);
}

#[test]
fn removed_entries_are_gone_and_others_stay() {
    let mut t: HashTable<u32, String> = HashTable::new();
    for i in 0..500u32 {
        t.insert(i, i.to_string()).unwrap();
    }
    for i in (0..500u32).step_by(2) {
        assert_eq!(t.remove(&i), Some((i, i.to_string())));
    }
    assert_eq!(t.len(), 250);
    for i in 0..500u32 {
        assert_eq!(t.contains_key(&i), i % 2 == 1);
    }
}

#[test]
fn iteration_matches_visit() {
    let mut t: HashTable<u64, u64> = HashTable::new();
    for i in 0..100 {
        t.insert(i * 7919, i).unwrap();
    }
    let from_iter: Vec<(u64, u64)> = t.iter().map(|(k, v)| (*k, *v)).collect();
    let mut from_visit = Vec::new();
    let flow = t.visit(|_, k, v| {
        from_visit.push((*k, *v));
        ControlFlow::Continue(())
    });
    assert_eq!(flow, ControlFlow::Continue(()));
    assert_eq!(from_iter, from_visit);
    assert_eq!(from_iter.len(), 100);
}

#[test]
fn sorted_keys_view() {
    let mut t: HashTable<i64, ()> = HashTable::new();
    for k in [30i64, -4, 12, 7, 0] {
        t.insert(k, ()).unwrap();
    }
    let v = t.keys_sorted_by(|a, b| a.cmp(b)).unwrap();
    assert_eq!(v.to_vec::<i64>().unwrap(), vec![-4, 0, 7, 12, 30]);
    let all: BTreeSet<i64> = t.keys().unwrap().to_vec::<i64>().unwrap().into_iter().collect();
    assert_eq!(all.len(), 5);
}

#[test]
fn custom_hash_and_equality() {
    // Keys compare by their low byte only.
    let mut t: HashTable<u32, &str> = TableBuilder::new()
        .hash_fn(|k: &u32| u64::from(*k & 0xff))
        .eq_fn(|a: &u32, b: &u32| (a & 0xff) == (b & 0xff))
        .build()
        .unwrap();
    t.insert(0x101, "one").unwrap();
    assert_eq!(t.insert(0x201, "two"), Err(InsertError::DuplicateKey));
    assert_eq!(t.lookup(&0x301), Some(&"one"));
    assert_eq!(t.lookup_key(&0x401), Some(&0x101));
}

#[test]
fn stats_display_mentions_shape() {
    let mut t: HashTable<u64, ()> = HashTable::new();
    for i in 0..10 {
        t.insert(i, ()).unwrap();
    }
    let s = t.stats();
    assert_eq!(s.entries, 10);
    assert_eq!(s.buckets, t.bucket_count());
    let text = s.to_string();
    assert!(text.contains("entries: 10"));
    assert!(text.contains("max collisions"));
}

#[test]
fn finalize_sees_every_entry() {
    let mut t: HashTable<u64, Vec<u8>> = HashTable::new();
    for i in 0..30 {
        t.insert(i, vec![i as u8; 3]).unwrap();
    }
    let mut total = 0;
    let mut keys = BTreeSet::new();
    t.finalize(|k, v| {
        total += v.len();
        keys.insert(k);
    });
    assert_eq!(total, 90);
    assert_eq!(keys.len(), 30);
}

#[cfg(feature = "serde")]
#[test]
fn config_defaults_fill_missing_fields() {
    let cfg: TableConfig = serde::Deserialize::deserialize(
        serde::de::value::MapDeserializer::<_, serde::de::value::Error>::new(
            [("initial_size", 64usize)].into_iter(),
        ),
    )
    .unwrap();
    assert_eq!(cfg.initial_size, 64);
    assert_eq!(cfg.collision_threshold, 4);
}
