#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can inject
// allocation failures through `alloc::fail_after`.

use crate::alloc::fail_after;
use crate::error::InsertError;
use crate::hash_table::{HashTable, TableBuilder};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

// Pool-indexed operations: indices shrink to earlier keys and op lists
// shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    // Insert with the `n`th allocation of the call failing.
    InsertFailing(usize, i32, usize),
    Remove(usize),
    Lookup(usize),
    Mutate(usize, i32),
    Iterate,
}

fn arb_scenario(max_keys: usize) -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,6}", 1..=max_keys).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => (idx.clone(), any::<i32>(), 0..3usize).prop_map(|(i, v, n)| Op::InsertFailing(i, v, n)),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Lookup),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<K, F>(
    mut sut: HashTable<K, i32>,
    key: F,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError>
where
    K: Hash + Eq + Clone + Ord + std::fmt::Debug,
    F: Fn(&str) -> K,
{
    let mut model: HashMap<K, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key(&pool[i]);
                let already = model.contains_key(&k);
                match sut.insert(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => prop_assert!(already),
                    Err(InsertError::OutOfMemory) => prop_assert!(false, "no failure injected"),
                }
            }
            Op::InsertFailing(i, v, n) => {
                let k = key(&pool[i]);
                let already = model.contains_key(&k);
                let buckets = sut.bucket_count();
                let result = {
                    let _g = fail_after(n);
                    sut.insert(k.clone(), v)
                };
                match result {
                    Ok(()) => {
                        prop_assert!(!already);
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => {
                        prop_assert!(already);
                        prop_assert_eq!(sut.bucket_count(), buckets);
                    }
                    Err(InsertError::OutOfMemory) => {
                        // The table must look exactly as before the call.
                        prop_assert!(!already);
                        prop_assert_eq!(sut.bucket_count(), buckets);
                        prop_assert!(sut.lookup(&k).is_none());
                    }
                }
            }
            Op::Remove(i) => {
                let k = key(&pool[i]);
                match model.remove(&k) {
                    Some(mv) => {
                        let (kk, vv) = sut.remove(&k).expect("present in table");
                        prop_assert_eq!(kk, k);
                        prop_assert_eq!(vv, mv);
                    }
                    None => prop_assert!(!sut.delete(&k)),
                }
            }
            Op::Lookup(i) => {
                let k = key(&pool[i]);
                prop_assert_eq!(sut.lookup(&k), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            Op::Mutate(i, d) => {
                let k = key(&pool[i]);
                if let (Some(sv), Some(mv)) = (sut.lookup_mut(&k), model.get_mut(&k)) {
                    *sv = sv.wrapping_add(d);
                    *mv = mv.wrapping_add(d);
                }
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.iter().count(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(sut.lookup(k), Some(v));
        }
        let stats = sut.stats();
        let chained: usize = stats
            .chain_lengths
            .iter()
            .enumerate()
            .map(|(n, c)| n * c)
            .sum();
        prop_assert_eq!(chained, model.len());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap,
// with allocation failures injected into inserts that need to grow.
// - Duplicate keys are rejected without changing the table.
// - A failed resize leaves bucket count and contents untouched.
// - `lookup`/`contains_key`/`remove` agree with the model.
// - Every entry is reachable through exactly one chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(24)) {
        run(HashTable::new(), |s| s.to_string(), &pool, ops)?;
    }
}

// Property: same invariants when every key lands in one chain, so growth
// is driven by the collision threshold instead of the load factor. Each
// insert past the threshold doubles the table, hence the smaller pool.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(10)) {
        let sut = TableBuilder::new()
            .hash_fn(|_: &String| 0)
            .collision_threshold(4)
            .build()
            .expect("empty table");
        run(sut, |s| s.to_string(), &pool, ops)?;
    }
}

// Property: a table preallocated with `initial_size` behaves the same.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_preallocated((pool, ops) in arb_scenario(24), size in 1..200usize) {
        let sut = TableBuilder::new()
            .initial_size(size)
            .build()
            .expect("preallocated table");
        run(sut, |s| s.len() as u64 * 1_000_003 + s.bytes().map(u64::from).sum::<u64>(), &pool, ops)?;
    }
}
