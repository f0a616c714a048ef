#![cfg(test)]

// Property tests for Heap that need fault injection or internal access.

use crate::alloc::fail_after;
use crate::heap::{Heap, SiftDirection};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Insert(u32),
    // Insert with the next allocation failing.
    InsertFailing(u32),
    Extract,
    InsertThenExtract(u32),
    ExtractThenInsert(u32),
    Replace(usize, u32),
    Update(usize, u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u32>().prop_map(Op::Insert),
        1 => any::<u32>().prop_map(Op::InsertFailing),
        3 => Just(Op::Extract),
        1 => any::<u32>().prop_map(Op::InsertThenExtract),
        1 => any::<u32>().prop_map(Op::ExtractThenInsert),
        1 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Op::Replace(i, v)),
        1 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Op::Update(i, v)),
    ]
}

fn sorted(mut v: Vec<u32>) -> Vec<u32> {
    v.sort_unstable();
    v
}

// Property: against a sorted Vec model, every operation keeps the heap
// valid, returns the model's maximum where it should, and keeps the same
// multiset of items. A failed growth changes nothing.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_heap_state_machine(ops in proptest::collection::vec(arb_op(), 1..150)) {
        let mut heap = Heap::<u32>::max_heap(0).expect("empty heap");
        let mut model: Vec<u32> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(x) => {
                    heap.insert(x).expect("insert");
                    model.push(x);
                }
                Op::InsertFailing(x) => {
                    let needs_room = heap.len() == heap.view().capacity();
                    let r = {
                        let _g = fail_after(0);
                        heap.insert(x)
                    };
                    if needs_room {
                        prop_assert!(r.is_err());
                    } else {
                        prop_assert!(r.is_ok());
                        model.push(x);
                    }
                }
                Op::Extract => {
                    let got = heap.extract();
                    let want = model.iter().copied().max();
                    prop_assert_eq!(got, want);
                    if let Some(w) = want {
                        let pos = model.iter().position(|&m| m == w).expect("in model");
                        model.swap_remove(pos);
                    }
                }
                Op::InsertThenExtract(x) => {
                    let got = heap.insert_then_extract(x);
                    model.push(x);
                    let want = model.iter().copied().max().expect("non-empty");
                    prop_assert_eq!(got, want);
                    let pos = model.iter().position(|&m| m == want).expect("in model");
                    model.swap_remove(pos);
                }
                Op::ExtractThenInsert(x) => {
                    let got = heap.extract_then_insert(x).expect("extract then insert");
                    let want = model.iter().copied().max();
                    prop_assert_eq!(got, want);
                    if let Some(w) = want {
                        let pos = model.iter().position(|&m| m == w).expect("in model");
                        model.swap_remove(pos);
                    }
                    model.push(x);
                }
                Op::Replace(i, x) | Op::Update(i, x) if heap.is_empty() => {
                    prop_assert!(heap.replace_at(i, x).is_err());
                }
                Op::Replace(i, x) => {
                    let i = i % heap.len();
                    let old = heap.view().get::<u32>(i).expect("in range");
                    heap.replace_at(i, x).expect("replace");
                    let pos = model.iter().position(|&m| m == old).expect("in model");
                    model[pos] = x;
                }
                Op::Update(i, x) => {
                    let i = i % heap.len();
                    let old = heap.view().get::<u32>(i).expect("in range");
                    let dir = if x > old { SiftDirection::TowardRoot } else { SiftDirection::TowardLeaves };
                    heap.update_at(i, x, dir).expect("update");
                    let pos = model.iter().position(|&m| m == old).expect("in model");
                    model[pos] = x;
                }
            }

            prop_assert!(heap.check());
            prop_assert_eq!(heap.len(), model.len());
            prop_assert_eq!(heap.peek(), model.iter().copied().max());
            let items = heap.view().to_vec::<u32>().expect("u32 items");
            prop_assert_eq!(sorted(items), sorted(model.clone()));
        }
    }
}

// Property: `insert_then_extract(x)` on a non-empty heap leaves the same
// multiset as `insert(x)` followed by `extract()`, and returns the same item.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_insert_then_extract_matches_separate_calls(
        data in proptest::collection::vec(any::<u16>(), 1..64),
        x in any::<u16>(),
    ) {
        let mut fused = Heap::from_data(&data, |a: &u16, b: &u16| a.cmp(b)).expect("heap");
        let mut split = Heap::from_data(&data, |a: &u16, b: &u16| a.cmp(b)).expect("heap");

        let a = fused.insert_then_extract(x);
        split.insert(x).expect("insert");
        let b = split.extract().expect("non-empty");
        prop_assert_eq!(a, b);
        prop_assert!(fused.check());

        let mut fa = fused.view().to_vec::<u16>().expect("items");
        let mut sa = split.view().to_vec::<u16>().expect("items");
        fa.sort_unstable();
        sa.sort_unstable();
        prop_assert_eq!(fa, sa);
    }
}
