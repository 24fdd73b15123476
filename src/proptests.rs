use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, HashMap};

/// Checks every structural invariant reachable from the root.
fn validate_tree<V>(t: &Trie32<V>) {
    let root = t.root();
    assert!(root.is_root());
    assert_eq!(root.id(), NodeId::ROOT);

    let mut paths: HashMap<NodeId, (u32, u8)> = HashMap::new();
    let mut entries = 0usize;
    let mut seen = std::collections::HashSet::new();

    for (node, branch) in t.nodes() {
        let (path, depth) = match branch.bit() {
            None => (0u32, 0u8),
            Some(bit) => {
                let parent = node.parent().expect("non-root node must have a parent");
                let (p, d) = paths[&parent];
                let parent_ref = t.node(parent).expect("parent must be live");
                assert_eq!(parent_ref.child(bit), Some(node.id()), "parent link mismatch");
                (p | ((bit as u32) << (31 - d)), d + 1)
            }
        };

        if !node.is_root() {
            assert!(
                !(node.is_vacant() && node.is_leaf()),
                "vacant non-root leaf {} survived",
                node.id()
            );
        }

        if let Some((key, bits, _)) = node.entry() {
            entries += 1;
            assert!(depth <= bits, "entry /{bits} stored at depth {depth}");
            assert_eq!(key, key.masked(bits), "stored key must be masked");
            assert_eq!(key.masked(depth), path, "entry off its path");
            assert!(seen.insert((key, bits)), "duplicate entry {key:#x}/{bits}");
        }

        assert!(paths.insert(node.id(), (path, depth)).is_none(), "node visited twice");
    }

    assert_eq!(entries, t.len(), "reachable entries must match Trie::len");
    assert_eq!(paths.len(), t.node_count(), "unreachable live nodes");
}

/// Reference longest-prefix match over a plain map.
fn model_find(m: &BTreeMap<(u32, u8), u16>, key: u32, bits: u8) -> Option<(u32, u8, u16)> {
    m.iter()
        .filter(|&(&(k, b), _)| b <= bits && key.masked(b) == k)
        .max_by_key(|&(&(_, b), _)| b)
        .map(|(&(k, b), &v)| (k, b, v))
}

fn key_strategy() -> impl Strategy<Value = u32> {
    // Mostly keys from a narrow space so prefixes overlap and split often.
    prop_oneof![
        4 => (0u32..16).prop_map(|x| x << 28),
        4 => (0u32..256).prop_map(|x| x.rotate_right(8)),
        1 => any::<u32>(),
    ]
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Insert(
        #[proptest(strategy = "key_strategy()")] u32,
        #[proptest(strategy = "0u8..=32")] u8,
        u16,
    ),
    Remove(
        #[proptest(strategy = "key_strategy()")] u32,
        #[proptest(strategy = "0u8..=32")] u8,
    ),
    Find(
        #[proptest(strategy = "key_strategy()")] u32,
        #[proptest(strategy = "0u8..=32")] u8,
    ),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        let mut t: Trie32<u16> = Trie32::new();
        let mut m: BTreeMap<(u32, u8), u16> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, bits, value) => {
                    let id = t.insert(key, bits, value).unwrap();
                    m.insert((key.masked(bits), bits), value);
                    let node = t.node(id).unwrap();
                    prop_assert_eq!(node.entry(), Some((key.masked(bits), bits, &value)));
                }
                Op::Remove(key, bits) => {
                    let got = t.remove(key, bits).unwrap().map(|d| (d.key, d.bits, d.value));
                    let want = m
                        .remove(&(key.masked(bits), bits))
                        .map(|v| (key.masked(bits), bits, v));
                    prop_assert_eq!(got, want);
                }
                Op::Find(key, bits) => {
                    let got = t
                        .find(key, bits)
                        .unwrap()
                        .and_then(|n| n.entry().map(|(k, b, v)| (k, b, *v)));
                    prop_assert_eq!(got, model_find(&m, key, bits));
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let mut got: Vec<(u32, u8, u16)> = t.iter().map(|(k, b, v)| (k, b, *v)).collect();
        got.sort_unstable();
        let expected: Vec<(u32, u8, u16)> = m.iter().map(|(&(k, b), &v)| (k, b, v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_remove_all_compacts(
        entries in prop::collection::vec((key_strategy(), 0u8..=32), 0..=64)
    ) {
        let mut t: Trie32<usize> = Trie32::new();
        for (i, &(key, bits)) in entries.iter().enumerate() {
            t.insert(key, bits, i).unwrap();
        }
        validate_tree(&t);
        for &(key, bits) in entries.iter().rev() {
            t.remove(key, bits).unwrap();
            validate_tree(&t);
        }
        prop_assert!(t.is_empty());
        prop_assert_eq!(t.node_count(), 1);
    }

    #[test]
    fn prop_lookup_matches_model_u64(
        entries in prop::collection::vec((any::<u64>(), 0u8..=64, any::<u8>()), 0..=64),
        probes in prop::collection::vec(any::<u64>(), 0..=64),
    ) {
        let mut t: Trie64<u8> = Trie64::new();
        let mut m: BTreeMap<(u64, u8), u8> = BTreeMap::new();
        for &(key, bits, value) in &entries {
            // Fold the key onto a few high bits so entries overlap.
            let key = key & 0xF0F0_0000_0000_0000;
            t.insert(key, bits, value).unwrap();
            m.insert((key.masked(bits), bits), value);
        }
        for probe in probes {
            let want = m
                .iter()
                .filter(|&(&(k, b), _)| probe.masked(b) == k)
                .max_by_key(|&(&(_, b), _)| b)
                .map(|(_, v)| v);
            prop_assert_eq!(t.lookup(probe), want);
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_prefix_set() -> Vec<(u32, u8)> {
    vec![
        (0x0000_0000, 0),
        (0x8000_0000, 1),
        (0xA000_0000, 3),
        (0xA000_0000, 8),
        (0xC000_0000, 2),
        (0x4000_0000, 4),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let prefixes = small_prefix_set();
    let probes: Vec<u32> = (0u32..=255).map(|x| x << 24).collect();

    for_each_permutation(&prefixes, |perm| {
        let mut t: Trie32<u16> = Trie32::new();
        let mut m: BTreeMap<(u32, u8), u16> = BTreeMap::new();
        for (i, (k, b)) in perm.into_iter().enumerate() {
            t.insert(k, b, i as u16).unwrap();
            m.insert((k, b), i as u16);
        }

        validate_tree(&t);
        for &probe in &probes {
            let got = t
                .find(probe, 8)
                .unwrap()
                .and_then(|n| n.entry().map(|(k, b, v)| (k, b, *v)));
            assert_eq!(got, model_find(&m, probe, 8), "probe {probe:#x}");
        }
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let prefixes = small_prefix_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base_tree: Trie32<u16> = Trie32::new();
    let mut base_map: BTreeMap<(u32, u8), u16> = BTreeMap::new();
    for (i, &(k, b)) in prefixes.iter().enumerate() {
        base_tree.insert(k, b, i as u16).unwrap();
        base_map.insert((k, b), i as u16);
    }

    for_each_permutation(&prefixes, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();

        for (k, b) in perm {
            let got = t.remove(k, b).unwrap().map(|d| d.value);
            assert_eq!(got, m.remove(&(k, b)));
            assert_eq!(t.len(), m.len());
            validate_tree(&t);
            for probe in (0u32..=255).map(|x| x << 24) {
                let got = t
                    .find(probe, 32)
                    .unwrap()
                    .and_then(|n| n.entry().map(|(k, b, v)| (k, b, *v)));
                assert_eq!(got, model_find(&m, probe, 32));
            }
        }
        assert!(t.is_empty());
        assert_eq!(t.node_count(), 1);
    });
}
