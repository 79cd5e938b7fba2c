//! Self-referencing types: nested instances inside fields, arrays and maps
//! of the same type, replicated to mirrors that join mid-window.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema_sync::{Document, PrimitiveType, RefId, Registry, SchemaDef, SchemaId, WireType};

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

fn node_type() -> (Arc<Registry>, SchemaId) {
    let mut b = Registry::builder();
    let node = b.declare("Node").unwrap();
    b.define(
        node,
        SchemaDef::new("Node")
            .field("v", PrimitiveType::I32)
            .field("kid", node)
            .field("list", WireType::array(node))
            .field("m", WireType::map(node)),
    )
    .unwrap();
    (Arc::new(b.build().unwrap()), node)
}

fn tree() -> Document {
    let (registry, node) = node_type();
    Document::new(registry, node).unwrap()
}

/// Every live instance, root first.
fn instances(doc: &Document) -> Vec<RefId> {
    let mut out = Vec::new();
    let mut stack = vec![doc.root()];
    while let Some(id) = stack.pop() {
        out.push(id);
        if let Some(kid) = doc.child(id, "kid").unwrap() {
            stack.push(kid);
        }
        let list = doc.container(id, "list").unwrap();
        for i in 0..doc.array_len(list).unwrap() {
            stack.extend(doc.array_get_instance(list, i).unwrap());
        }
        let m = doc.container(id, "m").unwrap();
        for key in doc.map_keys(m).unwrap() {
            stack.extend(doc.map_get_instance(m, key).unwrap());
        }
    }
    out
}

fn mutate(doc: &mut Document, rng: &mut StdRng) {
    for _ in 0..rng.gen_range(1..6) {
        let all = instances(doc);
        let n = all[rng.gen_range(0..all.len())];
        // Past a few hundred nodes only shrinking and in-place edits happen.
        let grow = doc.node_count() < 300;
        let list = doc.container(n, "list").unwrap();
        let m = doc.container(n, "m").unwrap();
        let key = KEYS[rng.gen_range(0..KEYS.len())];
        match rng.gen_range(0..9) {
            0 => doc.set(n, "v", rng.gen::<i32>()).unwrap(),
            1 if grow => {
                let kid = doc.set_instance(n, "kid").unwrap();
                doc.set(kid, "v", rng.gen_range(0..100i32)).unwrap();
            }
            2 => doc.unset(n, "kid").unwrap(),
            3 if grow => {
                let item = doc.array_push_instance(list).unwrap();
                doc.set(item, "v", rng.gen_range(0..100i32)).unwrap();
            }
            4 => {
                doc.array_pop(list).unwrap();
            }
            5 => {
                let len = doc.array_len(list).unwrap();
                if len > 0 {
                    let index = rng.gen_range(0..len);
                    let item = doc.array_set_instance(list, index).unwrap();
                    doc.set(item, "v", -1i32).unwrap();
                }
            }
            6 if grow => {
                let entry = doc.map_insert_instance(m, key).unwrap();
                doc.set(entry, "v", rng.gen_range(0..100i32)).unwrap();
            }
            7 => {
                doc.map_remove(m, key).unwrap();
            }
            _ => {
                if let Some(kid) = doc.child(n, "kid").unwrap() {
                    doc.set(kid, "v", rng.gen::<i32>()).unwrap();
                }
            }
        }
    }
}

fn assert_mirrors(producer: &Document, mirrors: &[Document], context: &str) {
    let expected = producer.to_json();
    for (i, mirror) in mirrors.iter().enumerate() {
        assert_eq!(mirror.to_json(), expected, "mirror {i} diverged ({context})");
        assert_eq!(
            mirror.node_count(),
            producer.node_count(),
            "mirror {i} kept stale nodes ({context})"
        );
    }
}

#[test]
fn recursive_type_converges_with_mid_window_joins() {
    for seed in 0..300u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut producer = tree();
        let mut mirrors = vec![tree()];
        for round in 0..40 {
            mutate(&mut producer, &mut rng);
            if mirrors.len() < 6 && rng.gen_bool(0.15) {
                let mut late = tree();
                late.decode(&producer.encode_full()).unwrap();
                mirrors.push(late);
                mutate(&mut producer, &mut rng);
            }
            let diff = producer.encode_diff();
            for (i, mirror) in mirrors.iter_mut().enumerate() {
                mirror
                    .decode(&diff)
                    .unwrap_or_else(|e| panic!("seed {seed} round {round} mirror {i}: {e}"));
            }
            assert_mirrors(&producer, &mirrors, &format!("seed {seed} round {round}"));
        }
    }
}

#[test]
fn replaced_array_element_drops_its_whole_subtree() {
    let mut producer = tree();
    let mut mirror = tree();
    let list = producer.container(producer.root(), "list").unwrap();
    let first = producer.array_push_instance(list).unwrap();
    let inner = producer.container(first, "list").unwrap();
    for _ in 0..3 {
        let grandchild = producer.array_push_instance(inner).unwrap();
        producer.set_instance(grandchild, "kid").unwrap();
    }
    mirror.decode(&producer.encode_diff()).unwrap();
    let grown = producer.node_count();
    assert_eq!(mirror.node_count(), grown);

    let fresh = producer.array_set_instance(list, 0).unwrap();
    assert!(!producer.contains(first));
    mirror.decode(&producer.encode_diff()).unwrap();
    assert!(!mirror.contains(first));
    assert_eq!(mirror.array_get_instance(list, 0).unwrap(), Some(fresh));
    assert_eq!(mirror.node_count(), producer.node_count());
    assert!(producer.node_count() < grown);
    assert_eq!(mirror.to_json(), producer.to_json());
}

#[test]
fn deep_chain_survives_a_snapshot_and_a_diff() {
    const DEPTH: i32 = 20_000;
    let mut producer = tree();
    let mut n = producer.root();
    for i in 0..DEPTH {
        n = producer.set_instance(n, "kid").unwrap();
        producer.set(n, "v", i).unwrap();
    }
    let leaf = n;

    let full = producer.encode_full();
    let mut joined = tree();
    joined.decode(&full).unwrap();
    let mut follower = tree();
    follower.decode(&producer.encode_diff()).unwrap();

    for mirror in [&mut joined, &mut follower] {
        assert_eq!(mirror.node_count(), producer.node_count());
        assert_eq!(mirror.encode_full(), full);
        assert_eq!(
            mirror.view(leaf),
            Some(serde_json::json!({ "v": DEPTH - 1, "list": [], "m": {} }))
        );
    }
}

#[test]
fn nested_view_follows_the_chain() {
    let mut doc = tree();
    let mut n = doc.root();
    for i in 0..200i32 {
        n = doc.set_instance(n, "kid").unwrap();
        doc.set(n, "v", i).unwrap();
    }
    let json = doc.to_json();
    let pointer = format!("{}/v", "/kid".repeat(200));
    assert_eq!(json.pointer(&pointer), Some(&serde_json::json!(199)));
    assert_eq!(json.pointer("/kid/list"), Some(&serde_json::json!([])));
}
