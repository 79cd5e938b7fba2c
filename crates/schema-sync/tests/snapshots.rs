mod common;

use schema_sync::{ChangeKey, DecodeError, FrameKind, OpKind, FRAME_FULL};

use common::{assert_converged, document, sync, types};

fn populated(t: &common::Types) -> schema_sync::Document {
    let mut doc = document(t, t.state);
    let root = doc.root();
    doc.set(root, "num", 12i32).unwrap();
    doc.set(root, "fieldString", "hello").unwrap();
    let nums = doc.container(root, "mapOfNum").unwrap();
    doc.map_set(nums, "a", 1i32).unwrap();
    doc.map_set(nums, "b", 2i32).unwrap();
    let arr = doc.container(root, "arrayOfNum").unwrap();
    doc.array_push(arr, 5i32).unwrap();
    let players = doc.container(root, "mapOfPlayers").unwrap();
    let p = doc.map_insert_instance(players, "p1").unwrap();
    doc.set(p, "name", "One").unwrap();
    doc.set(p, "x", 1.5f32).unwrap();
    doc
}

#[test]
fn full_snapshot_reproduces_the_graph() {
    let t = types();
    let mut producer = populated(&t);
    let mut mirror = document(&t, t.state);
    let report = mirror.decode(&producer.encode_full()).unwrap();
    assert_eq!(report.frame, FrameKind::Full);
    assert_eq!(mirror.to_json(), producer.to_json());
    assert_eq!(mirror.node_count(), producer.node_count());
    assert_eq!(
        mirror.to_json(),
        serde_json::json!({
            "num": 12,
            "mapOfNum": {"a": 1, "b": 2},
            "arrayOfNum": [5],
            "fieldString": "hello",
            "mapOfPlayers": {"p1": {"name": "One", "x": 1.5}}
        })
    );
}

#[test]
fn applying_the_same_snapshot_twice_is_stable() {
    let t = types();
    let mut producer = populated(&t);
    let full = producer.encode_full();
    let mut mirror = document(&t, t.state);
    mirror.decode(&full).unwrap();
    let once = mirror.to_json();
    mirror.decode(&full).unwrap();
    assert_eq!(mirror.to_json(), once);
    assert_eq!(mirror.encode_full(), producer.encode_full());
}

#[test]
fn snapshot_replaces_diverged_state() {
    let t = types();
    let mut producer = populated(&t);
    let mut mirror = populated(&t);
    let root = mirror.root();
    mirror.set(root, "num", 99i32).unwrap();
    let nums = mirror.container(root, "mapOfNum").unwrap();
    mirror.map_set(nums, "stray", 0i32).unwrap();
    mirror.decode(&producer.encode_full()).unwrap();
    assert_eq!(mirror.to_json(), producer.to_json());
}

#[test]
fn snapshot_leaves_pending_changes_in_place() {
    let t = types();
    let mut producer = populated(&t);
    let mut from_start = document(&t, t.state);
    let mut late = document(&t, t.state);

    late.decode(&producer.encode_full()).unwrap();
    assert!(producer.has_changes());

    let mut mirrors = [from_start.clone(), late];
    sync(&mut producer, &mut mirrors);
    assert_converged(&producer, &mirrors, "after first diff");

    from_start.decode(&producer.encode_full()).unwrap();
    assert_eq!(from_start.to_json(), producer.to_json());
}

#[test]
fn report_lists_applied_changes() {
    let t = types();
    let mut producer = document(&t, t.state);
    let mut mirror = document(&t, t.state);
    producer.discard_changes();
    let root = producer.root();
    producer.set(root, "num", 1i32).unwrap();
    let nums = producer.container(root, "mapOfNum").unwrap();
    producer.map_set(nums, "k", 2i32).unwrap();
    let report = mirror.decode(&producer.encode_diff()).unwrap();
    assert_eq!(report.frame, FrameKind::Diff);
    assert_eq!(report.ops, 2);
    assert_eq!(report.changes[0].target, root);
    assert_eq!(report.changes[0].kind, OpKind::Set);
    assert_eq!(report.changes[0].key, ChangeKey::Field("num".into()));
    assert_eq!(report.changes[1].target, nums);
    assert_eq!(report.changes[1].kind, OpKind::Insert);
    assert_eq!(report.changes[1].key, ChangeKey::Entry("k".into()));
}

#[test]
fn failed_snapshot_keeps_the_previous_graph() {
    let t = types();
    let mut producer = populated(&t);
    let mut mirror = document(&t, t.state);
    let full = producer.encode_full();
    mirror.decode(&full).unwrap();
    let before = mirror.to_json();

    let truncated = &full[..full.len() - 1];
    assert!(matches!(
        mirror.decode(truncated),
        Err(DecodeError::Buffer(_))
    ));
    assert_eq!(mirror.to_json(), before);
}

#[test]
fn snapshot_of_other_root_type_is_rejected() {
    let t = types();
    let mut deep = document(&t, t.deep_state);
    let mut mirror = document(&t, t.state);
    let full = deep.encode_full();
    assert_eq!(full[0], FRAME_FULL);
    assert!(matches!(
        mirror.decode(&full),
        Err(DecodeError::RootMismatch { .. })
    ));
}

#[test]
fn map_entries_survive_snapshots_taken_across_one_window() {
    let t = types();
    let mut state = document(&t, t.state);
    let players = state.container(state.root(), "mapOfPlayers").unwrap();
    let mut i = 0u8;
    let mut add_player = |doc: &mut schema_sync::Document, key: &str| {
        let p = doc.map_insert_instance(players, key).unwrap();
        doc.set(p, "name", format!("Player {i}")).unwrap();
        doc.set(p, "x", f32::from(i + 1)).unwrap();
        doc.set(p, "y", f32::from(i + 2)).unwrap();
        i += 3;
    };
    state.encode_full();

    let mut d1 = document(&t, t.state);
    d1.decode(&state.encode_full()).unwrap();
    add_player(&mut state, "V1StGXR8");

    let mut d2 = document(&t, t.state);
    add_player(&mut state, "Uakgb_J5");
    d2.decode(&state.encode_full()).unwrap();

    let mut d3 = document(&t, t.state);
    d3.decode(&state.encode_full()).unwrap();
    add_player(&mut state, "m8ADmMzd");

    let shared = state.encode_diff();
    for mirror in [&mut d1, &mut d2, &mut d3] {
        mirror.decode(&shared).unwrap();
    }

    let mut d4 = document(&t, t.state);
    add_player(&mut state, "3Ptm-Zf0");
    d4.decode(&state.encode_full()).unwrap();

    assert_eq!(d1.to_json(), d2.to_json());
    assert_eq!(d2.to_json(), d3.to_json());
    assert_eq!(d1.map_len(players).unwrap(), 3);

    d3.decode(&state.encode_diff()).unwrap();
    assert_eq!(d3.to_json(), d4.to_json());
    assert_eq!(d4.to_json(), state.to_json());
    assert_eq!(d4.map_len(players).unwrap(), 4);
}
