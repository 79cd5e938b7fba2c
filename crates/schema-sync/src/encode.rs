//! Producer side: full snapshots and incremental diffs.

use schema_sync_buffers::Writer;
use tracing::debug;

use crate::change::{ChangeSet, EntryChange};
use crate::document::Document;
use crate::identity::RefId;
use crate::node::{Item, NodeKind};
use crate::wire::{FrameKind, OpKind};

fn write_header(w: &mut Writer, target: RefId, kind: OpKind, key: u64) {
    w.vu57(u64::from(target.0));
    w.u8(kind as u8);
    w.vu57(key);
}

impl Document {
    /// Encodes every field, entry and element currently present.
    ///
    /// Pending changes are left untouched: a later
    /// [`encode_diff`](Document::encode_diff) still carries them, and applying
    /// it on top of this snapshot is harmless. Takes `&mut self` only to
    /// advance the snapshot epoch.
    pub fn encode_full(&mut self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u8(FrameKind::Full.byte());
        w.vu57(u64::from(self.root_schema.0));
        let ops = self.write_subtree(&mut w, RefId::ROOT);
        self.epoch += 1;
        let out = w.flush();
        debug!(
            frame = %FrameKind::Full,
            ops,
            bytes = out.len(),
            epoch = self.epoch,
            "encoded frame"
        );
        out
    }

    /// Encodes everything changed since the previous diff and clears the
    /// pending record. Values are read as they are now, not as they were when
    /// the change was recorded.
    pub fn encode_diff(&mut self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u8(FrameKind::Diff.byte());
        let mut ops = 0usize;
        // Children always carry larger ids than their owners, so ascending
        // order introduces every node before its own changes.
        for id in self.changes.dirty() {
            let Some(set) = self.changes.flush(id) else {
                continue;
            };
            ops += self.write_changes(&mut w, id, set);
        }
        let out = w.flush();
        debug!(frame = %FrameKind::Diff, ops, bytes = out.len(), "encoded frame");
        out
    }

    fn write_changes(&self, w: &mut Writer, id: RefId, set: ChangeSet) -> usize {
        let Some(node) = self.nodes.get(id) else {
            return 0;
        };
        let mut ops = 0;
        match (&node.kind, set) {
            (NodeKind::Instance(inst), ChangeSet::Instance { dirty }) => {
                let changed = dirty.iter().enumerate().filter(|(_, d)| **d);
                for (index, _) in changed {
                    match inst.fields.get(index) {
                        Some(Some(item)) => {
                            write_header(w, id, OpKind::Set, index as u64);
                            self.write_item(w, item);
                        }
                        Some(None) => write_header(w, id, OpKind::Unset, index as u64),
                        None => continue,
                    }
                    ops += 1;
                }
            }
            (NodeKind::Map(map), ChangeSet::Map(entries)) => {
                for (entry, change) in entries {
                    let key = u64::from(entry.0);
                    match (change, map.get_by_id(entry)) {
                        (EntryChange::Insert { .. }, Some((name, e))) => {
                            write_header(w, id, OpKind::Insert, key);
                            w.str(name);
                            self.write_item(w, &e.item);
                        }
                        (EntryChange::Update, Some((_, e))) => {
                            write_header(w, id, OpKind::Set, key);
                            self.write_item(w, &e.item);
                        }
                        (EntryChange::Delete, _) => write_header(w, id, OpKind::Delete, key),
                        _ => continue,
                    }
                    ops += 1;
                }
            }
            (NodeKind::Array(arr), ChangeSet::Array { dirty, high_water, .. }) => {
                let len = arr.items.len();
                if high_water > len {
                    write_header(w, id, OpKind::Delete, len as u64);
                    ops += 1;
                }
                for index in dirty {
                    let Some(item) = arr.items.get(index) else {
                        continue;
                    };
                    write_header(w, id, OpKind::Set, index as u64);
                    self.write_item(w, item);
                    ops += 1;
                }
            }
            _ => {}
        }
        ops
    }

    /// Pre-order walk: each child is introduced and then filled in before the
    /// next sibling. Uses an explicit stack of `(node, next slot)` so deep
    /// graphs do not exhaust the thread's stack. Returns the op count.
    fn write_subtree(&self, w: &mut Writer, root: RefId) -> usize {
        let mut ops = 0;
        let mut stack = vec![(root, 0usize)];
        while let Some((id, at)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let item = match &node.kind {
                NodeKind::Instance(inst) => {
                    let next = inst
                        .fields
                        .iter()
                        .enumerate()
                        .skip(at)
                        .find_map(|(index, slot)| slot.as_ref().map(|item| (index, item)));
                    let Some((index, item)) = next else {
                        continue;
                    };
                    write_header(w, id, OpKind::Set, index as u64);
                    stack.push((id, index + 1));
                    item
                }
                NodeKind::Map(map) => {
                    let Some((name, entry)) = map.get_index(at) else {
                        continue;
                    };
                    write_header(w, id, OpKind::Insert, u64::from(entry.id.0));
                    w.str(name);
                    stack.push((id, at + 1));
                    &entry.item
                }
                NodeKind::Array(arr) => {
                    let Some(item) = arr.items.get(at) else {
                        continue;
                    };
                    write_header(w, id, OpKind::Set, at as u64);
                    stack.push((id, at + 1));
                    item
                }
            };
            self.write_item(w, item);
            ops += 1;
            if let Item::Node(child) = item {
                stack.push((*child, 0));
            }
        }
        ops
    }

    fn write_item(&self, w: &mut Writer, item: &Item) {
        match item {
            Item::Value(value) => value.write(w),
            Item::Node(child) => {
                w.vu57(u64::from(child.0));
                if let Some(NodeKind::Instance(inst)) = self.nodes.get(*child).map(|n| &n.kind) {
                    w.vu57(u64::from(inst.schema.0));
                }
            }
        }
    }
}
