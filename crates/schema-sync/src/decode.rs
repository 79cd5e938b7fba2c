//! Mirror side: applying full and diff frames.
//!
//! Every operation is read and validated in full before it touches the
//! graph, so a failing operation leaves no partial state behind. Full frames
//! are built into a fresh graph and swapped in only when the whole frame
//! succeeds; diffs are applied in place unless
//! [`DocumentConfig::staged_diffs`](crate::DocumentConfig) is set.

use std::sync::Arc;

use schema_sync_buffers::{print_octets_default, Reader};
use tracing::{debug, trace, warn};

use crate::document::Document;
use crate::error::DecodeError;
use crate::identity::RefId;
use crate::node::{ArrayNode, Instance, Item, MapNode, Node, NodeKind};
use crate::schema::{Element, SchemaId, WireType};
use crate::value::Value;
use crate::wire::{FrameKind, OpKind};

/// What one `decode` call did.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport {
    pub frame: FrameKind,
    /// Operations read, including ones that turned out to be no-ops.
    pub ops: usize,
    /// Operations that changed the graph, in stream order.
    pub changes: Vec<Change>,
}

/// One applied operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub target: RefId,
    pub kind: OpKind,
    pub key: ChangeKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKey {
    Field(String),
    Entry(String),
    Index(usize),
}

/// Item as read off the wire, not yet placed.
enum Incoming {
    Value(Value),
    /// Child id plus the empty node it stands for if it is new here.
    Child(RefId, NodeKind),
}

fn read_ref(r: &mut Reader<'_>) -> Result<RefId, DecodeError> {
    let offset = r.x;
    let value = r.vu57()?;
    ref_id(value, offset)
}

/// Ids at or above `RefId::LIMIT` could never be followed by a local allocation.
fn ref_id(value: u64, offset: usize) -> Result<RefId, DecodeError> {
    u32::try_from(value)
        .ok()
        .filter(|id| *id < RefId::LIMIT)
        .map(RefId)
        .ok_or(DecodeError::RefOutOfRange { value, offset })
}

impl Document {
    /// Applies one encoded frame.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<DecodeReport, DecodeError> {
        let result = self.decode_frame(bytes);
        match &result {
            Ok(report) => debug!(
                frame = %report.frame,
                ops = report.ops,
                changes = report.changes.len(),
                bytes = bytes.len(),
                "decoded frame"
            ),
            Err(err) => warn!(
                error = %err,
                bytes = bytes.len(),
                head = %print_octets_default(bytes),
                "rejected frame"
            ),
        }
        result
    }

    fn decode_frame(&mut self, bytes: &[u8]) -> Result<DecodeReport, DecodeError> {
        let mut r = Reader::new(bytes);
        let first = r.u8().map_err(|_| DecodeError::Empty)?;
        match FrameKind::from_byte(first)? {
            FrameKind::Full => {
                let root = r.vu57()?;
                if root != u64::from(self.root_schema.0) {
                    return Err(DecodeError::RootMismatch {
                        expected: self.root_schema,
                        found: root,
                    });
                }
                let mut staging = self.blank();
                staging.epoch = self.epoch;
                staging.nodes.adopt(RefId(self.nodes.watermark().saturating_sub(1)));
                let report = staging.apply_ops(&mut r, FrameKind::Full)?;
                *self = staging;
                Ok(report)
            }
            FrameKind::Diff if self.config.staged_diffs => {
                let mut staging = self.clone();
                let report = staging.apply_ops(&mut r, FrameKind::Diff)?;
                *self = staging;
                Ok(report)
            }
            FrameKind::Diff => self.apply_ops(&mut r, FrameKind::Diff),
        }
    }

    fn apply_ops(
        &mut self,
        r: &mut Reader<'_>,
        frame: FrameKind,
    ) -> Result<DecodeReport, DecodeError> {
        let mut report = DecodeReport {
            frame,
            ops: 0,
            changes: Vec::new(),
        };
        let limit = self.config.max_ops_per_frame;
        while !r.is_eof() {
            if report.ops >= limit {
                return Err(DecodeError::TooManyOps { limit });
            }
            let applied = self.apply_op(r)?;
            report.ops += 1;
            if let Some(change) = applied {
                trace!(node = %change.target, kind = %change.kind, key = ?change.key, "applied op");
                report.changes.push(change);
            }
        }
        Ok(report)
    }

    fn apply_op(&mut self, r: &mut Reader<'_>) -> Result<Option<Change>, DecodeError> {
        let offset = r.x;
        let target = read_ref(r)?;
        let kind_at = r.x;
        let kind = OpKind::from_byte(r.u8()?, kind_at)?;
        let key = r.vu57()?;
        let node = self
            .nodes
            .get(target)
            .ok_or(DecodeError::UnknownTarget { target: target.0, offset })?;
        match &node.kind {
            NodeKind::Instance(inst) => {
                let schema = inst.schema;
                self.apply_field_op(target, schema, kind, key, r, offset)
            }
            NodeKind::Map(map) => {
                let element = map.element;
                self.apply_entry_op(target, element, kind, key, r, offset)
            }
            NodeKind::Array(arr) => {
                let element = arr.element;
                self.apply_index_op(target, element, kind, key, r, offset)
            }
        }
    }

    // ── instance fields ───────────────────────────────────────────────────

    fn apply_field_op(
        &mut self,
        target: RefId,
        schema: SchemaId,
        kind: OpKind,
        key: u64,
        r: &mut Reader<'_>,
        offset: usize,
    ) -> Result<Option<Change>, DecodeError> {
        let registry = Arc::clone(&self.registry);
        let ty = registry.get(schema).ok_or_else(|| DecodeError::FieldOutOfRange {
            schema: schema.to_string(),
            index: key,
            offset,
        })?;
        let index = usize::try_from(key)
            .ok()
            .filter(|i| *i < ty.len())
            .ok_or_else(|| DecodeError::FieldOutOfRange {
                schema: ty.name.clone(),
                index: key,
                offset,
            })?;
        let wire = ty.fields[index].wire;
        let old = match kind {
            OpKind::Set => {
                let incoming = self.read_item(r, wire)?;
                let current = self.field_slot(target, index).cloned();
                let (item, dropped) = self.place(target, incoming, current, offset)?;
                if let Some(slot) = self.field_slot_mut(target, index) {
                    *slot = Some(item);
                }
                dropped
            }
            OpKind::Unset => self
                .field_slot_mut(target, index)
                .and_then(Option::take)
                .and_then(|item| item.node()),
            OpKind::Insert | OpKind::Delete => {
                return Err(DecodeError::InvalidOp {
                    kind,
                    shape: "instance",
                    offset,
                })
            }
        };
        if let Some(old) = old {
            self.drop_subtree(old);
        }
        Ok(Some(Change {
            target,
            kind,
            key: ChangeKey::Field(ty.fields[index].name.clone()),
        }))
    }

    fn field_slot(&self, target: RefId, index: usize) -> Option<&Item> {
        match self.nodes.get(target).map(|n| &n.kind) {
            Some(NodeKind::Instance(inst)) => inst.fields.get(index).and_then(Option::as_ref),
            _ => None,
        }
    }

    fn field_slot_mut(&mut self, target: RefId, index: usize) -> Option<&mut Option<Item>> {
        match self.nodes.get_mut(target).map(|n| &mut n.kind) {
            Some(NodeKind::Instance(inst)) => inst.fields.get_mut(index),
            _ => None,
        }
    }

    // ── map entries ───────────────────────────────────────────────────────

    fn apply_entry_op(
        &mut self,
        target: RefId,
        element: Element,
        kind: OpKind,
        key: u64,
        r: &mut Reader<'_>,
        offset: usize,
    ) -> Result<Option<Change>, DecodeError> {
        let entry = ref_id(key, offset)?;
        let wire = WireType::from(element);
        match kind {
            OpKind::Insert => {
                let name = r.str(self.config.max_string_bytes)?.to_owned();
                let incoming = self.read_item(r, wire)?;
                let map = self.map_at(target, offset)?;
                let existing = map.get_by_id(entry).map(|(k, e)| (k.to_owned(), e.item.clone()));
                let displaced = map.get(&name).filter(|e| e.id != entry).map(|e| e.id);
                let current = match existing {
                    Some((existing, _)) if existing != name => {
                        return Err(DecodeError::EntryKeyMismatch {
                            entry: entry.0,
                            existing,
                            found: name,
                            offset,
                        })
                    }
                    Some((_, item)) => Some(item),
                    None => None,
                };
                let is_new = current.is_none();
                let (item, dropped) = self.place(target, incoming, current, offset)?;
                if let Some(displaced) = displaced {
                    self.remove_entry(target, displaced);
                }
                if let Some(map) = self.map_at_mut(target) {
                    if is_new {
                        map.insert(name.clone(), entry, item);
                    } else {
                        map.replace(entry, item);
                    }
                }
                self.nodes.adopt(entry);
                if let Some(old) = dropped {
                    self.drop_subtree(old);
                }
                Ok(Some(Change {
                    target,
                    kind,
                    key: ChangeKey::Entry(name),
                }))
            }
            OpKind::Set => {
                let incoming = self.read_item(r, wire)?;
                let (name, current) = self
                    .map_at(target, offset)?
                    .get_by_id(entry)
                    .map(|(k, e)| (k.to_owned(), e.item.clone()))
                    .ok_or(DecodeError::UnknownEntry { entry: entry.0, offset })?;
                let (item, dropped) = self.place(target, incoming, Some(current), offset)?;
                if let Some(map) = self.map_at_mut(target) {
                    map.replace(entry, item);
                }
                if let Some(old) = dropped {
                    self.drop_subtree(old);
                }
                Ok(Some(Change {
                    target,
                    kind,
                    key: ChangeKey::Entry(name),
                }))
            }
            // The entry may have come and gone before this mirror joined.
            OpKind::Delete | OpKind::Unset => {
                Ok(self.remove_entry(target, entry).map(|name| Change {
                    target,
                    kind,
                    key: ChangeKey::Entry(name),
                }))
            }
        }
    }

    fn remove_entry(&mut self, target: RefId, entry: RefId) -> Option<String> {
        let (name, removed) = self.map_at_mut(target)?.remove_by_id(entry)?;
        if let Item::Node(child) = removed.item {
            self.drop_subtree(child);
        }
        Some(name)
    }

    fn map_at(&self, target: RefId, offset: usize) -> Result<&MapNode, DecodeError> {
        match self.nodes.get(target).map(|n| &n.kind) {
            Some(NodeKind::Map(map)) => Ok(map),
            _ => Err(DecodeError::UnknownTarget { target: target.0, offset }),
        }
    }

    fn map_at_mut(&mut self, target: RefId) -> Option<&mut MapNode> {
        match self.nodes.get_mut(target).map(|n| &mut n.kind) {
            Some(NodeKind::Map(map)) => Some(map),
            _ => None,
        }
    }

    // ── array elements ────────────────────────────────────────────────────

    fn apply_index_op(
        &mut self,
        target: RefId,
        element: Element,
        kind: OpKind,
        key: u64,
        r: &mut Reader<'_>,
        offset: usize,
    ) -> Result<Option<Change>, DecodeError> {
        let len = self.array_at_mut(target).map_or(0, |arr| arr.items.len());
        match kind {
            OpKind::Set => {
                let wire = WireType::from(element);
                let incoming = self.read_item(r, wire)?;
                let index = usize::try_from(key)
                    .ok()
                    .filter(|i| *i <= len)
                    .ok_or(DecodeError::IndexOutOfRange { index: key, len, offset })?;
                let current = self
                    .array_at_mut(target)
                    .and_then(|arr| arr.items.get(index).cloned());
                let (item, dropped) = self.place(target, incoming, current, offset)?;
                if let Some(arr) = self.array_at_mut(target) {
                    if index == arr.items.len() {
                        arr.items.push(item);
                    } else {
                        arr.items[index] = item;
                    }
                }
                if let Some(old) = dropped {
                    self.drop_subtree(old);
                }
                Ok(Some(Change {
                    target,
                    kind,
                    key: ChangeKey::Index(index),
                }))
            }
            // Truncation to `key`; already short enough means nothing to do.
            OpKind::Delete | OpKind::Unset => {
                let Some(index) = usize::try_from(key).ok().filter(|i| *i < len) else {
                    return Ok(None);
                };
                let removed: Vec<Item> = self
                    .array_at_mut(target)
                    .map(|arr| arr.items.drain(index..).collect())
                    .unwrap_or_default();
                for child in removed.iter().filter_map(Item::node) {
                    self.drop_subtree(child);
                }
                Ok(Some(Change {
                    target,
                    kind,
                    key: ChangeKey::Index(index),
                }))
            }
            OpKind::Insert => Err(DecodeError::InvalidOp {
                kind,
                shape: "array",
                offset,
            }),
        }
    }

    fn array_at_mut(&mut self, target: RefId) -> Option<&mut ArrayNode> {
        match self.nodes.get_mut(target).map(|n| &mut n.kind) {
            Some(NodeKind::Array(arr)) => Some(arr),
            _ => None,
        }
    }

    // ── items ─────────────────────────────────────────────────────────────

    fn read_item(&self, r: &mut Reader<'_>, wire: WireType) -> Result<Incoming, DecodeError> {
        let kind = match wire {
            WireType::Primitive(ty) => {
                return Value::read(ty, r, self.config.max_string_bytes).map(Incoming::Value)
            }
            WireType::Ref(expected) => {
                let child = read_ref(r)?;
                let offset = r.x;
                let found = r.vu57()?;
                if found != u64::from(expected.0) {
                    return Err(DecodeError::ChildTypeMismatch {
                        expected,
                        found,
                        offset,
                    });
                }
                let field_count = self.registry.get(expected).map_or(0, |t| t.len());
                return Ok(Incoming::Child(
                    child,
                    NodeKind::Instance(Instance::new(expected, field_count)),
                ));
            }
            WireType::Map(el) => NodeKind::Map(MapNode::new(el)),
            WireType::Array(el) => NodeKind::Array(ArrayNode::new(el)),
        };
        Ok(Incoming::Child(read_ref(r)?, kind))
    }

    /// Turns an incoming item into the item to store in a slot of `parent`
    /// that currently holds `current`. A child id already in that slot keeps
    /// its node; any other id creates a fresh node and hands back the one it
    /// displaces for removal.
    fn place(
        &mut self,
        parent: RefId,
        incoming: Incoming,
        current: Option<Item>,
        offset: usize,
    ) -> Result<(Item, Option<RefId>), DecodeError> {
        let displaced = current.as_ref().and_then(Item::node);
        match incoming {
            Incoming::Value(value) => Ok((Item::Value(value), displaced)),
            Incoming::Child(child, _) if displaced == Some(child) => Ok((Item::Node(child), None)),
            Incoming::Child(child, _) if self.nodes.contains(child) => {
                Err(DecodeError::RefInUse { id: child.0, offset })
            }
            Incoming::Child(child, kind) => {
                self.nodes.insert(
                    child,
                    Node {
                        parent: Some(parent),
                        kind,
                    },
                );
                Ok((Item::Node(child), displaced))
            }
        }
    }
}
