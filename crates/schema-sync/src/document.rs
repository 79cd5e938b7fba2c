//! The root graph and its mutation API.
//!
//! All writes go through explicit setters on [`Document`], each of which
//! forwards to the change tracker. Nodes are addressed by [`RefId`]; fields by
//! their declared name.

use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::change::{ChangeTracker, EntryChange};
use crate::config::DocumentConfig;
use crate::error::MutationError;
use crate::identity::{IdentityMap, RefId};
use crate::node::{ArrayNode, Instance, Item, MapNode, Node, NodeKind};
use crate::schema::{Element, Registry, SchemaId, WireType};
use crate::value::Value;

/// A root schema instance together with everything it owns.
///
/// The same type serves the authoritative producer (mutate, then
/// [`encode_diff`](Document::encode_diff) / [`encode_full`](Document::encode_full))
/// and its mirrors ([`decode`](Document::decode)).
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: DocumentConfig,
    pub(crate) nodes: IdentityMap,
    pub(crate) changes: ChangeTracker,
    /// Number of full snapshots encoded so far.
    pub(crate) epoch: u64,
    pub(crate) root_schema: SchemaId,
}

impl Document {
    pub fn new(registry: Arc<Registry>, root: SchemaId) -> Result<Self, MutationError> {
        Self::with_config(registry, root, DocumentConfig::default())
    }

    pub fn with_config(
        registry: Arc<Registry>,
        root: SchemaId,
        config: DocumentConfig,
    ) -> Result<Self, MutationError> {
        let field_count = registry
            .get(root)
            .map(|t| t.len())
            .ok_or(MutationError::UnknownSchema(root))?;
        let mut doc = Self::bare(registry, root, field_count, config);
        doc.create_containers(RefId::ROOT)?;
        Ok(doc)
    }

    /// Root instance with every field unset and no containers.
    fn bare(
        registry: Arc<Registry>,
        root: SchemaId,
        field_count: usize,
        config: DocumentConfig,
    ) -> Self {
        let mut nodes = IdentityMap::new();
        nodes.insert(
            RefId::ROOT,
            Node {
                parent: None,
                kind: NodeKind::Instance(Instance::new(root, field_count)),
            },
        );
        Self {
            registry,
            config,
            nodes,
            changes: ChangeTracker::new(),
            epoch: 0,
            root_schema: root,
        }
    }

    /// An empty graph sharing this document's registry, root type and config.
    pub(crate) fn blank(&self) -> Self {
        let field_count = self
            .registry
            .get(self.root_schema)
            .map(|t| t.len())
            .unwrap_or(0);
        Self::bare(
            Arc::clone(&self.registry),
            self.root_schema,
            field_count,
            self.config.clone(),
        )
    }

    pub fn root(&self) -> RefId {
        RefId::ROOT
    }

    pub fn root_schema(&self) -> SchemaId {
        self.root_schema
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn contains(&self, id: RefId) -> bool {
        self.nodes.contains(id)
    }

    /// Owner of `id`; `None` for the root and for unknown ids.
    pub fn parent(&self, id: RefId) -> Option<RefId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether [`encode_diff`](Document::encode_diff) would emit operations.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Drops all pending changes without encoding them.
    pub fn discard_changes(&mut self) {
        self.changes.clear();
    }

    // ── node creation ─────────────────────────────────────────────────────

    fn create_instance(&mut self, parent: RefId, schema: SchemaId) -> Result<RefId, MutationError> {
        let field_count = self
            .registry
            .get(schema)
            .map(|t| t.len())
            .ok_or(MutationError::UnknownSchema(schema))?;
        let id = self.allocate()?;
        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                kind: NodeKind::Instance(Instance::new(schema, field_count)),
            },
        );
        if let Err(err) = self.create_containers(id) {
            self.drop_subtree(id);
            return Err(err);
        }
        Ok(id)
    }

    fn allocate(&mut self) -> Result<RefId, MutationError> {
        self.nodes.allocate().ok_or(MutationError::IdsExhausted)
    }

    /// Instances own their container fields from birth.
    fn create_containers(&mut self, id: RefId) -> Result<(), MutationError> {
        let schema = self.instance(id)?.schema;
        let registry = Arc::clone(&self.registry);
        let ty = registry
            .get(schema)
            .ok_or(MutationError::UnknownSchema(schema))?;
        for (index, def) in ty.fields.iter().enumerate() {
            let kind = match def.wire {
                WireType::Map(el) => NodeKind::Map(MapNode::new(el)),
                WireType::Array(el) => NodeKind::Array(ArrayNode::new(el)),
                _ => continue,
            };
            let child = self.allocate()?;
            self.nodes.insert(
                child,
                Node {
                    parent: Some(id),
                    kind,
                },
            );
            if let Ok(inst) = self.instance_mut(id) {
                inst.fields[index] = Some(Item::Node(child));
            }
            self.changes.record_field(id, ty.len(), index);
        }
        Ok(())
    }

    pub(crate) fn drop_subtree(&mut self, id: RefId) {
        let removed = self.nodes.remove_subtree(id);
        self.changes.forget(&removed);
    }

    // ── lookups ───────────────────────────────────────────────────────────

    fn node(&self, id: RefId) -> Result<&Node, MutationError> {
        self.nodes.get(id).ok_or(MutationError::UnknownRef(id))
    }

    fn instance(&self, id: RefId) -> Result<&Instance, MutationError> {
        match &self.node(id)?.kind {
            NodeKind::Instance(inst) => Ok(inst),
            _ => Err(self.wrong_shape(id, "instance")),
        }
    }

    fn instance_mut(&mut self, id: RefId) -> Result<&mut Instance, MutationError> {
        let err = self.wrong_shape(id, "instance");
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Instance(inst)) => Ok(inst),
            _ => Err(err),
        }
    }

    fn map_node(&self, id: RefId) -> Result<&MapNode, MutationError> {
        match &self.node(id)?.kind {
            NodeKind::Map(map) => Ok(map),
            _ => Err(self.wrong_shape(id, "map")),
        }
    }

    fn map_node_mut(&mut self, id: RefId) -> Result<&mut MapNode, MutationError> {
        let err = self.wrong_shape(id, "map");
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Map(map)) => Ok(map),
            _ => Err(err),
        }
    }

    fn array_node(&self, id: RefId) -> Result<&ArrayNode, MutationError> {
        match &self.node(id)?.kind {
            NodeKind::Array(arr) => Ok(arr),
            _ => Err(self.wrong_shape(id, "array")),
        }
    }

    fn array_node_mut(&mut self, id: RefId) -> Result<&mut ArrayNode, MutationError> {
        let err = self.wrong_shape(id, "array");
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Array(arr)) => Ok(arr),
            _ => Err(err),
        }
    }

    fn wrong_shape(&self, id: RefId, expected: &'static str) -> MutationError {
        match self.nodes.get(id) {
            Some(node) => MutationError::WrongShape {
                id,
                expected,
                found: node.shape_name(),
            },
            None => MutationError::UnknownRef(id),
        }
    }

    /// Field index, declared wire type and field count of `target.field`.
    fn resolve_field(
        &self,
        target: RefId,
        field: &str,
    ) -> Result<(usize, WireType, usize), MutationError> {
        let inst = self.instance(target)?;
        let ty = self
            .registry
            .get(inst.schema)
            .ok_or(MutationError::UnknownSchema(inst.schema))?;
        let index = ty
            .field_index(field)
            .ok_or_else(|| MutationError::UnknownField {
                schema: ty.name.clone(),
                field: field.to_owned(),
            })?;
        Ok((index, ty.fields[index].wire, ty.len()))
    }

    // ── instance fields ───────────────────────────────────────────────────

    /// Assigns a primitive field.
    pub fn set(
        &mut self,
        target: RefId,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), MutationError> {
        let value = value.into();
        let (index, wire, field_count) = self.resolve_field(target, field)?;
        check_primitive(field, wire, &value)?;
        self.instance_mut(target)?.fields[index] = Some(Item::Value(value));
        self.changes.record_field(target, field_count, index);
        Ok(())
    }

    /// Clears a primitive or nested-instance field. Clearing an unset field
    /// still records an unset.
    pub fn unset(&mut self, target: RefId, field: &str) -> Result<(), MutationError> {
        let (index, wire, field_count) = self.resolve_field(target, field)?;
        if wire.is_container() {
            return Err(MutationError::ContainerUnset(field.to_owned()));
        }
        let old = self.instance_mut(target)?.fields[index].take();
        if let Some(Item::Node(child)) = old {
            self.drop_subtree(child);
        }
        self.changes.record_field(target, field_count, index);
        Ok(())
    }

    pub fn get(&self, target: RefId, field: &str) -> Result<Option<&Value>, MutationError> {
        let (index, _, _) = self.resolve_field(target, field)?;
        Ok(self.instance(target)?.fields[index]
            .as_ref()
            .and_then(Item::value))
    }

    /// Puts a fresh instance of the field's declared type into `field`,
    /// replacing (and destroying) any previous one.
    pub fn set_instance(&mut self, target: RefId, field: &str) -> Result<RefId, MutationError> {
        let (index, wire, field_count) = self.resolve_field(target, field)?;
        let WireType::Ref(schema) = wire else {
            return Err(MutationError::NotA {
                field: field.to_owned(),
                expected: wire,
                wanted: "nested instance",
            });
        };
        let child = self.create_instance(target, schema)?;
        let old = self.instance_mut(target)?.fields[index].replace(Item::Node(child));
        if let Some(Item::Node(old)) = old {
            self.drop_subtree(old);
        }
        self.changes.record_field(target, field_count, index);
        Ok(child)
    }

    /// Node held by a nested-instance or container field.
    pub fn child(&self, target: RefId, field: &str) -> Result<Option<RefId>, MutationError> {
        let (index, _, _) = self.resolve_field(target, field)?;
        Ok(self.instance(target)?.fields[index]
            .as_ref()
            .and_then(Item::node))
    }

    /// The map or array node of a container field.
    pub fn container(&self, target: RefId, field: &str) -> Result<RefId, MutationError> {
        let (_, wire, _) = self.resolve_field(target, field)?;
        if !wire.is_container() {
            return Err(MutationError::NotA {
                field: field.to_owned(),
                expected: wire,
                wanted: "container",
            });
        }
        self.child(target, field)?
            .ok_or_else(|| MutationError::FieldUnset(field.to_owned()))
    }

    // ── maps ──────────────────────────────────────────────────────────────

    /// Sets a primitive map entry, creating it if the key is new.
    pub fn map_set(
        &mut self,
        map: RefId,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), MutationError> {
        let value = value.into();
        let node = self.map_node(map)?;
        check_primitive(key, WireType::Map(node.element), &value)?;
        self.put_entry(map, key, Item::Value(value))
    }

    /// Puts a fresh instance of the element type under `key`. An existing
    /// entry keeps its identity; its previous instance is destroyed.
    pub fn map_insert_instance(&mut self, map: RefId, key: &str) -> Result<RefId, MutationError> {
        let element = self.map_node(map)?.element;
        let Element::Ref(schema) = element else {
            return Err(MutationError::NotA {
                field: key.to_owned(),
                expected: WireType::Map(element),
                wanted: "nested instance",
            });
        };
        let is_new = self.map_node(map)?.get(key).is_none();
        // New entries take their id before the child so that ids grow
        // parent to child.
        let entry = if is_new { Some(self.allocate()?) } else { None };
        let child = self.create_instance(map, schema)?;
        match entry {
            Some(entry) => self.add_entry(map, key, entry, Item::Node(child)),
            None => self.put_entry(map, key, Item::Node(child))?,
        }
        Ok(child)
    }

    fn put_entry(&mut self, map: RefId, key: &str, item: Item) -> Result<(), MutationError> {
        let existing = self.map_node(map)?.get(key).map(|e| e.id);
        match existing {
            Some(entry) => {
                let old = self
                    .map_node_mut(map)
                    .ok()
                    .and_then(|node| node.replace(entry, item));
                if let Some(Item::Node(old)) = old {
                    self.drop_subtree(old);
                }
                self.changes
                    .record_entry(map, entry, EntryChange::Update, self.epoch);
            }
            None => {
                let entry = self.allocate()?;
                self.add_entry(map, key, entry, item);
            }
        }
        Ok(())
    }

    fn add_entry(&mut self, map: RefId, key: &str, entry: RefId, item: Item) {
        if let Ok(node) = self.map_node_mut(map) {
            node.insert(key.to_owned(), entry, item);
        }
        let epoch = self.epoch;
        self.changes
            .record_entry(map, entry, EntryChange::Insert { epoch }, epoch);
    }

    /// Removes `key`. Returns whether it was present.
    pub fn map_remove(&mut self, map: RefId, key: &str) -> Result<bool, MutationError> {
        let Some(entry) = self.map_node(map)?.get(key).map(|e| e.id) else {
            return Ok(false);
        };
        let removed = self.map_node_mut(map)?.remove_by_id(entry);
        if let Some((_, removed)) = removed {
            if let Item::Node(child) = removed.item {
                self.drop_subtree(child);
            }
        }
        self.changes
            .record_entry(map, entry, EntryChange::Delete, self.epoch);
        Ok(true)
    }

    pub fn map_get(&self, map: RefId, key: &str) -> Result<Option<&Value>, MutationError> {
        Ok(self.map_node(map)?.get(key).and_then(|e| e.item.value()))
    }

    pub fn map_get_instance(&self, map: RefId, key: &str) -> Result<Option<RefId>, MutationError> {
        Ok(self.map_node(map)?.get(key).and_then(|e| e.item.node()))
    }

    /// Stable identity of the entry under `key`.
    pub fn map_entry_id(&self, map: RefId, key: &str) -> Result<Option<RefId>, MutationError> {
        Ok(self.map_node(map)?.get(key).map(|e| e.id))
    }

    pub fn map_len(&self, map: RefId) -> Result<usize, MutationError> {
        Ok(self.map_node(map)?.len())
    }

    /// Keys in insertion order.
    pub fn map_keys(&self, map: RefId) -> Result<Vec<&str>, MutationError> {
        Ok(self.map_node(map)?.iter().map(|(k, _)| k).collect())
    }

    // ── arrays ────────────────────────────────────────────────────────────

    pub fn array_push(&mut self, arr: RefId, value: impl Into<Value>) -> Result<(), MutationError> {
        let len = self.array_len(arr)?;
        self.array_set(arr, len, value)
    }

    pub fn array_push_instance(&mut self, arr: RefId) -> Result<RefId, MutationError> {
        let len = self.array_len(arr)?;
        self.array_set_instance(arr, len)
    }

    /// Assigns `index`; `index == len` appends.
    pub fn array_set(
        &mut self,
        arr: RefId,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), MutationError> {
        let value = value.into();
        let node = self.array_node(arr)?;
        check_primitive(&index.to_string(), WireType::Array(node.element), &value)?;
        self.put_slot(arr, index, Item::Value(value))
    }

    /// Puts a fresh instance at `index`; `index == len` appends.
    pub fn array_set_instance(&mut self, arr: RefId, index: usize) -> Result<RefId, MutationError> {
        let node = self.array_node(arr)?;
        let Element::Ref(schema) = node.element else {
            return Err(MutationError::NotA {
                field: index.to_string(),
                expected: WireType::Array(node.element),
                wanted: "nested instance",
            });
        };
        let len = node.items.len();
        if index > len {
            return Err(MutationError::IndexOutOfRange { id: arr, index, len });
        }
        let child = self.create_instance(arr, schema)?;
        self.put_slot(arr, index, Item::Node(child))?;
        Ok(child)
    }

    fn put_slot(&mut self, arr: RefId, index: usize, item: Item) -> Result<(), MutationError> {
        let node = self.array_node_mut(arr)?;
        let len = node.items.len();
        let old = match index {
            i if i < len => Some(std::mem::replace(&mut node.items[i], item)),
            i if i == len => {
                node.items.push(item);
                None
            }
            _ => return Err(MutationError::IndexOutOfRange { id: arr, index, len }),
        };
        let len_after = node.items.len();
        if let Some(Item::Node(old)) = old {
            self.drop_subtree(old);
        }
        self.changes.record_index(arr, index, len, len_after);
        Ok(())
    }

    /// Removes the last element. Returns whether there was one.
    pub fn array_pop(&mut self, arr: RefId) -> Result<bool, MutationError> {
        let node = self.array_node_mut(arr)?;
        let len = node.items.len();
        let Some(last) = node.items.pop() else {
            return Ok(false);
        };
        if let Item::Node(child) = last {
            self.drop_subtree(child);
        }
        self.changes.record_truncate(arr, len, len - 1);
        Ok(true)
    }

    pub fn array_get(&self, arr: RefId, index: usize) -> Result<Option<&Value>, MutationError> {
        Ok(self.array_node(arr)?.items.get(index).and_then(Item::value))
    }

    pub fn array_get_instance(
        &self,
        arr: RefId,
        index: usize,
    ) -> Result<Option<RefId>, MutationError> {
        Ok(self.array_node(arr)?.items.get(index).and_then(Item::node))
    }

    pub fn array_len(&self, arr: RefId) -> Result<usize, MutationError> {
        Ok(self.array_node(arr)?.items.len())
    }

    // ── plain projection ──────────────────────────────────────────────────

    /// The whole graph as plain JSON: instances and maps become objects,
    /// arrays become lists, unset fields are omitted.
    pub fn to_json(&self) -> Json {
        self.view(RefId::ROOT).unwrap_or(Json::Null)
    }

    /// Plain JSON projection of one node, `None` if it does not exist.
    ///
    /// Walks with an explicit stack, so nesting depth is bounded by memory
    /// rather than by the thread's stack.
    pub fn view(&self, id: RefId) -> Option<Json> {
        let mut stack = vec![self.open_view(id, Slot::Root)?];
        while let Some(mut top) = stack.pop() {
            match self.fill_view(&mut top) {
                Some((slot, child)) => {
                    let is_index = matches!(slot, Slot::Index);
                    let opened = self.open_view(child, slot);
                    stack.push(top);
                    match opened {
                        Some(frame) => stack.push(frame),
                        // A dangling array element still holds its position.
                        None if is_index => {
                            if let Some(parent) = stack.last_mut() {
                                attach(&mut parent.out, Slot::Index, Json::Null);
                            }
                        }
                        None => {}
                    }
                }
                None => match stack.last_mut() {
                    Some(parent) => attach(&mut parent.out, top.slot, top.out),
                    None => return Some(top.out),
                },
            }
        }
        None
    }

    fn open_view(&self, id: RefId, slot: Slot) -> Option<PartialView> {
        let out = match &self.nodes.get(id)?.kind {
            NodeKind::Instance(inst) => {
                self.registry.get(inst.schema)?;
                Json::Object(Map::new())
            }
            NodeKind::Map(_) => Json::Object(Map::new()),
            NodeKind::Array(arr) => Json::Array(Vec::with_capacity(arr.items.len())),
        };
        Some(PartialView { id, at: 0, slot, out })
    }

    /// Copies primitives into `frame` until it reaches a nested node, which
    /// is returned. `None` once the node is exhausted.
    fn fill_view(&self, frame: &mut PartialView) -> Option<(Slot, RefId)> {
        let node = self.nodes.get(frame.id)?;
        loop {
            let at = frame.at;
            frame.at += 1;
            let (slot, item) = match &node.kind {
                NodeKind::Instance(inst) => {
                    let def = self.registry.get(inst.schema)?.fields.get(at)?;
                    let Some(item) = inst.fields.get(at)?.as_ref() else {
                        continue;
                    };
                    (Slot::Key(def.name.clone()), item)
                }
                NodeKind::Map(map) => {
                    let (key, entry) = map.get_index(at)?;
                    (Slot::Key(key.to_owned()), &entry.item)
                }
                NodeKind::Array(arr) => (Slot::Index, arr.items.get(at)?),
            };
            match item {
                Item::Value(v) => attach(&mut frame.out, slot, v.to_json()),
                Item::Node(child) => return Some((slot, *child)),
            }
        }
    }
}

/// Where a finished projection lands in its parent.
enum Slot {
    Root,
    Key(String),
    Index,
}

/// A node whose projection is still being filled in.
struct PartialView {
    id: RefId,
    at: usize,
    slot: Slot,
    out: Json,
}

fn attach(out: &mut Json, slot: Slot, value: Json) {
    match (out, slot) {
        (Json::Object(map), Slot::Key(key)) => {
            map.insert(key, value);
        }
        (Json::Array(items), Slot::Index) => items.push(value),
        _ => {}
    }
}

fn check_primitive(field: &str, wire: WireType, value: &Value) -> Result<(), MutationError> {
    let declared = match wire {
        WireType::Primitive(p)
        | WireType::Map(Element::Primitive(p))
        | WireType::Array(Element::Primitive(p)) => p,
        _ => {
            return Err(MutationError::NotA {
                field: field.to_owned(),
                expected: wire,
                wanted: "primitive",
            })
        }
    };
    if declared != value.primitive_type() {
        return Err(MutationError::TypeMismatch {
            field: field.to_owned(),
            expected: wire,
            found: value.primitive_type(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PrimitiveType, SchemaDef};
    use serde_json::json;

    fn fixture() -> (Arc<Registry>, SchemaId) {
        let mut b = Registry::builder();
        let point = b
            .register(
                SchemaDef::new("Point")
                    .field("x", PrimitiveType::I32)
                    .field("y", PrimitiveType::I32),
            )
            .unwrap();
        let root = b
            .register(
                SchemaDef::new("Root")
                    .field("label", PrimitiveType::Str)
                    .field("origin", point)
                    .field("scores", WireType::map(PrimitiveType::U16))
                    .field("points", WireType::array(point)),
            )
            .unwrap();
        (Arc::new(b.build().unwrap()), root)
    }

    #[test]
    fn containers_exist_from_creation() {
        let (registry, root) = fixture();
        let doc = Document::new(registry, root).unwrap();
        assert_eq!(doc.node_count(), 3);
        assert!(doc.has_changes());
        assert_eq!(doc.to_json(), json!({"scores": {}, "points": []}));
    }

    #[test]
    fn set_checks_declared_type() {
        let (registry, root) = fixture();
        let mut doc = Document::new(registry, root).unwrap();
        let r = doc.root();
        doc.set(r, "label", "hi").unwrap();
        assert_eq!(doc.get(r, "label").unwrap(), Some(&Value::from("hi")));
        assert!(matches!(
            doc.set(r, "label", 3i32),
            Err(MutationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            doc.set(r, "origin", 3i32),
            Err(MutationError::NotA { .. })
        ));
        assert!(matches!(
            doc.set(r, "nope", 3i32),
            Err(MutationError::UnknownField { .. })
        ));
    }

    #[test]
    fn unset_removes_nested_subtree() {
        let (registry, root) = fixture();
        let mut doc = Document::new(registry, root).unwrap();
        let r = doc.root();
        let origin = doc.set_instance(r, "origin").unwrap();
        doc.set(origin, "x", 5i32).unwrap();
        assert!(doc.contains(origin));
        doc.unset(r, "origin").unwrap();
        assert!(!doc.contains(origin));
        assert_eq!(doc.child(r, "origin").unwrap(), None);
        assert!(matches!(
            doc.unset(r, "scores"),
            Err(MutationError::ContainerUnset(_))
        ));
    }

    #[test]
    fn replacing_an_instance_destroys_the_old_one() {
        let (registry, root) = fixture();
        let mut doc = Document::new(registry, root).unwrap();
        let r = doc.root();
        let first = doc.set_instance(r, "origin").unwrap();
        let second = doc.set_instance(r, "origin").unwrap();
        assert!(second > first);
        assert!(!doc.contains(first));
        assert_eq!(doc.parent(second), Some(r));
        assert_eq!(doc.parent(r), None);
        assert_eq!(doc.child(r, "origin").unwrap(), Some(second));
    }

    #[test]
    fn map_entries_keep_identity_across_updates() {
        let (registry, root) = fixture();
        let mut doc = Document::new(registry, root).unwrap();
        let scores = doc.container(doc.root(), "scores").unwrap();
        doc.map_set(scores, "b", 2u16).unwrap();
        doc.map_set(scores, "a", 1u16).unwrap();
        let id = doc.map_entry_id(scores, "b").unwrap();
        doc.map_set(scores, "b", 7u16).unwrap();
        assert_eq!(doc.map_entry_id(scores, "b").unwrap(), id);
        assert_eq!(doc.map_keys(scores).unwrap(), vec!["b", "a"]);
        assert_eq!(doc.map_get(scores, "b").unwrap(), Some(&Value::U16(7)));

        assert!(doc.map_remove(scores, "b").unwrap());
        assert!(!doc.map_remove(scores, "b").unwrap());
        assert_eq!(doc.map_len(scores).unwrap(), 1);
        doc.map_set(scores, "b", 9u16).unwrap();
        assert_ne!(doc.map_entry_id(scores, "b").unwrap(), id);
    }

    #[test]
    fn array_ops() {
        let (registry, root) = fixture();
        let mut doc = Document::new(registry, root).unwrap();
        let points = doc.container(doc.root(), "points").unwrap();
        let p0 = doc.array_push_instance(points).unwrap();
        doc.set(p0, "x", 1i32).unwrap();
        let p1 = doc.array_push_instance(points).unwrap();
        assert_eq!(doc.array_len(points).unwrap(), 2);
        assert_eq!(doc.array_get_instance(points, 1).unwrap(), Some(p1));
        assert!(matches!(
            doc.array_set_instance(points, 5),
            Err(MutationError::IndexOutOfRange { .. })
        ));
        assert!(doc.array_pop(points).unwrap());
        assert!(!doc.contains(p1));
        assert_eq!(doc.to_json()["points"], json!([{"x": 1}]));
        assert!(matches!(
            doc.array_push(points, 1i32),
            Err(MutationError::NotA { .. })
        ));
    }

    #[test]
    fn wrong_shape_is_reported() {
        let (registry, root) = fixture();
        let doc = Document::new(registry, root).unwrap();
        let err = doc.map_len(doc.root()).unwrap_err();
        assert_eq!(
            err,
            MutationError::WrongShape {
                id: RefId::ROOT,
                expected: "map",
                found: "instance"
            }
        );
        assert_eq!(
            doc.array_len(RefId(99)).unwrap_err(),
            MutationError::UnknownRef(RefId(99))
        );
    }

    #[test]
    fn discard_changes_clears_pending() {
        let (registry, root) = fixture();
        let mut doc = Document::new(registry, root).unwrap();
        doc.discard_changes();
        assert!(!doc.has_changes());
        doc.set(doc.root(), "label", "x").unwrap();
        assert!(doc.has_changes());
    }
}
