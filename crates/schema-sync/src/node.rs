//! Graph node types: schema instances and the two container kinds.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::identity::RefId;
use crate::schema::{Element, SchemaId};
use crate::value::Value;

/// Content of a field, map entry or array slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Value(Value),
    /// An owned child node.
    Node(RefId),
}

impl Item {
    pub fn node(&self) -> Option<RefId> {
        match self {
            Self::Node(id) => Some(*id),
            Self::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Node(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    /// Owner; `None` only for the root.
    pub parent: Option<RefId>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Instance(Instance),
    Map(MapNode),
    Array(ArrayNode),
}

impl Node {
    pub fn children(&self) -> Vec<RefId> {
        match &self.kind {
            NodeKind::Instance(inst) => inst
                .fields
                .iter()
                .filter_map(|f| f.as_ref().and_then(Item::node))
                .collect(),
            NodeKind::Map(map) => map.entries.values().filter_map(|e| e.item.node()).collect(),
            NodeKind::Array(arr) => arr.items.iter().filter_map(Item::node).collect(),
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Instance(_) => "instance",
            NodeKind::Map(_) => "map",
            NodeKind::Array(_) => "array",
        }
    }
}

/// A schema instance: one slot per declared field, `None` meaning unset.
#[derive(Debug, Clone)]
pub struct Instance {
    pub schema: SchemaId,
    pub fields: Vec<Option<Item>>,
}

impl Instance {
    pub fn new(schema: SchemaId, field_count: usize) -> Self {
        Self {
            schema,
            fields: vec![None; field_count],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub id: RefId,
    pub item: Item,
}

/// String-keyed container. Entries keep insertion order; `keys` is the
/// entry-id index the decoder routes by.
#[derive(Debug, Clone)]
pub struct MapNode {
    pub element: Element,
    entries: IndexMap<String, MapEntry>,
    keys: BTreeMap<RefId, String>,
}

impl MapNode {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            entries: IndexMap::new(),
            keys: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&MapEntry> {
        self.entries.get(key)
    }

    pub fn get_by_id(&self, id: RefId) -> Option<(&str, &MapEntry)> {
        let key = self.keys.get(&id)?;
        self.entries.get(key).map(|e| (key.as_str(), e))
    }

    /// Adds a new entry. The key must not be present.
    pub fn insert(&mut self, key: String, id: RefId, item: Item) {
        self.keys.insert(id, key.clone());
        self.entries.insert(key, MapEntry { id, item });
    }

    /// Replaces the item of an existing entry, returning the old item.
    pub fn replace(&mut self, id: RefId, item: Item) -> Option<Item> {
        let key = self.keys.get(&id)?;
        let entry = self.entries.get_mut(key)?;
        Some(std::mem::replace(&mut entry.item, item))
    }

    pub fn remove_by_id(&mut self, id: RefId) -> Option<(String, MapEntry)> {
        let key = self.keys.remove(&id)?;
        let entry = self.entries.shift_remove(&key)?;
        Some((key, entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MapEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Entry at insertion position `at`.
    pub fn get_index(&self, at: usize) -> Option<(&str, &MapEntry)> {
        self.entries.get_index(at).map(|(k, e)| (k.as_str(), e))
    }
}

/// Index-addressed container.
#[derive(Debug, Clone)]
pub struct ArrayNode {
    pub element: Element,
    pub items: Vec<Item>,
}

impl ArrayNode {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            items: Vec::new(),
        }
    }
}
