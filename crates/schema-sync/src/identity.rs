//! Reference identifiers and the node arena.
//!
//! Every node (schema instance, map, array) lives in a [`IdentityMap`] keyed
//! by its [`RefId`]. Map entries draw their ids from the same allocator.
//! Identifiers are allocated monotonically and never handed out twice for the
//! lifetime of a root, so an identifier carried by an undelivered buffer can
//! only ever address the object it was minted for.

use std::collections::BTreeMap;
use std::fmt;

use crate::node::Node;

/// Stable identity of a node or map entry, independent of key or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(pub u32);

impl RefId {
    /// Every document's root instance.
    pub const ROOT: RefId = RefId(0);

    /// Exclusive upper bound; `u32::MAX` is never a valid identifier.
    pub const LIMIT: u32 = u32::MAX;
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    nodes: BTreeMap<RefId, Node>,
    next: u32,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next unused identifier, or `None` once the id space
    /// is spent.
    pub fn allocate(&mut self) -> Option<RefId> {
        let id = RefId(self.next);
        self.next = self.next.checked_add(1)?;
        Some(id)
    }

    /// Records an identifier minted elsewhere (by the producer of a decoded
    /// stream) so local allocation never collides with it.
    pub fn adopt(&mut self, id: RefId) {
        self.next = self.next.max(id.0.saturating_add(1));
    }

    /// Next identifier `allocate` would return.
    pub fn watermark(&self) -> u32 {
        self.next
    }

    pub fn insert(&mut self, id: RefId, node: Node) {
        self.adopt(id);
        self.nodes.insert(id, node);
    }

    pub fn get(&self, id: RefId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: RefId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: RefId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Removes `id` and every node it transitively owns. Returns the removed
    /// identifiers, parents before children.
    pub fn remove_subtree(&mut self, id: RefId) -> Vec<RefId> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                removed.push(next);
                stack.extend(node.children());
            }
        }
        removed
    }
}
