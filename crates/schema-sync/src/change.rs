//! Per-node record of mutations since the node was last flushed.
//!
//! Records hold *which* field, entry or index changed, never the value: the
//! encoder reads current values when it runs, so repeated writes inside one
//! window collapse to the last one.

use std::collections::{BTreeMap, BTreeSet};

use crate::identity::RefId;

/// Pending change of one map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryChange {
    /// Created in this window. `epoch` is the document's full-snapshot count
    /// at creation time.
    Insert { epoch: u64 },
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSet {
    /// Dirty flags in field declaration order.
    Instance { dirty: Vec<bool> },
    Map(BTreeMap<RefId, EntryChange>),
    /// `high_water` is the largest length the array had at any point in the
    /// window, including its start; `len` is its length now.
    Array {
        dirty: BTreeSet<usize>,
        high_water: usize,
        len: usize,
    },
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Instance { dirty } => !dirty.iter().any(|d| *d),
            Self::Map(entries) => entries.is_empty(),
            Self::Array {
                dirty,
                high_water,
                len,
            } => dirty.is_empty() && high_water <= len,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    pending: BTreeMap<RefId, ChangeSet>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a field of an instance with `field_count` fields.
    pub fn record_field(&mut self, id: RefId, field_count: usize, field: usize) {
        let set = self
            .pending
            .entry(id)
            .or_insert_with(|| ChangeSet::Instance {
                dirty: vec![false; field_count],
            });
        if let ChangeSet::Instance { dirty } = set {
            if let Some(flag) = dirty.get_mut(field) {
                *flag = true;
            }
        }
    }

    /// Merges an entry change into the map's record.
    ///
    /// An entry inserted and deleted inside one window with no full snapshot
    /// taken in between was never observed by anyone, so both records drop.
    pub fn record_entry(&mut self, id: RefId, entry: RefId, change: EntryChange, epoch: u64) {
        let set = self
            .pending
            .entry(id)
            .or_insert_with(|| ChangeSet::Map(BTreeMap::new()));
        let ChangeSet::Map(entries) = set else {
            return;
        };
        let merged = match (entries.get(&entry).copied(), change) {
            (Some(EntryChange::Insert { epoch: at }), EntryChange::Delete) if at == epoch => None,
            (Some(insert @ EntryChange::Insert { .. }), EntryChange::Update) => Some(insert),
            (_, next) => Some(next),
        };
        match merged {
            Some(change) => {
                entries.insert(entry, change);
            }
            None => {
                entries.remove(&entry);
            }
        }
        if entries.is_empty() {
            self.pending.remove(&id);
        }
    }

    /// Marks an array slot written. `len_before`/`len_after` bracket the
    /// mutation.
    pub fn record_index(&mut self, id: RefId, index: usize, len_before: usize, len_after: usize) {
        if let Some((dirty, high_water, len)) = self.array_entry(id, len_before) {
            dirty.insert(index);
            *high_water = (*high_water).max(len_after);
            *len = len_after;
        }
    }

    /// Records a shrink to `len_after`. Slots at or past the new length
    /// leave the dirty set; the encoder emits one truncation instead.
    pub fn record_truncate(&mut self, id: RefId, len_before: usize, len_after: usize) {
        if let Some((dirty, _, len)) = self.array_entry(id, len_before) {
            dirty.retain(|i| *i < len_after);
            *len = len_after;
        }
    }

    fn array_entry(
        &mut self,
        id: RefId,
        len_before: usize,
    ) -> Option<(&mut BTreeSet<usize>, &mut usize, &mut usize)> {
        let set = self.pending.entry(id).or_insert_with(|| ChangeSet::Array {
            dirty: BTreeSet::new(),
            high_water: len_before,
            len: len_before,
        });
        match set {
            ChangeSet::Array {
                dirty,
                high_water,
                len,
            } => {
                *high_water = (*high_water).max(len_before);
                Some((dirty, high_water, len))
            }
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: RefId) -> Option<&ChangeSet> {
        self.pending.get(&id)
    }

    /// Clears the pending record of one node.
    pub fn flush(&mut self, id: RefId) -> Option<ChangeSet> {
        self.pending.remove(&id)
    }

    /// Drops records of nodes that left the graph.
    pub fn forget(&mut self, ids: &[RefId]) {
        for id in ids {
            self.pending.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Nodes with pending changes, ascending by identifier.
    pub fn dirty(&self) -> Vec<RefId> {
        self.pending.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.values().all(ChangeSet::is_empty)
    }
}
