//! Block index — arena of block records keyed by id.
//!
//! Parent/child links are stored as ids, never owning handles, so the cyclic
//! graph shape never fights the ownership model. Records live for the
//! process lifetime; they are never deleted, only superseded by
//! reorganisation of the derived sets.

use std::collections::HashMap;

use strand_types::BlockId;

use crate::block_set::BlockSet;
use crate::error::DagError;

/// One record per accepted block.
#[derive(Clone, Debug)]
pub struct BlockRecord {
    pub id: BlockId,
    /// Minimal antichain reaching the block's past. Non-empty except for
    /// genesis; every parent is already indexed.
    pub parents: BlockSet,
    /// Populated reactively when a later block names this one as parent.
    pub children: BlockSet,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Size of the transitive past set; fixed at insertion.
    pub past_count: u64,
    /// Position in the emitted total order; recomputable.
    pub order_height: u64,
}

/// Maps id → record and keeps the child links in sync.
#[derive(Debug, Default)]
pub struct BlockIndex {
    records: HashMap<BlockId, BlockRecord>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn get(&self, id: &BlockId) -> Option<&BlockRecord> {
        self.records.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &BlockId) -> Option<&mut BlockRecord> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all indexed ids; order is unspecified.
    pub fn ids(&self) -> impl Iterator<Item = &BlockId> {
        self.records.keys()
    }

    /// Insert a new record and wire it into each parent's child set.
    ///
    /// Fails with [`DagError::DuplicateBlock`] if the id is already indexed
    /// and with [`DagError::MissingParents`] if any named parent is absent —
    /// upstream feeds blocks in parent-before-child order.
    pub fn insert(
        &mut self,
        id: BlockId,
        parents: BlockSet,
        timestamp: i64,
    ) -> Result<(), DagError> {
        if self.records.contains_key(&id) {
            return Err(DagError::DuplicateBlock(id));
        }
        for parent in &parents {
            if !self.records.contains_key(parent) {
                return Err(DagError::MissingParents(id));
            }
        }
        for parent in &parents {
            if let Some(record) = self.records.get_mut(parent) {
                record.children.add(id);
            }
        }
        self.records.insert(
            id,
            BlockRecord {
                id,
                parents,
                children: BlockSet::new(),
                timestamp,
                past_count: 0,
                order_height: 0,
            },
        );
        Ok(())
    }
}
