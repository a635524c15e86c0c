//! Graph queries: past, future, anticone, and the deterministic block sort.
//!
//! All closures are iterative worklist computations — the DAG can reach
//! hundreds of thousands of blocks, so nothing here recurses on the call
//! stack. Full anticones are memoised per insertion epoch in
//! [`GraphCache`]; the engine clears the cache whenever the tip set changes.

use std::collections::HashMap;

use strand_types::BlockId;

use crate::block_set::BlockSet;
use crate::index::BlockIndex;

/// Per-epoch memo of full anticones. An anticone with an exclude set is the
/// memoised full anticone minus the exclude set, so only the full form is
/// cached.
#[derive(Debug, Default)]
pub struct GraphCache {
    anticones: HashMap<BlockId, BlockSet>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.anticones.clear();
    }
}

/// Transitive closure of `parents`.
pub fn past(index: &BlockIndex, id: BlockId) -> BlockSet {
    let mut result = BlockSet::new();
    let mut work = vec![id];
    while let Some(h) = work.pop() {
        if let Some(record) = index.get(&h) {
            for parent in &record.parents {
                if result.add(*parent) {
                    work.push(*parent);
                }
            }
        }
    }
    result
}

/// Transitive closure of `children`.
pub fn future(index: &BlockIndex, id: BlockId) -> BlockSet {
    let mut result = BlockSet::new();
    let mut work = vec![id];
    while let Some(h) = work.pop() {
        if let Some(record) = index.get(&h) {
            for child in &record.children {
                if result.add(*child) {
                    work.push(*child);
                }
            }
        }
    }
    result
}

/// All blocks neither in the past nor the future of `id`, minus `exclude`.
pub fn anticone(
    index: &BlockIndex,
    cache: &mut GraphCache,
    id: BlockId,
    exclude: Option<&BlockSet>,
) -> BlockSet {
    let full = match cache.anticones.get(&id) {
        Some(full) => full.clone(),
        None => {
            let past_set = past(index, id);
            let future_set = future(index, id);
            let mut full = BlockSet::new();
            for candidate in index.ids() {
                if *candidate == id || past_set.has(candidate) || future_set.has(candidate) {
                    continue;
                }
                full.add(*candidate);
            }
            cache.anticones.insert(id, full.clone());
            full
        }
    };
    match exclude {
        Some(ex) => full.difference(ex),
        None => full,
    }
}

/// Deterministic block sort: ascending `past_count`, ties broken by
/// ascending lexicographic id. When `bs` is given, members of `bs` precede
/// non-members. Every order-producing operation in the engine funnels
/// through this function — it is the sole tie-break.
pub fn sort_by_past_count(
    index: &BlockIndex,
    set: &BlockSet,
    bs: Option<&BlockSet>,
) -> Vec<BlockId> {
    let key = |id: &BlockId| {
        let past_count = index.get(id).map(|r| r.past_count).unwrap_or(0);
        (past_count, *id)
    };

    let mut members: Vec<BlockId> = Vec::new();
    let mut rest: Vec<BlockId> = Vec::new();
    for id in set {
        match bs {
            Some(blue) if blue.has(id) => members.push(*id),
            _ => rest.push(*id),
        }
    }
    members.sort_by_key(key);
    rest.sort_by_key(key);
    members.extend(rest);
    members
}
