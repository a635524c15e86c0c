//! The DAG engine.
//!
//! Maintains tips, the last-common frontier, the common and tempo blue sets,
//! the hourglass set, and the emitted total order. The order is split into a
//! stable prefix (`common_order`) and an unstable tail (`temp_order`) that is
//! recomputed on every insertion; the final total order is their
//! concatenation.

use std::sync::RwLock;

use strand_types::{Block, BlockId};
use tracing::error;

use crate::block_set::BlockSet;
use crate::blue::{calculate_blue_set, fill_past_blue, PastBlueMap};
use crate::error::DagError;
use crate::graph::{anticone, future, sort_by_past_count, GraphCache};
use crate::index::{BlockIndex, BlockRecord};

/// The engine state. All mutation happens through [`DagState::add`]; the
/// derived sets are only ever consistent between calls.
#[derive(Debug)]
pub struct DagState {
    genesis: BlockId,
    index: BlockIndex,
    /// Blocks with no children.
    tips: BlockSet,
    total: u32,
    /// Honest blocks at or behind `last_common`; append-only for a given
    /// history prefix, pruned only on rollback.
    common_blue: BlockSet,
    /// Honest blocks between `last_common` and the tips; invalidated on
    /// every insertion.
    temp_blue: Option<BlockSet>,
    /// The antichain that is the greatest common ancestor frontier of all
    /// tips.
    last_common: BlockSet,
    /// Total order over the stable prefix. Rollback nulls tail entries in
    /// place; the effective length runs to the last non-null entry.
    common_order: Vec<Option<BlockId>>,
    /// Total order over the tail, recomputed on each insertion.
    temp_order: Vec<BlockId>,
    /// Blocks with an empty honest anticone — finality hints.
    hourglass: BlockSet,
    /// Monotone high-water mark of block timestamps.
    last_time: i64,
    /// Anticone-size bound, fixed at initialisation.
    k: u32,
    cache: GraphCache,
}

impl DagState {
    pub fn new(k: u32) -> Self {
        Self {
            genesis: BlockId::ZERO,
            index: BlockIndex::new(),
            tips: BlockSet::new(),
            total: 0,
            common_blue: BlockSet::new(),
            temp_blue: None,
            last_common: BlockSet::new(),
            common_order: Vec::new(),
            temp_order: Vec::new(),
            hourglass: BlockSet::new(),
            last_time: 0,
            k,
            cache: GraphCache::new(),
        }
    }

    // ── Insertion ───────────────────────────────────────────────────────

    /// Insert an already-validated block and rebuild the derived sets.
    ///
    /// Returns the in-order list of blocks whose `order_height` changed.
    pub fn add(&mut self, block: &Block) -> Result<Vec<BlockId>, DagError> {
        let id = block.id;
        let parents: BlockSet = block.parents.iter().copied().collect();
        self.index.insert(id, parents, block.timestamp)?;

        self.total += 1;
        self.temp_blue = None;
        self.cache.clear();

        if block.timestamp > self.last_time {
            self.last_time = block.timestamp;
        }

        let was_empty = self.tips.is_empty();
        self.update_tips(id);

        if was_empty {
            // First block is genesis: it is its own order and hourglass.
            self.genesis = id;
            self.common_blue.clear();
            self.last_common.clear();
            self.common_order.clear();
            self.hourglass.clear();
            self.hourglass.add(id);
            self.temp_order = vec![id];
            return Ok(vec![id]);
        }

        self.freeze_past_count(id);
        self.update_common_blue_set(id)?;
        self.update_hourglass();
        Ok(self.update_order(id))
    }

    /// Refresh the tip set with a new block.
    fn update_tips(&mut self, id: BlockId) {
        let was_tip = self.tips.has(&id);
        let snapshot: Vec<BlockId> = self.tips.iter().copied().collect();
        for tip in snapshot {
            let has_children = self
                .index
                .get(&tip)
                .map(|r| !r.children.is_empty())
                .unwrap_or(false);
            if has_children {
                self.tips.remove(&tip);
            }
        }
        if !was_tip {
            self.tips.add(id);
        }
    }

    /// The past set cannot change, so its size is computed once and frozen.
    fn freeze_past_count(&mut self, id: BlockId) {
        if id == self.genesis {
            return;
        }
        let parents = match self.index.get(&id) {
            Some(record) if !record.parents.is_empty() => record.parents.clone(),
            _ => return,
        };
        let count = if parents.len() == 1 {
            let parent = self.max_past_parent(&parents);
            self.past_count_of(&parent) + 1
        } else {
            // Let p* be the parent with the largest past; everything in
            // p*'s anticone that is also in the new block's past accounts
            // for the remainder.
            let own_anticone = anticone(&self.index, &mut self.cache, id, None);
            let selected = self.max_past_parent(&parents);
            let extra = anticone(&self.index, &mut self.cache, selected, Some(&own_anticone));
            self.past_count_of(&selected) + extra.len() as u64 + 1
        };
        if let Some(record) = self.index.get_mut(&id) {
            record.past_count = count;
        }
    }

    fn max_past_parent(&self, parents: &BlockSet) -> BlockId {
        let mut best: Option<(u64, BlockId)> = None;
        for parent in parents {
            let count = self.past_count_of(parent);
            best = match best {
                None => Some((count, *parent)),
                Some((bc, bid)) => {
                    if count > bc || (count == bc && *parent < bid) {
                        Some((count, *parent))
                    } else {
                        Some((bc, bid))
                    }
                }
            };
        }
        best.map(|(_, id)| id).unwrap_or(self.genesis)
    }

    fn past_count_of(&self, id: &BlockId) -> u64 {
        self.index.get(id).map(|r| r.past_count).unwrap_or(0)
    }

    // ── Last-common frontier and common blue set ────────────────────────

    fn update_common_blue_set(&mut self, tip: BlockId) -> Result<(), DagError> {
        let parents = self
            .index
            .get(&tip)
            .map(|r| r.parents.clone())
            .unwrap_or_default();

        // Early regime: everything still hangs directly off genesis. Once
        // the frontier has advanced past genesis a sideways genesis-child
        // must take the general recompute path below so the rollback fires.
        let early = self.last_common.is_empty() || self.last_common.has_only(&self.genesis);
        if parents.has_only(&self.genesis) && early {
            self.common_blue.clear();
            self.common_blue.add(self.genesis);
            self.last_common.clear();
            self.last_common.add(self.genesis);
            if self.common_order.is_empty() {
                self.common_order.push(Some(self.genesis));
            }
            return Ok(());
        }

        if self.tips.len() <= 1 {
            return Ok(());
        }
        let curr = match self.calc_last_common_blocks(tip) {
            Some(curr) => curr,
            None => return Ok(()),
        };
        if curr == self.last_common {
            return Ok(());
        }

        let curr_future = self.future_of_set(&curr);
        let prev_future = self.future_of_set(&self.last_common);

        if prev_future.contains_set(&curr_future) {
            // The common prefix advanced: decide the blue set over the
            // newly-stabilised region and append its deterministic order.
            let mut o_exclude = curr_future.clone();
            let prev_last_common = self.last_common.clone();
            for member in &prev_last_common {
                if let Some(record) = self.index.get(member) {
                    o_exclude.add_set(&record.parents);
                }
            }

            let mut past_blue = PastBlueMap::new();
            self.last_common_past_blue(&mut past_blue);
            for member in sort_by_past_count(&self.index, &curr, None) {
                fill_past_blue(
                    &self.index,
                    &mut self.cache,
                    self.genesis,
                    member,
                    &mut past_blue,
                    None,
                    self.k,
                );
            }
            let new_blue = calculate_blue_set(
                &self.index,
                &mut self.cache,
                &curr,
                Some(&curr_future),
                &past_blue,
                None,
                self.k,
            )
            .unwrap_or_default();

            let start = self.total as usize - prev_future.len();
            self.append_common_order(&new_blue, &o_exclude, &curr, start);
            self.common_blue.add_set(&new_blue);
            self.last_common = curr;
        } else if curr_future.contains_set(&prev_future) {
            // Rollback: the prefix was not truly common after all.
            let start = self.total as usize - curr_future.len();
            self.rollback_common_order(&curr, start);
            self.common_blue.exclude(&curr_future);
            self.last_common = curr;
        } else {
            return Err(DagError::CommonSetInconsistent);
        }
        Ok(())
    }

    fn future_of_set(&self, set: &BlockSet) -> BlockSet {
        let mut result = BlockSet::new();
        for member in set {
            result.add_set(&future(&self.index, *member));
        }
        result
    }

    /// Walk backward from the tips, repeatedly expanding the deepest
    /// ancestor among their genealogies, until every tip shares the same
    /// ancestor frontier.
    fn calc_last_common_blocks(&mut self, tip: BlockId) -> Option<BlockSet> {
        if self.tips.len() <= 1 {
            return None;
        }
        let mut tip_list: Vec<BlockId> = self.tips.iter().copied().collect();
        tip_list.sort();
        let mut ancestors: Vec<(BlockId, BlockSet)> = Vec::new();
        let mut genealogy: Vec<BlockSet> = Vec::new();
        for t in &tip_list {
            let mut s = BlockSet::new();
            s.add(*t);
            ancestors.push((*t, s.clone()));
            genealogy.push(s);
        }
        let tip_pos = tip_list.iter().position(|t| *t == tip)?;

        loop {
            let reference = ancestors[tip_pos].1.clone();
            let all_equal = ancestors.iter().all(|(_, set)| *set == reference);
            if all_equal {
                return Some(reference);
            }
            self.expand_deepest_ancestor(&mut ancestors, &mut genealogy);
        }
    }

    /// One step of the frontier walk: pick the globally deepest ancestor
    /// (max past-count, lexicographic tie-break) and replace it with its
    /// parents in the owning tip's genealogy.
    fn expand_deepest_ancestor(
        &self,
        ancestors: &mut [(BlockId, BlockSet)],
        genealogy: &mut [BlockSet],
    ) {
        let mut pick: Option<(u64, BlockId, usize)> = None;
        for (pos, (_, set)) in ancestors.iter().enumerate() {
            if set.len() == 1 && set.has(&self.genesis) {
                continue;
            }
            for member in set {
                let count = self.past_count_of(member);
                let better = match pick {
                    None => true,
                    Some((bc, bid, _)) => count > bc || (count == bc && *member < bid),
                };
                if better {
                    pick = Some((count, *member, pos));
                }
            }
        }
        let Some((_, deepest, pos)) = pick else {
            return;
        };
        let parents = match self.index.get(&deepest) {
            Some(record) if !record.parents.is_empty() => record.parents.clone(),
            _ => return,
        };
        ancestors[pos].1.remove(&deepest);
        for parent in &parents {
            if genealogy[pos].add(*parent) {
                ancestors[pos].1.add(*parent);
            }
        }
    }

    /// Seed the past-blue memo for the members of `last_common`.
    fn last_common_past_blue(&mut self, past_blue: &mut PastBlueMap) {
        let last_common = self.last_common.clone();
        let last_future = self.future_of_set(&last_common);

        if last_common.len() == 1 {
            if let Some(only) = last_common.iter().next() {
                past_blue.insert(*only, BlockSet::new());
            }
            return;
        }

        let mut frontier_blue = BlockSet::new();
        let mut anticones: Vec<(BlockId, BlockSet)> = Vec::new();
        for member in &last_common {
            let anti = anticone(&self.index, &mut self.cache, *member, Some(&last_future));
            frontier_blue.add_set(&anti);
            anticones.push((*member, anti));
        }
        frontier_blue = frontier_blue.intersection(&self.common_blue);
        for (member, anti) in anticones {
            let mut seed = frontier_blue.clone();
            seed.exclude(&anti);
            seed.remove(&member);
            past_blue.insert(member, seed);
        }
    }

    // ── Common order maintenance ────────────────────────────────────────

    fn common_order_push(&mut self, id: BlockId) {
        let slot = self.common_order.len();
        self.common_order.push(Some(id));
        if let Some(record) = self.index.get_mut(&id) {
            record.order_height = slot as u64;
        }
    }

    /// Append the deterministic order of the newly-stabilised region.
    fn append_common_order(
        &mut self,
        blue_set: &BlockSet,
        exclude: &BlockSet,
        curr_last_common: &BlockSet,
        start: usize,
    ) {
        let mut order = Vec::new();
        let mut ordered = BlockSet::new();
        let prev_last_common = self.last_common.clone();
        for member in sort_by_past_count(&self.index, &prev_last_common, Some(blue_set)) {
            self.order_walk(&mut order, &mut ordered, blue_set, member, Some(exclude));
        }

        // Drop holes left by an earlier rollback before appending.
        while matches!(self.common_order.last(), Some(None)) {
            self.common_order.pop();
        }
        if self.common_order.len() != start {
            error!(
                have = self.common_order.len(),
                expected = start,
                "common order length mismatch before append"
            );
        }
        for id in order {
            if prev_last_common.has(&id) {
                continue;
            }
            self.common_order_push(id);
        }
        if let Some(Some(tail)) = self.common_order.last() {
            if !curr_last_common.has(tail) {
                error!(block = %tail, "common order tail is not a member of the new common frontier");
            }
        }
    }

    /// Null out the tail of the common order back to the rolled-back
    /// frontier.
    fn rollback_common_order(&mut self, curr_last_common: &BlockSet, start: usize) {
        for slot in (0..self.common_order.len()).rev() {
            match self.common_order[slot] {
                Some(id) if curr_last_common.has(&id) => break,
                _ => self.common_order[slot] = None,
            }
        }
        if self.common_order_len() != start {
            error!(
                have = self.common_order_len(),
                expected = start,
                "common order length mismatch after rollback"
            );
        }
    }

    // ── Tempo blue set ──────────────────────────────────────────────────

    /// The blue set of the region between `last_common` and the tips,
    /// computed lazily and invalidated on every insertion.
    fn temp_blue_set(&mut self) -> BlockSet {
        if let Some(cached) = &self.temp_blue {
            return cached.clone();
        }
        let computed = self.compute_temp_blue();
        self.temp_blue = Some(computed.clone());
        computed
    }

    fn compute_temp_blue(&mut self) -> BlockSet {
        if self.tips.has_only(&self.genesis) {
            let mut result = BlockSet::new();
            result.add(self.genesis);
            return result;
        }
        let mut past_blue = PastBlueMap::new();
        self.last_common_past_blue(&mut past_blue);
        let tips = self.tips.clone();
        for tip in sort_by_past_count(&self.index, &tips, None) {
            fill_past_blue(
                &self.index,
                &mut self.cache,
                self.genesis,
                tip,
                &mut past_blue,
                None,
                self.k,
            );
        }
        let mut result = calculate_blue_set(
            &self.index,
            &mut self.cache,
            &tips,
            None,
            &past_blue,
            None,
            self.k,
        )
        .unwrap_or_default();
        // The frontier members already belong to the common blue set; the
        // tempo set covers only the region strictly after them.
        result.exclude(&self.last_common);
        result
    }

    // ── Hourglass ───────────────────────────────────────────────────────

    /// A block is an hourglass iff its anticone within the honest sets is
    /// empty. The newest such block among the explored honest ancestry
    /// replaces the previous hint; exploring all the way back lands on
    /// genesis.
    fn update_hourglass(&mut self) {
        if self.tips.is_empty() {
            return;
        }
        if self.tips.has_only(&self.genesis) {
            self.hourglass.clear();
            self.hourglass.add(self.genesis);
            return;
        }
        // Directly-on-genesis tips carry no better hint than genesis itself.
        let shallow = self
            .tips
            .iter()
            .filter(|t| {
                self.index
                    .get(t)
                    .map(|r| r.parents.has_only(&self.genesis))
                    .unwrap_or(false)
            })
            .count();
        if shallow == self.tips.len() {
            return;
        }

        let temp_blue = self.temp_blue_set();
        let mut genealogy = self.tips.clone();
        let mut ancestors = self.tips.clone();

        loop {
            let mut honest = temp_blue.intersection(&ancestors);
            honest.add_set(&self.common_blue.intersection(&ancestors));

            let mut candidates = sort_by_past_count(&self.index, &honest, None);
            candidates.reverse();
            for candidate in candidates {
                let anti = anticone(&self.index, &mut self.cache, candidate, None);
                let honest_anticone =
                    temp_blue.intersection(&anti).len() + self.common_blue.intersection(&anti).len();
                if anti.is_empty() || honest_anticone == 0 {
                    self.hourglass.clear();
                    self.hourglass.add(candidate);
                    return;
                }
            }

            if !self.expand_hourglass_frontier(&mut genealogy, &mut ancestors) {
                break;
            }
            if ancestors.is_empty() || ancestors.has_only(&self.genesis) {
                break;
            }
        }
        self.hourglass.clear();
        self.hourglass.add(self.genesis);
    }

    /// Replace the deepest frontier member with its parents; false when
    /// there is nothing left to expand.
    fn expand_hourglass_frontier(
        &mut self,
        genealogy: &mut BlockSet,
        ancestors: &mut BlockSet,
    ) -> bool {
        let mut pick: Option<(u64, BlockId)> = None;
        for member in ancestors.iter() {
            let count = self.past_count_of(member);
            let better = match pick {
                None => true,
                Some((bc, bid)) => count > bc || (count == bc && *member < bid),
            };
            if better {
                pick = Some((count, *member));
            }
        }
        let Some((_, deepest)) = pick else {
            return false;
        };
        let parents = match self.index.get(&deepest) {
            Some(record) if !record.parents.is_empty() => record.parents.clone(),
            _ => return false,
        };
        ancestors.remove(&deepest);
        for parent in &parents {
            if genealogy.add(*parent) {
                ancestors.add(*parent);
            }
        }
        true
    }

    // ── Order emission ──────────────────────────────────────────────────

    /// Recompute `temp_order` and every temp block's `order_height`.
    /// Returns the in-order list of blocks whose height changed.
    fn update_order(&mut self, added: BlockId) -> Vec<BlockId> {
        self.temp_order.clear();

        let blue = self.temp_blue_set();
        let last_common = self.last_common.clone();
        let mut exclude = BlockSet::new();
        for member in &last_common {
            if let Some(record) = self.index.get(member) {
                exclude.add_set(&record.parents);
            }
        }

        let mut order = Vec::new();
        let mut ordered = BlockSet::new();
        for member in sort_by_past_count(&self.index, &last_common, None) {
            self.order_walk(&mut order, &mut ordered, &blue, member, Some(&exclude));
        }

        let prefix = self.common_order_len();
        let mut offset = 0usize;
        for id in &order {
            if last_common.has(id) {
                continue;
            }
            self.temp_order.push(*id);
            let height = (prefix + offset) as u64;
            offset += 1;
            if let Some(record) = self.index.get_mut(id) {
                record.order_height = height;
            }
            if height == 0 && *id != self.genesis {
                error!(block = %id, "non-genesis block ordered at height zero");
            }
        }

        if self.common_order_len() + self.temp_order.len() != self.total as usize {
            error!(
                common = self.common_order_len(),
                temp = self.temp_order.len(),
                total = self.total,
                "order emission does not cover the block count"
            );
        }

        if self.tips.has_only(&added) || self.temp_order.last() == Some(&added) {
            if let Some(record) = self.index.get_mut(&added) {
                record.order_height = (self.total - 1) as u64;
            }
            return vec![added];
        }
        let mut changed = Vec::new();
        for id in self.temp_order.iter().rev() {
            changed.push(*id);
            if *id == added {
                break;
            }
        }
        changed.reverse();
        changed
    }

    /// Deterministic topological walk over the region starting at `h`.
    ///
    /// Uncles in the anticone that are strictly past-smaller are ordered
    /// first, then the block itself, then its children — blue children
    /// first, red flushed only after the blue part of the same subtree is
    /// ordered. A block is never emitted before all of its parents.
    fn order_walk(
        &mut self,
        out: &mut Vec<BlockId>,
        ordered: &mut BlockSet,
        bs: &BlockSet,
        h: BlockId,
        exclude: Option<&BlockSet>,
    ) {
        if let Some(ex) = exclude {
            if ex.has(&h) {
                return;
            }
        }
        let Some(record) = self.index.get(&h) else {
            return;
        };
        let parents = record.parents.clone();
        for parent in &parents {
            if exclude.map_or(false, |ex| ex.has(parent)) {
                continue;
            }
            if !ordered.has(parent) {
                return;
            }
        }

        // Order past-smaller uncles before this block.
        let mut own_anticone: Option<BlockSet> = None;
        if !ordered.has(&h) && h != self.genesis && !self.last_common.has(&h) {
            let anti = anticone(&self.index, &mut self.cache, h, exclude);
            if !anti.is_empty() {
                let uncles = sort_by_past_count(&self.index, &anti, Some(bs));
                let own_past = self.past_count_of(&h);
                for uncle in uncles {
                    if !bs.has(&uncle) || ordered.has(&uncle) {
                        continue;
                    }
                    if bs.has(&h) && self.past_count_of(&uncle) >= own_past {
                        continue;
                    }
                    self.order_walk(out, ordered, bs, uncle, exclude);
                }
            }
            own_anticone = Some(anti);
        }

        if !ordered.has(&h) {
            out.push(h);
            ordered.add(h);
        }

        // Children: blue first, red flushed after the blue subtree.
        let mut children = self
            .index
            .get(&h)
            .map(|r| r.children.clone())
            .unwrap_or_default();
        if let Some(ex) = exclude {
            children.exclude(ex);
        }
        if children.is_empty() {
            return;
        }
        let siblings = sort_by_past_count(&self.index, &children, Some(bs));
        for child in &siblings {
            if !bs.has(child) {
                continue;
            }
            if !ordered.has(child) {
                let mut walk_exclude = ordered.clone();
                if let Some(ex) = exclude {
                    walk_exclude.add_set(ex);
                }
                let child_past = self.past_excluding(&walk_exclude, *child);
                if let Some(anti) = &own_anticone {
                    let pending = child_past.intersection(anti);
                    if !pending.is_empty() {
                        let mut red = BlockSet::new();
                        for uncle in sort_by_past_count(&self.index, &pending, Some(bs)) {
                            if bs.has(&uncle) {
                                if !ordered.has(&uncle) {
                                    self.order_walk(out, ordered, bs, uncle, exclude);
                                }
                            } else {
                                red.add(uncle);
                            }
                        }
                        if !red.is_empty() {
                            let mut remainder = child_past.clone();
                            remainder.exclude(&red);
                            let all_ordered = remainder.iter().all(|x| ordered.has(x));
                            if all_ordered {
                                for late in sort_by_past_count(&self.index, &red, Some(bs)) {
                                    self.order_walk(out, ordered, bs, late, exclude);
                                }
                            }
                        }
                    }
                }
            }
            self.order_walk(out, ordered, bs, *child, exclude);
        }
        for child in &siblings {
            if !bs.has(child) {
                self.order_walk(out, ordered, bs, *child, exclude);
            }
        }
    }

    /// The past of `start`, stopping (but not excluding the boundary) at
    /// members of `exclude` and at genesis.
    fn past_excluding(&self, exclude: &BlockSet, start: BlockId) -> BlockSet {
        let mut out = BlockSet::new();
        if exclude.has(&start) || start == self.genesis {
            return out;
        }
        let mut visited = BlockSet::new();
        visited.add(start);
        let mut stack = vec![start];
        while let Some(h) = stack.pop() {
            if h == self.genesis {
                continue;
            }
            let Some(record) = self.index.get(&h) else {
                continue;
            };
            for parent in &record.parents {
                out.add(*parent);
                if !exclude.has(parent) && visited.add(*parent) {
                    stack.push(*parent);
                }
            }
        }
        out
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Effective length of the stable prefix (up to the last non-null
    /// entry).
    pub fn common_order_len(&self) -> usize {
        for (slot, entry) in self.common_order.iter().enumerate().rev() {
            if entry.is_some() {
                return slot + 1;
            }
        }
        0
    }

    /// Block at the given offset of the concatenated total order.
    pub fn block_by_order(&self, order: usize) -> Option<BlockId> {
        let prefix = self.common_order_len();
        if order < prefix {
            return self.common_order[order];
        }
        self.temp_order.get(order - prefix).copied()
    }

    /// Offset of the block in the total order, or -1 when not ordered.
    pub fn order_of(&self, id: &BlockId) -> i64 {
        let mut result = self.total as i64;
        for entry in self.temp_order.iter().rev() {
            result -= 1;
            if entry == id {
                return result;
            }
        }
        for entry in self.common_order.iter().rev().flatten() {
            result -= 1;
            if entry == id {
                return result;
            }
        }
        -1
    }

    /// The block immediately before `id` in the total order.
    pub fn previous(&self, id: &BlockId) -> Option<BlockId> {
        let order = self.order_of(id);
        if order <= 0 {
            return None;
        }
        self.block_by_order(order as usize - 1)
    }

    /// The final block of the total order.
    pub fn last_block(&self) -> Option<BlockId> {
        if let Some(last) = self.temp_order.last() {
            return Some(*last);
        }
        self.common_order.iter().rev().flatten().next().copied()
    }

    pub fn tips(&self) -> &BlockSet {
        &self.tips
    }

    pub fn block_count(&self) -> u32 {
        self.total
    }

    pub fn genesis(&self) -> BlockId {
        self.genesis
    }

    pub fn last_time(&self) -> i64 {
        self.last_time
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn hourglass(&self) -> &BlockSet {
        &self.hourglass
    }

    pub fn common_blue(&self) -> &BlockSet {
        &self.common_blue
    }

    pub fn last_common(&self) -> &BlockSet {
        &self.last_common
    }

    pub fn temp_order(&self) -> &[BlockId] {
        &self.temp_order
    }

    pub fn record(&self, id: &BlockId) -> Option<&BlockRecord> {
        self.index.get(id)
    }

    pub fn has_block(&self, id: &BlockId) -> bool {
        self.index.contains(id)
    }

    /// Whether the block sits in the stable prefix — the finality filter
    /// for order-sensitive consumers.
    pub fn is_common(&self, id: &BlockId) -> bool {
        let order = self.order_of(id);
        order >= 0 && (order as usize) < self.common_order_len()
    }
}

/// Shared handle around the engine.
///
/// A single writer discipline guards `add` and every derived set; read-only
/// queries take the shared lock and may proceed in parallel with each other
/// but never with `add`.
#[derive(Debug)]
pub struct Dag {
    state: RwLock<DagState>,
}

impl Dag {
    pub fn new(k: u32) -> Self {
        Self {
            state: RwLock::new(DagState::new(k)),
        }
    }

    /// Insert a block; returns the blocks whose order height changed.
    pub fn add(&self, block: &Block) -> Result<Vec<BlockId>, DagError> {
        self.state.write().expect("dag lock poisoned").add(block)
    }

    /// Run a read-only closure against the engine state.
    pub fn read<T>(&self, f: impl FnOnce(&DagState) -> T) -> T {
        f(&self.state.read().expect("dag lock poisoned"))
    }

    pub fn tips(&self) -> BlockSet {
        self.read(|s| s.tips().clone())
    }

    pub fn block_count(&self) -> u32 {
        self.read(|s| s.block_count())
    }

    pub fn block_by_order(&self, order: usize) -> Option<BlockId> {
        self.read(|s| s.block_by_order(order))
    }

    pub fn order_of(&self, id: &BlockId) -> i64 {
        self.read(|s| s.order_of(id))
    }

    pub fn previous(&self, id: &BlockId) -> Option<BlockId> {
        self.read(|s| s.previous(id))
    }

    pub fn last_block(&self) -> Option<BlockId> {
        self.read(|s| s.last_block())
    }

    pub fn genesis(&self) -> BlockId {
        self.read(|s| s.genesis())
    }

    pub fn last_time(&self) -> i64 {
        self.read(|s| s.last_time())
    }

    /// Tips with their past-counts, for the graph-state exchange.
    pub fn tip_summaries(&self) -> Vec<(BlockId, u64)> {
        self.read(|s| {
            let mut tips: Vec<BlockId> = s.tips().iter().copied().collect();
            tips.sort();
            tips.iter()
                .map(|t| (*t, s.record(t).map(|r| r.past_count).unwrap_or(0)))
                .collect()
        })
    }
}
