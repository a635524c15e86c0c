//! Chain driver — bridges the DAG engine, the utxo viewpoint, and the
//! store.
//!
//! A newly-accepted block enters the engine, which re-emits the total
//! order; the driver diffs the applied order against the new one,
//! disconnects blocks that fell out (restoring spends from their
//! journals) and connects the newly-ordered ones, writing each block's
//! utxo delta and journal segment in a single store transaction.

use std::collections::{HashMap, HashSet};

use strand_dag::Dag;
use strand_messages::{GraphState, GraphTip};
use strand_store::{JournalStore, MetaStore, UtxoSetStore};
use strand_store_lmdb::LmdbEnvironment;
use strand_types::{Block, BlockId, Transaction, TxHash};
use strand_utxo::{
    deserialize_journal, deserialize_utxo_entry, serialize_journal, serialize_utxo_entry,
    SpentTxOut, UtxoEntry, UtxoError, UtxoSource, UtxoView,
};
use tracing::{debug, info};

use crate::error::NodeError;

/// Store seam adapter: reads utxo entries through the LMDB bucket,
/// surfacing the zero-length corruption signal.
pub struct StoreSource {
    store: strand_store_lmdb::utxo::LmdbUtxoStore,
}

impl UtxoSource for StoreSource {
    fn fetch_entry(&self, tx_id: &TxHash) -> Result<Option<UtxoEntry>, UtxoError> {
        match self.store.get_entry(tx_id)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(deserialize_utxo_entry(&bytes)?)),
        }
    }
}

/// Connect a block's transactions into the view at its vantage point.
///
/// When `parent` is given the parent's transactions are reconnected first,
/// treated as an ordinary block for input-utxo purposes; the view's `best`
/// moves only once the current block completes.
pub fn connect_transactions(
    view: &mut UtxoView,
    source: &impl UtxoSource,
    block: &Block,
    block_order: u32,
    parent: Option<(&Block, u32)>,
    bad_txs: &mut HashSet<TxHash>,
    mut journal: Option<&mut Vec<SpentTxOut>>,
) -> Result<(), UtxoError> {
    if let Some((parent_block, parent_order)) = parent {
        view.fetch_input_utxos(source, parent_block, parent_order, bad_txs)?;
        for (index, tx) in parent_block.transactions.iter().enumerate() {
            view.connect_transaction(tx, parent_order, index as u32, None)?;
        }
    }

    view.fetch_input_utxos(source, block, block_order, bad_txs)?;
    for (index, tx) in block.transactions.iter().enumerate() {
        view.connect_transaction(
            tx,
            block_order,
            index as u32,
            journal.as_mut().map(|j| &mut **j),
        )?;
    }
    view.set_best(block.id);
    Ok(())
}

/// The consensus core of a node process.
pub struct Chain {
    dag: Dag,
    env: LmdbEnvironment,
    /// In-memory block bodies. The core persists only the utxo set and the
    /// spend journal; blocks themselves are not stored durably.
    blocks: HashMap<BlockId, Block>,
    /// Blocks whose utxo effects are currently applied, in order.
    applied: Vec<BlockId>,
    /// Transactions marked bad upstream; inputs referencing them
    /// short-circuit.
    bad_txs: HashSet<TxHash>,
}

impl Chain {
    pub fn new(k: u32, env: LmdbEnvironment) -> Self {
        Self {
            dag: Dag::new(k),
            env,
            blocks: HashMap::new(),
            applied: Vec::new(),
            bad_txs: HashSet::new(),
        }
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    pub fn store(&self) -> &LmdbEnvironment {
        &self.env
    }

    fn source(&self) -> StoreSource {
        StoreSource {
            store: self.env.utxo_store(),
        }
    }

    /// Mark a transaction as bad; its outputs become unusable for
    /// descendants within a block.
    pub fn add_bad_tx(&mut self, tx_id: TxHash) {
        self.bad_txs.insert(tx_id);
    }

    /// Accept an already-validated block: insert it into the DAG, then
    /// drive the utxo set to the newly-emitted order.
    ///
    /// Returns the blocks whose order height changed.
    pub fn process_block(&mut self, block: Block) -> Result<Vec<BlockId>, NodeError> {
        let id = block.id;
        let changed = self.dag.add(&block)?;
        self.blocks.insert(id, block);
        debug!(block = %id, reordered = changed.len(), "block accepted");

        let new_order: Vec<BlockId> = self.dag.read(|state| {
            (0..state.block_count() as usize)
                .filter_map(|offset| state.block_by_order(offset))
                .collect()
        });

        // Longest prefix of the applied order that survived the re-order.
        let mut keep = 0;
        while keep < self.applied.len()
            && keep < new_order.len()
            && self.applied[keep] == new_order[keep]
        {
            keep += 1;
        }

        let detached = self.applied.split_off(keep);
        for block_id in detached.iter().rev() {
            self.disconnect_applied(*block_id)?;
        }
        if !detached.is_empty() {
            info!(
                count = detached.len(),
                "re-org: disconnected stale order suffix"
            );
        }

        for block_id in &new_order[keep..] {
            self.connect_applied(*block_id)?;
            self.applied.push(*block_id);
        }
        Ok(changed)
    }

    /// Connect one block's transactions on top of the applied state and
    /// persist the delta atomically with its journal segment.
    fn connect_applied(&mut self, id: BlockId) -> Result<(), NodeError> {
        let block = self
            .blocks
            .get(&id)
            .cloned()
            .ok_or(NodeError::MissingBlockBody(id))?;
        let order = self.dag.order_of(&id).max(0) as u32;

        let mut view = UtxoView::new();
        let mut journal = Vec::new();
        let source = self.source();
        connect_transactions(
            &mut view,
            &source,
            &block,
            order,
            None,
            &mut self.bad_txs,
            Some(&mut journal),
        )?;

        let mut batch = self.env.write_batch()?;
        for (tx_id, entry) in view.entries() {
            if !entry.is_modified() {
                continue;
            }
            if entry.is_fully_spent() {
                batch.delete_utxo_entry(tx_id)?;
            } else {
                batch.put_utxo_entry(tx_id, &serialize_utxo_entry(entry))?;
            }
        }
        batch.put_journal(&id, &serialize_journal(&journal))?;
        batch.set_best_block(&id)?;
        batch.commit()?;
        view.commit();
        Ok(())
    }

    /// Reverse one applied block using its stored journal segment and
    /// persist the restoration atomically with the journal removal.
    fn disconnect_applied(&mut self, id: BlockId) -> Result<(), NodeError> {
        let block = self
            .blocks
            .get(&id)
            .cloned()
            .ok_or(NodeError::MissingBlockBody(id))?;
        let journal_bytes = self
            .env
            .journal_store()
            .get_journal(&id)?
            .ok_or_else(|| {
                NodeError::Utxo(UtxoError::JournalCorruption(format!(
                    "no journal segment for block {id}"
                )))
            })?;
        let journal = deserialize_journal(&journal_bytes)?;

        // Pull every entry the disconnection touches into the view; fully
        // spent referenced entries stay absent and are resurrected from the
        // journal.
        let mut needed: Vec<TxHash> = Vec::new();
        for tx in &block.transactions {
            needed.push(tx.tx_id());
            if tx.is_coinbase() {
                continue;
            }
            for input in &tx.inputs {
                needed.push(input.previous.tx_id);
            }
        }
        let mut view = UtxoView::new();
        let source = self.source();
        view.fetch_utxos(&source, &needed)?;

        let order = self.dag.order_of(&id).max(0) as u32;
        view.disconnect_transactions(&block, order, &journal)?;

        let mut batch = self.env.write_batch()?;
        for (tx_id, entry) in view.entries() {
            if !entry.is_modified() {
                continue;
            }
            if entry.is_fully_spent() {
                batch.delete_utxo_entry(tx_id)?;
            } else {
                batch.put_utxo_entry(tx_id, &serialize_utxo_entry(entry))?;
            }
        }
        batch.delete_journal(&id)?;
        batch.set_best_block(&view.best())?;
        batch.commit()?;
        view.commit();
        Ok(())
    }

    // ── Read-only queries ───────────────────────────────────────────────

    /// Load the unspent entry for a transaction from the store viewpoint.
    /// Absence is not an error — fully spent transactions are pruned.
    pub fn fetch_utxo_entry(&self, tx_id: &TxHash) -> Result<Option<UtxoEntry>, NodeError> {
        Ok(self.source().fetch_entry(tx_id)?)
    }

    /// Build a view holding the entries referenced by a transaction's
    /// inputs plus the transaction itself (so the caller can detect
    /// colliding ids that are not fully spent). The returned view is owned
    /// by the caller and not safe for concurrent use.
    pub fn fetch_utxo_view(&self, tx: &Transaction) -> Result<UtxoView, NodeError> {
        let mut needed = vec![tx.tx_id()];
        if !tx.is_coinbase() {
            for input in &tx.inputs {
                needed.push(input.previous.tx_id);
            }
        }
        let mut view = UtxoView::new();
        view.fetch_utxos(&self.source(), &needed)?;
        if let Some(best) = self.dag.last_block() {
            view.set_best(best);
        }
        Ok(view)
    }

    /// Snapshot of the DAG frontier for the graph-state exchange.
    pub fn graph_state(&self) -> GraphState {
        GraphState {
            genesis: self.dag.genesis(),
            total: self.dag.block_count(),
            tips: self
                .dag
                .tip_summaries()
                .into_iter()
                .map(|(id, past_count)| GraphTip { id, past_count })
                .collect(),
        }
    }

    pub fn block_body(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn best_block(&self) -> Result<Option<BlockId>, NodeError> {
        Ok(self.env.meta_store().get_best_block()?)
    }
}
