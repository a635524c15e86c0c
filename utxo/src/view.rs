//! The UTXO viewpoint — an in-memory projection of the utxo set at a block
//! vantage point.
//!
//! The view is mutated by connecting transactions along newly-ordered
//! blocks and disconnecting them on reorg; the spend journal captures
//! enough to reverse every change. A view is owned by one caller for the
//! duration of its validation work; it is not safe for concurrent use.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use strand_types::{Block, BlockId, Transaction, TxHash, TxType};

use crate::entry::{UtxoEntry, UtxoOutput};
use crate::error::UtxoError;
use crate::journal::SpentTxOut;
use crate::script::is_unspendable;

/// Store seam: resolves utxo entries the view does not already hold.
///
/// Absence is explicit — a transaction with no live outputs yields `None`,
/// never a zeroed stand-in.
pub trait UtxoSource {
    fn fetch_entry(&self, tx_id: &TxHash) -> Result<Option<UtxoEntry>, UtxoError>;
}

/// In-memory overlay of the utxo set, keyed by transaction id.
#[derive(Debug, Default)]
pub struct UtxoView {
    entries: HashMap<TxHash, UtxoEntry>,
    /// The block at whose vantage point the view is valid.
    best: BlockId,
}

impl UtxoView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> BlockId {
        self.best
    }

    pub fn set_best(&mut self, best: BlockId) {
        self.best = best;
    }

    pub fn entries(&self) -> &HashMap<TxHash, UtxoEntry> {
        &self.entries
    }

    /// Entry for a transaction in the current view state, if any.
    pub fn lookup_entry(&self, tx_id: &TxHash) -> Option<&UtxoEntry> {
        self.entries.get(tx_id)
    }

    /// Insert a prefetched entry (used by store-backed population).
    pub fn insert_entry(&mut self, tx_id: TxHash, entry: UtxoEntry) {
        self.entries.insert(tx_id, entry);
    }

    /// Add all spendable outputs of `tx` to the view.
    ///
    /// Replacing an existing fully-spent entry with a colliding id is
    /// permitted; replacing a live one is rejected unless the coordinates
    /// match (the same transaction being refreshed by the in-flight path).
    pub fn add_tx_outs(
        &mut self,
        tx: &Transaction,
        block_order: u32,
        block_index: u32,
    ) -> Result<(), UtxoError> {
        let tx_id = tx.tx_id();
        if let Some(existing) = self.entries.get(&tx_id) {
            if !existing.is_fully_spent()
                && (existing.order() != block_order || existing.index() != block_index)
            {
                return Err(UtxoError::DuplicateLiveTx(tx_id));
            }
        }
        let entry = self.entries.entry(tx_id).or_insert_with(|| {
            UtxoEntry::new(
                tx.version,
                block_order,
                block_index,
                tx.is_coinbase(),
                tx.has_expiry(),
                TxType::of(tx),
            )
        });
        entry.set_position(block_order, block_index);
        entry.modified = true;

        for (out_index, output) in tx.outputs.iter().enumerate() {
            if is_unspendable(output.amount, &output.script) {
                continue;
            }
            match entry.outputs.entry(out_index as u32) {
                Entry::Occupied(mut existing) => {
                    let existing = existing.get_mut();
                    existing.spent = false;
                    existing.amount = output.amount;
                    existing.script = output.script.clone();
                    existing.script_version = output.script_version;
                }
                Entry::Vacant(slot) => {
                    slot.insert(UtxoOutput {
                        script_version: output.script_version,
                        script: output.script.clone(),
                        amount: output.amount,
                        spent: false,
                    });
                }
            }
        }
        Ok(())
    }

    /// Spend `tx`'s inputs and add its outputs.
    ///
    /// When `journal` is given, one record per input is appended capturing
    /// everything disconnection needs, including whether the spend emptied
    /// the referenced entry.
    pub fn connect_transaction(
        &mut self,
        tx: &Transaction,
        block_order: u32,
        block_index: u32,
        mut journal: Option<&mut Vec<SpentTxOut>>,
    ) -> Result<(), UtxoError> {
        if tx.is_coinbase() {
            return self.add_tx_outs(tx, block_order, block_index);
        }

        for (in_index, input) in tx.inputs.iter().enumerate() {
            let origin = input.previous;
            let missing = UtxoError::MissingReferencedUtxo {
                tx_id: origin.tx_id,
                index: origin.out_index,
            };
            let Some(entry) = self.entries.get_mut(&origin.tx_id) else {
                return Err(missing);
            };
            let Some(output) = entry.outputs.get_mut(&origin.out_index) else {
                return Err(missing);
            };
            output.spent = true;
            let amount = output.amount;
            let script_version = output.script_version;
            let script = output.script.clone();
            entry.modified = true;

            if let Some(journal) = journal.as_mut() {
                journal.push(SpentTxOut {
                    amount,
                    script_version,
                    script,
                    tx_index: entry.index(),
                    in_index: in_index as u32,
                    tx_version: entry.tx_version(),
                    order: entry.order(),
                    is_coinbase: entry.is_coinbase(),
                    has_expiry: entry.has_expiry(),
                    tx_type: entry.tx_type(),
                    tx_fully_spent: entry.is_fully_spent(),
                });
            }
        }

        self.add_tx_outs(tx, block_order, block_index)
    }

    /// Reverse a block: destroy the outputs its transactions created and
    /// restore everything they spent, consuming the journal tail-first.
    /// Afterwards the view's vantage is the block's primary parent.
    pub fn disconnect_transactions(
        &mut self,
        block: &Block,
        block_order: u32,
        journal: &[SpentTxOut],
    ) -> Result<(), UtxoError> {
        let mut remaining = journal.len();

        for (tx_index, tx) in block.transactions.iter().enumerate().rev() {
            let tx_id = tx.tx_id();
            // The block created this transaction's outputs, so they are
            // destroyed, not journaled.
            let entry = self.entries.entry(tx_id).or_insert_with(|| {
                UtxoEntry::new(
                    tx.version,
                    block_order,
                    tx_index as u32,
                    tx.is_coinbase(),
                    tx.has_expiry(),
                    TxType::of(tx),
                )
            });
            entry.modified = true;
            entry.outputs.clear();

            if tx.is_coinbase() {
                continue;
            }

            for (in_index, input) in tx.inputs.iter().enumerate().rev() {
                if remaining == 0 {
                    return Err(UtxoError::JournalCorruption(
                        "journal shorter than block inputs".into(),
                    ));
                }
                remaining -= 1;
                let record = &journal[remaining];
                if record.in_index != in_index as u32 {
                    return Err(UtxoError::JournalCorruption(format!(
                        "journal record for input {} consumed at input {}",
                        record.in_index, in_index
                    )));
                }

                let origin = input.previous;
                let entry = match self.entries.entry(origin.tx_id) {
                    Entry::Occupied(occupied) => occupied.into_mut(),
                    Entry::Vacant(vacant) => {
                        // A fully spent entry left the view; resurrect it
                        // from the journal record.
                        if !record.tx_fully_spent {
                            return Err(UtxoError::ResurrectionWithoutFullySpent(origin.tx_id));
                        }
                        vacant.insert(UtxoEntry::new(
                            record.tx_version,
                            record.order,
                            record.tx_index,
                            record.is_coinbase,
                            record.has_expiry,
                            record.tx_type,
                        ))
                    }
                };
                entry.modified = true;
                match entry.outputs.entry(origin.out_index) {
                    Entry::Occupied(mut output) => output.get_mut().spent = false,
                    Entry::Vacant(slot) => {
                        slot.insert(UtxoOutput {
                            script_version: record.script_version,
                            script: record.script.clone(),
                            amount: record.amount,
                            spent: false,
                        });
                    }
                }
            }
        }

        if remaining != 0 {
            return Err(UtxoError::JournalCorruption(
                "journal longer than block inputs".into(),
            ));
        }
        self.best = block.primary_parent();
        Ok(())
    }

    /// Prune fully-spent modified entries and clear the modified flags.
    /// Only committed entries are candidates for write-back to the store.
    pub fn commit(&mut self) {
        self.entries
            .retain(|_, entry| !(entry.modified && entry.is_fully_spent()));
        for entry in self.entries.values_mut() {
            entry.modified = false;
        }
    }

    /// Load entries for the given transactions from the store unless the
    /// view already holds them. Missing entries stay absent.
    pub fn fetch_utxos(
        &mut self,
        source: &impl UtxoSource,
        tx_ids: &[TxHash],
    ) -> Result<(), UtxoError> {
        for tx_id in tx_ids {
            if self.entries.contains_key(tx_id) {
                continue;
            }
            if let Some(entry) = source.fetch_entry(tx_id)? {
                self.entries.insert(*tx_id, entry);
            }
        }
        Ok(())
    }

    /// Populate the view with the entries the block's inputs need.
    ///
    /// An input referencing an output of an earlier transaction in the same
    /// block is satisfied in-flight by adding that transaction's outputs
    /// rather than by a store lookup. Inputs referencing transactions
    /// already marked bad mark the referring transaction bad and skip its
    /// remaining inputs.
    pub fn fetch_input_utxos(
        &mut self,
        source: &impl UtxoSource,
        block: &Block,
        block_order: u32,
        bad_txs: &mut HashSet<TxHash>,
    ) -> Result<(), UtxoError> {
        let transactions = &block.transactions;
        let mut in_flight: HashMap<TxHash, usize> = HashMap::new();
        for (position, tx) in transactions.iter().enumerate() {
            in_flight.insert(tx.tx_id(), position);
        }

        let mut needed: Vec<TxHash> = Vec::new();
        for (position, tx) in transactions.iter().enumerate().skip(1) {
            let tx_id = tx.tx_id();
            if bad_txs.contains(&tx_id) {
                continue;
            }
            for input in &tx.inputs {
                let origin = input.previous.tx_id;
                if bad_txs.contains(&origin) {
                    bad_txs.insert(tx_id);
                    break;
                }
                if let Some(&flight_position) = in_flight.get(&origin) {
                    if flight_position < position {
                        let origin_tx = &transactions[flight_position];
                        self.add_tx_outs(origin_tx, block_order, flight_position as u32)?;
                        continue;
                    }
                }
                if !self.entries.contains_key(&origin) {
                    needed.push(origin);
                }
            }
        }

        self.fetch_utxos(source, &needed)
    }
}
