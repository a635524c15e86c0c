//! Write batching — groups the utxo write-back and the journal append into
//! a single LMDB write transaction.
//!
//! The on-disk utxo set is written only after a block's view commit,
//! atomically with the journal append; a crash between the two is not
//! tolerated, so both go through one transaction.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.put_utxo_entry(&tx_id, &entry_bytes)?;
//! batch.put_journal(&block_id, &journal_bytes)?;
//! batch.set_best_block(&block_id)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use strand_store::StoreError;
use strand_types::{BlockId, TxHash};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

const BEST_BLOCK_KEY: &[u8] = b"best_block";

/// A write batch over the utxo, journal, and meta databases.
pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    /// Write a serialized utxo entry.
    pub fn put_utxo_entry(&mut self, tx_id: &TxHash, bytes: &[u8]) -> Result<(), StoreError> {
        self.env
            .utxo_db
            .put(&mut self.txn, tx_id.as_bytes(), bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Remove a fully spent transaction's entry.
    pub fn delete_utxo_entry(&mut self, tx_id: &TxHash) -> Result<(), StoreError> {
        self.env
            .utxo_db
            .delete(&mut self.txn, tx_id.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Append a block's journal contribution.
    pub fn put_journal(&mut self, block: &BlockId, bytes: &[u8]) -> Result<(), StoreError> {
        self.env
            .journal_db
            .put(&mut self.txn, block.as_bytes(), bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Remove a block's journal contribution after disconnection.
    pub fn delete_journal(&mut self, block: &BlockId) -> Result<(), StoreError> {
        self.env
            .journal_db
            .delete(&mut self.txn, block.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Record the block whose utxo state the store now reflects.
    pub fn set_best_block(&mut self, block: &BlockId) -> Result<(), StoreError> {
        self.env
            .meta_db
            .put(&mut self.txn, BEST_BLOCK_KEY, block.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Commit every operation in the batch atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
