//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::journal::LmdbJournalStore;
use crate::meta::LmdbMetaStore;
use crate::utxo::LmdbUtxoStore;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,

    /// Serialized utxo entries keyed by transaction id.
    pub(crate) utxo_db: Database<Bytes, Bytes>,

    /// Per-block spend journal segments keyed by block id.
    pub(crate) journal_db: Database<Bytes, Bytes>,

    /// Internal bookkeeping (best block, schema version).
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("failed to create directory: {e}")))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(8)
                .map_size(map_size)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let utxo_db = env.create_database(&mut wtxn, Some("utxo"))?;
        let journal_db = env.create_database(&mut wtxn, Some("journal"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            utxo_db,
            journal_db,
            meta_db,
        })
    }

    /// Get a shared reference to the underlying heed environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Begin a write batch that brackets the utxo write-back and the
    /// journal append in a single LMDB write transaction. A crash between
    /// the two is not tolerated, so they must never be committed apart.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, strand_store::StoreError> {
        WriteBatch::new(self)
    }

    /// Create a utxo store backed by this environment.
    pub fn utxo_store(&self) -> LmdbUtxoStore {
        LmdbUtxoStore {
            env: Arc::clone(&self.env),
            utxo_db: self.utxo_db,
        }
    }

    /// Create a journal store backed by this environment.
    pub fn journal_store(&self) -> LmdbJournalStore {
        LmdbJournalStore {
            env: Arc::clone(&self.env),
            journal_db: self.journal_db,
        }
    }

    /// Create a meta store backed by this environment.
    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }

    /// Force an `fsync` of the LMDB memory-mapped file to disk.
    ///
    /// LMDB ensures durability on every write-transaction commit; this is
    /// an extra safety measure during graceful shutdown.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        let wtxn = self.env.write_txn()?;
        wtxn.commit()?;
        Ok(())
    }
}
