//! LMDB implementation of JournalStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use strand_store::journal::JournalStore;
use strand_store::StoreError;
use strand_types::BlockId;

use crate::LmdbError;

pub struct LmdbJournalStore {
    pub(crate) env: Arc<Env>,
    pub(crate) journal_db: Database<Bytes, Bytes>,
}

impl JournalStore for LmdbJournalStore {
    fn get_journal(&self, block: &BlockId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .journal_db
            .get(&rtxn, block.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|bytes| bytes.to_vec()))
    }

    fn put_journal(&self, block: &BlockId, bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.journal_db
            .put(&mut wtxn, block.as_bytes(), bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_journal(&self, block: &BlockId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.journal_db
            .delete(&mut wtxn, block.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
