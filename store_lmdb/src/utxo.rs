//! LMDB implementation of UtxoSetStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use strand_store::utxo::UtxoSetStore;
use strand_store::StoreError;
use strand_types::TxHash;

use crate::LmdbError;

pub struct LmdbUtxoStore {
    pub(crate) env: Arc<Env>,
    pub(crate) utxo_db: Database<Bytes, Bytes>,
}

impl UtxoSetStore for LmdbUtxoStore {
    fn get_entry(&self, tx_id: &TxHash) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .utxo_db
            .get(&rtxn, tx_id.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|bytes| bytes.to_vec()))
    }

    fn put_entry(&self, tx_id: &TxHash, bytes: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.utxo_db
            .put(&mut wtxn, tx_id.as_bytes(), bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_entry(&self, tx_id: &TxHash) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.utxo_db
            .delete(&mut wtxn, tx_id.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
