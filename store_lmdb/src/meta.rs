//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use strand_store::meta::MetaStore;
use strand_store::StoreError;
use strand_types::BlockId;

use crate::LmdbError;

const BEST_BLOCK_KEY: &str = "best_block";

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|bytes| bytes.to_vec()))
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_best_block(&self) -> Result<Option<BlockId>, StoreError> {
        match self.get_meta(BEST_BLOCK_KEY)? {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption("invalid best block hash length".into())
                })?;
                Ok(Some(BlockId::new(arr)))
            }
        }
    }

    fn set_best_block(&self, block: &BlockId) -> Result<(), StoreError> {
        self.put_meta(BEST_BLOCK_KEY, block.as_bytes())
    }
}
