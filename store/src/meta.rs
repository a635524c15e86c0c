//! Metadata storage trait.

use crate::StoreError;
use strand_types::BlockId;

/// Generic key-value store for internal bookkeeping that doesn't belong in
/// any domain-specific store.
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete a metadata entry.
    fn delete_meta(&self, key: &str) -> Result<(), StoreError>;

    /// The block whose utxo state the store currently reflects.
    fn get_best_block(&self) -> Result<Option<BlockId>, StoreError>;

    /// Record the block whose utxo state the store now reflects.
    fn set_best_block(&self, block: &BlockId) -> Result<(), StoreError>;
}
