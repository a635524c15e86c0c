//! Spend journal storage trait.

use crate::StoreError;
use strand_types::BlockId;

/// Per-block spend journal segments, keyed by block id.
pub trait JournalStore {
    /// Fetch a block's journal contribution.
    fn get_journal(&self, block: &BlockId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store a block's journal contribution.
    fn put_journal(&self, block: &BlockId, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove a block's journal contribution after disconnection.
    fn delete_journal(&self, block: &BlockId) -> Result<(), StoreError>;
}
