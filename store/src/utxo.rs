//! Utxo set storage trait.

use crate::StoreError;
use strand_types::TxHash;

/// Bytes-level access to the persistent utxo set, keyed by transaction id.
///
/// Values are the serialized entry form; interpretation belongs to the utxo
/// layer. `None` means the transaction has no live outputs — a present but
/// zero-length value is a corruption signal the utxo layer rejects.
pub trait UtxoSetStore {
    /// Fetch the serialized entry for a transaction.
    fn get_entry(&self, tx_id: &TxHash) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store the serialized entry for a transaction.
    fn put_entry(&self, tx_id: &TxHash, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove a fully spent transaction's entry.
    fn delete_entry(&self, tx_id: &TxHash) -> Result<(), StoreError>;
}
