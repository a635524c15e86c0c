use strand_store::StoreError;
use strand_types::TxHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UtxoError {
    /// An input referenced an output the view cannot resolve. Fatal — the
    /// view was not populated correctly.
    #[error("view missing input {tx_id}:{index}")]
    MissingReferencedUtxo { tx_id: TxHash, index: u32 },

    /// A not-fully-spent entry would be replaced by a different live
    /// transaction with a colliding id.
    #[error("replacing live utxo entry for {0}")]
    DuplicateLiveTx(TxHash),

    /// Disconnection tried to resurrect an entry whose journal record lacks
    /// the fully-spent flag.
    #[error("tried to revive utxo entry {0} from a non-fully-spent journal record")]
    ResurrectionWithoutFullySpent(TxHash),

    /// Journal bytes failed to decode or disagree with block input order.
    /// Fatal — the journal is the single source of truth for disconnection.
    #[error("spend journal corruption: {0}")]
    JournalCorruption(String),

    /// Zero-length live entry or undecodable utxo bytes in the store.
    #[error("utxo store corruption: {0}")]
    StoreCorruption(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
