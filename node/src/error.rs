use strand_dag::DagError;
use strand_store::StoreError;
use strand_utxo::UtxoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("dag error: {0}")]
    Dag(#[from] DagError),

    #[error("utxo error: {0}")]
    Utxo(#[from] UtxoError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("unknown peer: {0}")]
    PeerUnknown(String),

    #[error("request to peer {0} timed out")]
    PeerTimeout(String),

    #[error("graph sync handler timed out for peer {0}")]
    HandleTimeout(String),

    #[error("block {0} has no recorded body")]
    MissingBlockBody(strand_types::BlockId),

    #[error("network channel closed")]
    ChannelClosed,

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl NodeError {
    /// Whether the error must abort validation and halt the node.
    ///
    /// A fatal error means the derived consensus state or the store can no
    /// longer be trusted.
    pub fn is_fatal(&self) -> bool {
        match self {
            NodeError::Dag(DagError::CommonSetInconsistent) => true,
            NodeError::Utxo(UtxoError::MissingReferencedUtxo { .. }) => true,
            NodeError::Utxo(UtxoError::JournalCorruption(_)) => true,
            NodeError::Utxo(UtxoError::StoreCorruption(_)) => true,
            NodeError::Store(StoreError::Corruption(_)) => true,
            _ => false,
        }
    }

    /// Whether the error is the sending peer's fault: the offending block
    /// is rejected and the peer's bad-response counter incremented.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            NodeError::Dag(DagError::MissingParents(_))
                | NodeError::Dag(DagError::DuplicateBlock(_))
                | NodeError::Utxo(UtxoError::DuplicateLiveTx(_))
        )
    }
}
