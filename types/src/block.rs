//! Block identifier and block shape for the DAG.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::transaction::Transaction;
use crate::TxHash;

/// A 32-byte block id — content hash of the block header.
///
/// Total order is lexicographic over the raw bytes; this is the tie-break
/// used by every deterministic sort in the consensus core.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId([u8; 32]);

impl Default for BlockId {
    fn default() -> Self {
        Self::ZERO
    }
}

impl BlockId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert this block id into a TxHash (same underlying 32 bytes).
    pub fn into_tx_hash(self) -> TxHash {
        TxHash::new(self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "\u{2026})")
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// An already-validated block as handed to the consensus core.
///
/// Header validation and proof-of-work checks happen upstream; the core only
/// reads the parent references, the timestamp, and the transaction list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Parent references in header order. Non-empty except for genesis;
    /// `parents[0]` is the primary parent slot.
    pub parents: Vec<BlockId>,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(parents: Vec<BlockId>, timestamp: i64, transactions: Vec<Transaction>) -> Self {
        let id = Self::compute_id(&parents, timestamp, &transactions);
        Self {
            id,
            parents,
            timestamp,
            transactions,
        }
    }

    /// Content hash over the header fields and the transaction ids.
    pub fn compute_id(parents: &[BlockId], timestamp: i64, transactions: &[Transaction]) -> BlockId {
        let mut hasher = Sha256::new();
        for p in parents {
            hasher.update(p.as_bytes());
        }
        hasher.update(timestamp.to_le_bytes());
        for tx in transactions {
            hasher.update(tx.tx_id().as_bytes());
        }
        BlockId(hasher.finalize().into())
    }

    /// The primary parent, used as the disconnect vantage point.
    pub fn primary_parent(&self) -> BlockId {
        self.parents.first().copied().unwrap_or(BlockId::ZERO)
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }
}
