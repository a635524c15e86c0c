//! Mempool collaborator seam.
//!
//! The mempool itself lives outside the consensus core; the rebroadcast
//! subsystem only needs to ask whether a transaction is still pending.

use std::collections::HashSet;
use std::sync::RwLock;

use strand_types::TxHash;

/// What the core needs from the transaction mempool.
pub trait Mempool: Send + Sync {
    fn have_transaction(&self, tx_id: &TxHash) -> bool;
}

/// Minimal set-backed mempool, enough for tests and single-process runs
/// until a real mempool is attached.
#[derive(Debug, Default)]
pub struct SetMempool {
    txs: RwLock<HashSet<TxHash>>,
}

impl SetMempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tx_id: TxHash) {
        self.txs.write().expect("mempool lock poisoned").insert(tx_id);
    }

    pub fn remove(&self, tx_id: &TxHash) {
        self.txs.write().expect("mempool lock poisoned").remove(tx_id);
    }
}

impl Mempool for SetMempool {
    fn have_transaction(&self, tx_id: &TxHash) -> bool {
        self.txs.read().expect("mempool lock poisoned").contains(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_mempool_tracks_membership() {
        let pool = SetMempool::new();
        let tx = TxHash::new([1u8; 32]);
        assert!(!pool.have_transaction(&tx));
        pool.insert(tx);
        assert!(pool.have_transaction(&tx));
        pool.remove(&tx);
        assert!(!pool.have_transaction(&tx));
    }
}
