//! Inventory rebroadcaster.
//!
//! Keeps a pending set of inventory items and relays them on a jittered
//! cadence of `target_block_time * (0.5 + rand * 0.5)`. Transaction items
//! whose hash the mempool no longer has are dropped instead of relayed.
//! Shutdown is idempotent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strand_messages::{InventoryHash, InventoryItem};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use crate::mempool::Mempool;

/// Sink for items that survived the mempool filter.
pub trait InventoryRelay: Send + Sync {
    fn relay(&self, item: &InventoryItem);
}

enum Command {
    Add(InventoryItem),
    Remove(InventoryHash),
}

/// Channel buffer for inventory commands.
const CHANNEL_BUFFER: usize = 64;

pub struct Rebroadcast {
    cmd_tx: Option<mpsc::Sender<Command>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Rebroadcast {
    /// Spawn the rebroadcast task.
    pub fn start(
        target_block_time: Duration,
        mempool: Arc<dyn Mempool>,
        relay: Arc<dyn InventoryRelay>,
    ) -> Self {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(CHANNEL_BUFFER);
        let shutdown = Arc::new(AtomicBool::new(false));

        info!("starting rebroadcast");
        let handle = tokio::spawn(async move {
            let mut pending: HashMap<InventoryHash, InventoryItem> = HashMap::new();
            let timer = tokio::time::sleep(target_block_time);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    command = cmd_rx.recv() => match command {
                        Some(Command::Add(item)) => {
                            pending.insert(item.hash, item);
                        }
                        Some(Command::Remove(hash)) => {
                            pending.remove(&hash);
                        }
                        None => break,
                    },
                    _ = &mut timer => {
                        let mut stale = Vec::new();
                        for (hash, item) in &pending {
                            if let InventoryHash::Transaction(tx_id) = hash {
                                if !mempool.have_transaction(tx_id) {
                                    stale.push(*hash);
                                    continue;
                                }
                            }
                            relay.relay(item);
                        }
                        for hash in stale {
                            pending.remove(&hash);
                        }

                        // Next tick lands between half and one full target
                        // interval, desynchronising rebroadcasts across the
                        // network.
                        let min = target_block_time / 2;
                        let jitter = min.mul_f64(rand::random::<f64>());
                        timer.as_mut().reset(Instant::now() + min + jitter);
                    }
                }
            }
        });

        Self {
            cmd_tx: Some(cmd_tx),
            shutdown,
            handle: Some(handle),
        }
    }

    /// Track an inventory item for periodic relay. Ignored after shutdown.
    pub async fn add_inventory(&self, item: InventoryItem) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Add(item)).await;
        }
    }

    /// Stop tracking an inventory item. Ignored after shutdown.
    pub async fn remove_inventory(&self, hash: InventoryHash) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Remove(hash)).await;
        }
    }

    /// Stop the rebroadcast task. Safe to call more than once.
    pub async fn stop(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            info!("rebroadcast is already shutting down");
            return;
        }
        info!("rebroadcast shutting down");
        self.cmd_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mempool::SetMempool;
    use std::sync::Mutex;
    use strand_types::{BlockId, TxHash};

    #[derive(Default)]
    struct RecordingRelay {
        relayed: Mutex<Vec<InventoryHash>>,
    }

    impl InventoryRelay for RecordingRelay {
        fn relay(&self, item: &InventoryItem) {
            self.relayed.lock().unwrap().push(item.hash);
        }
    }

    fn block_item(n: u8) -> InventoryItem {
        InventoryItem {
            hash: InventoryHash::Block(BlockId::new([n; 32])),
            data: vec![n],
        }
    }

    fn tx_item(n: u8) -> InventoryItem {
        InventoryItem {
            hash: InventoryHash::Transaction(TxHash::new([n; 32])),
            data: vec![n],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn relays_pending_blocks() {
        let mempool = Arc::new(SetMempool::new());
        let relay = Arc::new(RecordingRelay::default());
        let mut rb = Rebroadcast::start(Duration::from_secs(30), mempool, relay.clone());

        rb.add_inventory(block_item(1)).await;
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(relay.relayed.lock().unwrap().len(), 1);
        rb.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn drops_transactions_missing_from_mempool() {
        let mempool = Arc::new(SetMempool::new());
        let relay = Arc::new(RecordingRelay::default());
        let known = TxHash::new([2u8; 32]);
        mempool.insert(known);

        let mut rb = Rebroadcast::start(Duration::from_secs(30), mempool, relay.clone());
        rb.add_inventory(tx_item(2)).await; // known to the mempool
        rb.add_inventory(tx_item(3)).await; // unknown, dropped on first tick

        tokio::time::sleep(Duration::from_secs(31)).await;
        let relayed = relay.relayed.lock().unwrap().clone();
        assert_eq!(relayed, vec![InventoryHash::Transaction(known)]);
        rb.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn remove_inventory_stops_relay() {
        let mempool = Arc::new(SetMempool::new());
        let relay = Arc::new(RecordingRelay::default());
        let mut rb = Rebroadcast::start(Duration::from_secs(30), mempool, relay.clone());

        let item = block_item(4);
        let hash = item.hash;
        rb.add_inventory(item).await;
        rb.remove_inventory(hash).await;
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(relay.relayed.lock().unwrap().is_empty());
        rb.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let mempool = Arc::new(SetMempool::new());
        let relay = Arc::new(RecordingRelay::default());
        let mut rb = Rebroadcast::start(Duration::from_secs(30), mempool, relay);

        rb.stop().await;
        rb.stop().await;
        // commands after shutdown are ignored
        rb.add_inventory(block_item(5)).await;
    }
}
