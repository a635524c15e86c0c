//! Strand full node — wires the chain driver to its collaborators.

use std::sync::Arc;
use std::time::Duration;

use strand_store_lmdb::LmdbEnvironment;
use strand_types::{Block, BlockId};
use tracing::info;

use crate::chain::Chain;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::graph_sync::PeerRegistry;
use crate::mempool::Mempool;
use crate::rebroadcast::{InventoryRelay, Rebroadcast};

/// Top-level node object owned by the daemon.
pub struct StrandNode {
    config: NodeConfig,
    chain: Chain,
    peers: PeerRegistry,
    rebroadcast: Option<Rebroadcast>,
}

impl StrandNode {
    /// Open the store and build the consensus core.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let k = config.consensus.anticone_size();
        info!(k, "anticone size");

        let env = LmdbEnvironment::open(&config.data_dir, config.map_size)
            .map_err(|e| NodeError::Store(e.into()))?;
        Ok(Self {
            chain: Chain::new(k, env),
            peers: PeerRegistry::new(),
            rebroadcast: None,
            config,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut Chain {
        &mut self.chain
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn peers_mut(&mut self) -> &mut PeerRegistry {
        &mut self.peers
    }

    /// Start the background subsystems.
    pub fn start(&mut self, mempool: Arc<dyn Mempool>, relay: Arc<dyn InventoryRelay>) {
        let cadence = Duration::from_secs(self.config.consensus.target_block_time_secs);
        self.rebroadcast = Some(Rebroadcast::start(cadence, mempool, relay));
        info!(
            network = self.config.network.as_str(),
            port = self.config.port,
            "node started"
        );
    }

    /// Feed an already-validated block through the consensus core.
    pub fn submit_block(&mut self, block: Block) -> Result<Vec<BlockId>, NodeError> {
        self.chain.process_block(block)
    }

    pub fn rebroadcast(&self) -> Option<&Rebroadcast> {
        self.rebroadcast.as_ref()
    }

    /// Stop background subsystems and flush the store. Idempotent.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        if let Some(mut rebroadcast) = self.rebroadcast.take() {
            rebroadcast.stop().await;
        }
        self.chain
            .store()
            .force_sync()
            .map_err(|e| NodeError::Store(e.into()))?;
        info!("node stopped");
        Ok(())
    }
}
