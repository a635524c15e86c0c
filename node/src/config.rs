//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use strand_types::{ConsensusParams, NetworkId};

use crate::NodeError;

/// Configuration for a strand node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to connect to.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Data directory for utxo/journal storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Consensus parameters; `k` is derived from these once at startup.
    #[serde(default)]
    pub consensus: ConsensusParams,

    /// Maximum number of peer connections.
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,

    /// Port to listen on for P2P connections.
    #[serde(default = "default_p2p_port")]
    pub port: u16,

    /// Whether to enable the RPC server.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    /// RPC port (if enabled).
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Dev
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./strand_data")
}

fn default_max_peers() -> usize {
    50
}

fn default_p2p_port() -> u16 {
    NetworkId::Dev.default_port()
}

fn default_true() -> bool {
    true
}

fn default_rpc_port() -> u16 {
    8131
}

fn default_map_size() -> usize {
    4 * 1024 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            consensus: ConsensusParams::default(),
            max_peers: default_max_peers(),
            port: default_p2p_port(),
            enable_rpc: default_true(),
            rpc_port: default_rpc_port(),
            map_size: default_map_size(),
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path)?;
        let config: NodeConfig =
            toml::from_str(&contents).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check the parameters.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.consensus.block_rate <= 0.0 {
            return Err(NodeError::Config("block_rate must be positive".into()));
        }
        if self.consensus.block_delay_secs == 0 {
            return Err(NodeError::Config("block_delay_secs must be non-zero".into()));
        }
        if self.consensus.target_block_time_secs == 0 {
            return Err(NodeError::Config(
                "target_block_time_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
