//! Strand daemon — entry point for running a strand node.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use strand_messages::InventoryItem;
use strand_node::mempool::SetMempool;
use strand_node::rebroadcast::InventoryRelay;
use strand_node::{NodeConfig, StrandNode};
use strand_types::NetworkId;

#[derive(Parser)]
#[command(name = "strand-daemon", about = "Strand block-DAG node daemon")]
struct Cli {
    /// Network to connect to: "live", "test", or "dev".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "STRAND_NETWORK")]
    network: Option<String>,

    /// Data directory for utxo/journal storage.
    #[arg(long, default_value = "./strand_data", env = "STRAND_DATA_DIR")]
    data_dir: PathBuf,

    /// Port for P2P connections (defaults to network default).
    #[arg(long, env = "STRAND_P2P_PORT")]
    port: Option<u16>,

    /// Enable RPC server.
    #[arg(long, default_value_t = true, env = "STRAND_ENABLE_RPC")]
    rpc: bool,

    /// RPC server port.
    #[arg(long, default_value_t = 8131, env = "STRAND_RPC_PORT")]
    rpc_port: u16,

    /// Maximum number of peer connections.
    #[arg(long, env = "STRAND_MAX_PEERS")]
    max_peers: Option<usize>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "STRAND_LOG_LEVEL")]
    log_level: String,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Placeholder relay until the P2P transport attaches; items are dropped
/// with a trace line.
struct NullRelay;

impl InventoryRelay for NullRelay {
    fn relay(&self, item: &InventoryItem) {
        tracing::trace!(hash = ?item.hash, "no transport attached; inventory not relayed");
    }
}

fn parse_network(s: &str) -> NetworkId {
    match s.to_lowercase().as_str() {
        "live" => NetworkId::Live,
        "test" => NetworkId::Test,
        _ => NetworkId::Dev,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    strand_utils::init_tracing();

    let cli = Cli::parse();
    let cli_network = cli.network.as_deref().map(parse_network);

    let file_config: Option<NodeConfig> = if let Some(ref config_path) = cli.config {
        match NodeConfig::from_toml_file(config_path) {
            Ok(cfg) => {
                tracing::info!("Loaded config from {}", config_path.display());
                Some(cfg)
            }
            Err(e) => {
                tracing::warn!("Failed to load config file: {e}, using CLI defaults");
                None
            }
        }
    } else {
        None
    };

    let config = if let Some(file_cfg) = file_config {
        let network = cli_network.unwrap_or(file_cfg.network);
        NodeConfig {
            network,
            data_dir: cli.data_dir,
            port: cli.port.unwrap_or(file_cfg.port),
            enable_rpc: cli.rpc,
            rpc_port: cli.rpc_port,
            max_peers: cli.max_peers.unwrap_or(file_cfg.max_peers),
            log_level: cli.log_level,
            ..file_cfg
        }
    } else {
        let network = cli_network.unwrap_or(NetworkId::Dev);
        NodeConfig {
            network,
            data_dir: cli.data_dir,
            port: cli.port.unwrap_or(network.default_port()),
            enable_rpc: cli.rpc,
            rpc_port: cli.rpc_port,
            max_peers: cli.max_peers.unwrap_or(50),
            log_level: cli.log_level,
            ..Default::default()
        }
    };

    tracing::info!(
        "Starting strand node on {} network (P2P:{}, RPC:{})",
        config.network.as_str(),
        config.port,
        if config.enable_rpc {
            config.rpc_port.to_string()
        } else {
            "off".into()
        },
    );

    let registry = strand_rpc::MethodRegistry::with_node_methods()
        .map_err(|e| anyhow::anyhow!("rpc registry: {e}"))?;
    tracing::debug!(
        methods = registry.method_names(true).len(),
        "rpc methods registered"
    );

    let mut node = StrandNode::new(config)?;
    let mempool = Arc::new(SetMempool::new());
    node.start(mempool, Arc::new(NullRelay));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received — stopping node");
    node.stop().await?;

    tracing::info!("strand daemon exited cleanly");
    Ok(())
}
