//! Network identifier.

use serde::{Deserialize, Serialize};

/// Identifies which strand network a node is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkId {
    /// The production network.
    Live,
    /// The public test network.
    Test,
    /// Local development network.
    Dev,
}

impl NetworkId {
    /// Default P2P port for this network.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Live => 8130,
            Self::Test => 18130,
            Self::Dev => 28130,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
            Self::Dev => "dev",
        }
    }
}
