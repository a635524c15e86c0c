//! Network message types for strand node-to-node communication.

use serde::{Deserialize, Serialize};
use strand_types::{BlockId, NetworkId, TxHash};

/// Header present on every network message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub network_id: NetworkId,
    pub protocol_version: u16,
    pub timestamp: i64,
}

/// All message types in the protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    // Block/transaction propagation
    Inventory,
    GetData,

    // Sync
    GraphState,

    // Handshake
    NodeIdHandshake,
}

/// One tip of the sender's DAG with its frozen past-count, enough for the
/// receiver to judge how far ahead or behind the sender is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTip {
    pub id: BlockId,
    pub past_count: u64,
}

/// Snapshot of a node's DAG frontier, exchanged over the `RPCGraphState`
/// request/response protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphState {
    pub genesis: BlockId,
    pub total: u32,
    pub tips: Vec<GraphTip>,
}

impl GraphState {
    /// The highest past-count among the tips — a cheap progress measure.
    pub fn max_past_count(&self) -> u64 {
        self.tips.iter().map(|t| t.past_count).max().unwrap_or(0)
    }
}

/// Hash of an inventory item relayed between peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryHash {
    Block(BlockId),
    Transaction(TxHash),
}

/// An inventory item tracked by the rebroadcaster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryItem {
    pub hash: InventoryHash,
    /// Serialized payload to relay.
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_state_bincode_roundtrip() {
        let state = GraphState {
            genesis: BlockId::new([1u8; 32]),
            total: 42,
            tips: vec![
                GraphTip {
                    id: BlockId::new([2u8; 32]),
                    past_count: 41,
                },
                GraphTip {
                    id: BlockId::new([3u8; 32]),
                    past_count: 40,
                },
            ],
        };
        let bytes = bincode::serialize(&state).unwrap();
        let decoded: GraphState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn max_past_count() {
        let mut state = GraphState {
            genesis: BlockId::ZERO,
            total: 1,
            tips: vec![],
        };
        assert_eq!(state.max_past_count(), 0);
        state.tips.push(GraphTip {
            id: BlockId::new([2u8; 32]),
            past_count: 7,
        });
        state.tips.push(GraphTip {
            id: BlockId::new([3u8; 32]),
            past_count: 3,
        });
        assert_eq!(state.max_past_count(), 7);
    }
}
