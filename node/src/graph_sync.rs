//! Graph-state exchange — the `RPCGraphState` request/response protocol.
//!
//! Each side sends its DAG frontier snapshot and records the peer's in
//! return. The protocol client talks to the network layer over mpsc
//! channels; the companion handle is given to the transport so it can
//! process requests and send back responses.

use std::collections::HashMap;
use std::time::Duration;

use strand_messages::GraphState;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::NodeError;

/// Deadline for an outgoing graph-state request.
pub const REQ_TIMEOUT: Duration = Duration::from_secs(20);
/// Deadline for handling an incoming graph-state message.
pub const HANDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Channel buffer size for sync request/response channels.
const CHANNEL_BUFFER: usize = 64;

/// Per-peer sync bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct PeerState {
    /// The peer's last reported DAG frontier.
    pub graph_state: Option<GraphState>,
    /// Bad message / timeout counter; disconnection policy lives upstream.
    pub bad_responses: u32,
    pub active: bool,
}

/// Registry of known peers keyed by peer id.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<String, PeerState>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, peer: &str) {
        self.peers.entry(peer.to_string()).or_insert(PeerState {
            graph_state: None,
            bad_responses: 0,
            active: true,
        });
    }

    pub fn get(&self, peer: &str) -> Option<&PeerState> {
        self.peers.get(peer)
    }

    pub fn is_known(&self, peer: &str) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn update_graph_state(&mut self, peer: &str, state: GraphState) {
        if let Some(entry) = self.peers.get_mut(peer) {
            debug!(peer, total = state.total, "peer graph state updated");
            entry.graph_state = Some(state);
        }
    }

    pub fn increment_bad_responses(&mut self, peer: &str) {
        if let Some(entry) = self.peers.get_mut(peer) {
            entry.bad_responses += 1;
            warn!(peer, count = entry.bad_responses, "bad response from peer");
        }
    }

    pub fn set_active(&mut self, peer: &str, active: bool) {
        if let Some(entry) = self.peers.get_mut(peer) {
            entry.active = active;
        }
    }
}

/// A graph-state request bound for a peer.
#[derive(Debug)]
pub struct GraphSyncRequest {
    pub peer: String,
    pub state: GraphState,
}

/// The transport's answer to a request.
#[derive(Debug)]
pub enum GraphSyncResponse {
    State { peer: String, state: GraphState },
    Error { peer: String, message: String },
}

/// Protocol client — used by node code to exchange graph states.
pub struct GraphSyncProtocol {
    request_tx: mpsc::Sender<GraphSyncRequest>,
    response_rx: mpsc::Receiver<GraphSyncResponse>,
}

/// Handle given to the network layer to process outgoing requests.
pub struct GraphSyncHandle {
    pub request_rx: mpsc::Receiver<GraphSyncRequest>,
    pub response_tx: mpsc::Sender<GraphSyncResponse>,
}

/// Create a connected protocol/handle pair.
pub fn graph_sync_channel() -> (GraphSyncProtocol, GraphSyncHandle) {
    let (request_tx, request_rx) = mpsc::channel(CHANNEL_BUFFER);
    let (response_tx, response_rx) = mpsc::channel(CHANNEL_BUFFER);
    (
        GraphSyncProtocol {
            request_tx,
            response_rx,
        },
        GraphSyncHandle {
            request_rx,
            response_tx,
        },
    )
}

impl GraphSyncProtocol {
    /// Send our frontier to a peer and await theirs.
    ///
    /// On success the peer's recorded graph state is updated. A timeout or
    /// transport error increments the peer's bad-response counter.
    pub async fn request_graph_state(
        &mut self,
        registry: &mut PeerRegistry,
        peer: &str,
        ours: GraphState,
    ) -> Result<GraphState, NodeError> {
        if !registry.is_known(peer) {
            return Err(NodeError::PeerUnknown(peer.to_string()));
        }
        self.request_tx
            .send(GraphSyncRequest {
                peer: peer.to_string(),
                state: ours,
            })
            .await
            .map_err(|_| NodeError::ChannelClosed)?;

        match timeout(REQ_TIMEOUT, self.response_rx.recv()).await {
            Err(_) => {
                registry.increment_bad_responses(peer);
                Err(NodeError::PeerTimeout(peer.to_string()))
            }
            Ok(None) => Err(NodeError::ChannelClosed),
            Ok(Some(GraphSyncResponse::State { state, .. })) => {
                registry.update_graph_state(peer, state.clone());
                Ok(state)
            }
            Ok(Some(GraphSyncResponse::Error { message, .. })) => {
                registry.increment_bad_responses(peer);
                Err(NodeError::Other(message))
            }
        }
    }
}

/// Handle an incoming graph-state message from a peer.
///
/// Verifies the peer is known, records its frontier, and schedules a
/// peer-sync update over `sync_tx`; the reply is our own frontier. Failing
/// to schedule within [`HANDLE_TIMEOUT`] aborts the handler.
pub async fn handle_graph_state(
    registry: &mut PeerRegistry,
    peer: &str,
    incoming: GraphState,
    ours: GraphState,
    sync_tx: &mpsc::Sender<String>,
) -> Result<GraphState, NodeError> {
    if !registry.is_known(peer) {
        return Err(NodeError::PeerUnknown(peer.to_string()));
    }
    registry.update_graph_state(peer, incoming);
    match timeout(HANDLE_TIMEOUT, sync_tx.send(peer.to_string())).await {
        Err(_) => Err(NodeError::HandleTimeout(peer.to_string())),
        Ok(Err(_)) => Err(NodeError::ChannelClosed),
        Ok(Ok(())) => Ok(ours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_types::BlockId;

    fn state(total: u32) -> GraphState {
        GraphState {
            genesis: BlockId::new([1u8; 32]),
            total,
            tips: vec![],
        }
    }

    #[tokio::test]
    async fn exchange_updates_registry() {
        let (mut protocol, mut handle) = graph_sync_channel();
        let mut registry = PeerRegistry::new();
        registry.register("peer-1");

        let transport = tokio::spawn(async move {
            let request = handle.request_rx.recv().await.expect("request");
            assert_eq!(request.peer, "peer-1");
            assert_eq!(request.state.total, 5);
            handle
                .response_tx
                .send(GraphSyncResponse::State {
                    peer: request.peer,
                    state: state(9),
                })
                .await
                .unwrap();
        });

        let theirs = protocol
            .request_graph_state(&mut registry, "peer-1", state(5))
            .await
            .unwrap();
        assert_eq!(theirs.total, 9);
        let recorded = registry.get("peer-1").unwrap();
        assert_eq!(recorded.graph_state.as_ref().unwrap().total, 9);
        assert_eq!(recorded.bad_responses, 0);
        transport.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_peer_rejected() {
        let (mut protocol, _handle) = graph_sync_channel();
        let mut registry = PeerRegistry::new();
        let err = protocol
            .request_graph_state(&mut registry, "stranger", state(1))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::PeerUnknown(_)));
    }

    #[tokio::test]
    async fn error_response_counts_against_peer() {
        let (mut protocol, mut handle) = graph_sync_channel();
        let mut registry = PeerRegistry::new();
        registry.register("peer-1");

        let transport = tokio::spawn(async move {
            let request = handle.request_rx.recv().await.expect("request");
            handle
                .response_tx
                .send(GraphSyncResponse::Error {
                    peer: request.peer,
                    message: "malformed".into(),
                })
                .await
                .unwrap();
        });

        let err = protocol
            .request_graph_state(&mut registry, "peer-1", state(5))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Other(_)));
        assert_eq!(registry.get("peer-1").unwrap().bad_responses, 1);
        transport.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn request_timeout_counts_against_peer() {
        let (mut protocol, _handle) = graph_sync_channel();
        let mut registry = PeerRegistry::new();
        registry.register("peer-1");

        // the transport never answers
        let err = protocol
            .request_graph_state(&mut registry, "peer-1", state(5))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::PeerTimeout(_)));
        assert_eq!(registry.get("peer-1").unwrap().bad_responses, 1);
    }

    #[tokio::test]
    async fn handler_records_and_replies() {
        let mut registry = PeerRegistry::new();
        registry.register("peer-2");
        let (sync_tx, mut sync_rx) = mpsc::channel(4);

        let reply = handle_graph_state(&mut registry, "peer-2", state(7), state(3), &sync_tx)
            .await
            .unwrap();
        assert_eq!(reply.total, 3);
        assert_eq!(
            registry
                .get("peer-2")
                .unwrap()
                .graph_state
                .as_ref()
                .unwrap()
                .total,
            7
        );
        assert_eq!(sync_rx.recv().await.unwrap(), "peer-2");
    }

    #[tokio::test]
    async fn handler_rejects_unknown_peer() {
        let mut registry = PeerRegistry::new();
        let (sync_tx, _sync_rx) = mpsc::channel(4);
        let err = handle_graph_state(&mut registry, "stranger", state(7), state(3), &sync_tx)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::PeerUnknown(_)));
    }
}
