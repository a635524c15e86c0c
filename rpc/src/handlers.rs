//! RPC request and response shapes.

use serde::{Deserialize, Serialize};

// ── Node ─────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct NodeInfoResponse {
    pub version: String,
    pub network: String,
    pub block_count: u32,
    pub tip_count: usize,
    pub order_height: u64,
    pub last_block_time: i64,
}

// ── Peers ────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct PeerInfoResponse {
    pub peers: Vec<PeerSummary>,
}

#[derive(Serialize, Deserialize)]
pub struct PeerSummary {
    pub id: String,
    pub active: bool,
    pub bad_responses: u32,
    /// Highest tip past-count the peer has reported, if any.
    pub graph_progress: Option<u64>,
}

// ── Rpc / time ───────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct RpcInfoResponse {
    pub methods: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct TimeInfoResponse {
    pub node_time: i64,
    pub last_block_time: i64,
}

// ── Control ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct StopResponse {
    pub stopping: bool,
}

#[derive(Serialize, Deserialize)]
pub struct BanlistResponse {
    pub banned: Vec<String>,
}

// ── Address ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct CheckAddressRequest {
    pub address: String,
    pub network: String,
}

#[derive(Serialize, Deserialize)]
pub struct CheckAddressResponse {
    pub valid: bool,
}
