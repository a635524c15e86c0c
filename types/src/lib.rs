//! Fundamental types for the strand block-DAG node.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: block and transaction identifiers, block and transaction
//! shapes, and the consensus parameters.

pub mod block;
pub mod hash;
pub mod network;
pub mod params;
pub mod transaction;

pub use block::{Block, BlockId};
pub use hash::TxHash;
pub use network::NetworkId;
pub use params::ConsensusParams;
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput, TxType};
