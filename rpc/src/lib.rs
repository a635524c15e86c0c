//! JSON-RPC method surface for the strand node.
//!
//! Defines the request/response shapes and the method registry. Transport,
//! authentication, and routing live outside the consensus core.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{MethodRegistry, Namespace};
