//! LMDB storage backend for the strand node.
//!
//! Implements the storage traits from `strand-store` using the `heed` LMDB
//! bindings. Each logical store maps to one LMDB database within a single
//! environment, so the utxo write-back and journal append can share one
//! write transaction.

pub mod environment;
pub mod error;
pub mod journal;
pub mod meta;
pub mod utxo;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use write_batch::WriteBatch;
