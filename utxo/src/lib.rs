//! UTXO viewpoint and spend journal for the strand node.
//!
//! The view is a short-lived in-memory projection of the on-disk utxo set
//! that can be mutated by connecting transactions along newly-ordered
//! blocks and disconnecting them on reorg. The spend journal records every
//! spent output in connect order so disconnection is exactly reversible.
//!
//! ## Module overview
//!
//! - [`entry`] — utxo entries and outputs.
//! - [`view`] — the viewpoint: connect, disconnect, commit, fetch.
//! - [`journal`] — spent-output records and their codec.
//! - [`script`] — compressed script encoding and unspendable detection.
//! - [`serialize`] — VLQ varints and the utxo entry codec.
//! - [`error`] — utxo error types.

pub mod entry;
pub mod error;
pub mod journal;
pub mod script;
pub mod serialize;
pub mod view;

pub use entry::{UtxoEntry, UtxoOutput};
pub use error::UtxoError;
pub use journal::{deserialize_journal, serialize_journal, SpentTxOut};
pub use serialize::{deserialize_utxo_entry, serialize_utxo_entry};
pub use view::{UtxoSource, UtxoView};
