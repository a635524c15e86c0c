//! Transaction shapes consumed by the UTXO viewpoint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::TxHash;

/// Reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: TxHash,
    pub out_index: u32,
}

impl OutPoint {
    pub fn new(tx_id: TxHash, out_index: u32) -> Self {
        Self { tx_id, out_index }
    }

    /// The null out-point referenced by a coinbase input.
    pub fn null() -> Self {
        Self {
            tx_id: TxHash::ZERO,
            out_index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.tx_id.is_zero() && self.out_index == u32::MAX
    }
}

/// A transaction input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub previous: OutPoint,
    /// Declared input amount; informational, the referenced entry is
    /// authoritative.
    pub amount_in: u64,
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    pub script_version: u16,
    pub script: Vec<u8>,
}

/// Classification of a transaction, recorded in its utxo entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    Regular,
    Coinbase,
}

impl TxType {
    pub fn of(tx: &Transaction) -> Self {
        if tx.is_coinbase() {
            Self::Coinbase
        } else {
            Self::Regular
        }
    }

    /// Stable numeric code used by the on-disk codecs.
    pub fn code(self) -> u8 {
        match self {
            Self::Regular => 0,
            Self::Coinbase => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Regular),
            1 => Some(Self::Coinbase),
            _ => None,
        }
    }
}

/// An already-validated transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Block order after which the transaction expires; 0 means no expiry.
    pub expire: u32,
}

impl Transaction {
    /// Content hash over every field.
    pub fn tx_id(&self) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update((self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.previous.tx_id.as_bytes());
            hasher.update(input.previous.out_index.to_le_bytes());
            hasher.update(input.amount_in.to_le_bytes());
        }
        hasher.update((self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            hasher.update(output.amount.to_le_bytes());
            hasher.update(output.script_version.to_le_bytes());
            hasher.update((output.script.len() as u32).to_le_bytes());
            hasher.update(&output.script);
        }
        hasher.update(self.expire.to_le_bytes());
        TxHash::new(hasher.finalize().into())
    }

    /// A coinbase transaction has exactly one input referencing the null
    /// out-point.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous.is_null()
    }

    pub fn has_expiry(&self) -> bool {
        self.expire != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase(amount: u64) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                previous: OutPoint::null(),
                amount_in: 0,
            }],
            outputs: vec![TxOutput {
                amount,
                script_version: 0,
                script: vec![0x51],
            }],
            expire: 0,
        }
    }

    #[test]
    fn coinbase_detection() {
        let tx = coinbase(50);
        assert!(tx.is_coinbase());
        assert_eq!(TxType::of(&tx), TxType::Coinbase);
    }

    #[test]
    fn regular_detection() {
        let cb = coinbase(50);
        let tx = Transaction {
            version: 1,
            inputs: vec![TxInput {
                previous: OutPoint::new(cb.tx_id(), 0),
                amount_in: 50,
            }],
            outputs: vec![TxOutput {
                amount: 50,
                script_version: 0,
                script: vec![0x51],
            }],
            expire: 0,
        };
        assert!(!tx.is_coinbase());
        assert_eq!(TxType::of(&tx), TxType::Regular);
    }

    #[test]
    fn tx_id_changes_with_content() {
        let a = coinbase(50);
        let b = coinbase(51);
        assert_ne!(a.tx_id(), b.tx_id());
        assert_eq!(a.tx_id(), a.clone().tx_id());
    }

    #[test]
    fn tx_type_code_roundtrip() {
        for ty in [TxType::Regular, TxType::Coinbase] {
            assert_eq!(TxType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(TxType::from_code(9), None);
    }
}
