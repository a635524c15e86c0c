//! Spend-journal records and their codec.
//!
//! For every block the journal captures, in connect order, everything needed
//! to reverse the block's spends. Disconnection consumes the records
//! tail-first; any disagreement between journal order and block input order
//! is fatal, never recoverable.

use strand_types::TxType;

use crate::error::UtxoError;
use crate::script::{compress_script, decompress_script};
use crate::serialize::{put_vlq, read_vlq, read_vlq_u16, read_vlq_u32};

/// One spent output, recorded when `connect_transaction` marks it spent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpentTxOut {
    pub amount: u64,
    pub script_version: u16,
    pub script: Vec<u8>,
    /// Position of the referenced transaction within its emitting block —
    /// with `order`, enough to resurrect the entry exactly.
    pub tx_index: u32,
    /// Position of the input within the spending transaction.
    pub in_index: u32,
    pub tx_version: u32,
    /// Order height of the block that created the referenced entry.
    pub order: u32,
    pub is_coinbase: bool,
    pub has_expiry: bool,
    pub tx_type: TxType,
    /// Whether this spend emptied the referenced entry — required to
    /// resurrect it on disconnect.
    pub tx_fully_spent: bool,
}

const FLAG_COINBASE: u8 = 1 << 0;
const FLAG_HAS_EXPIRY: u8 = 1 << 1;
const FLAG_FULLY_SPENT: u8 = 1 << 2;
const TX_TYPE_SHIFT: u8 = 3;

/// Serialise a block's journal contribution: a record count followed by the
/// records in connect order.
pub fn serialize_journal(records: &[SpentTxOut]) -> Vec<u8> {
    let mut out = Vec::new();
    put_vlq(&mut out, records.len() as u64);
    for record in records {
        let mut flags = record.tx_type.code() << TX_TYPE_SHIFT;
        if record.is_coinbase {
            flags |= FLAG_COINBASE;
        }
        if record.has_expiry {
            flags |= FLAG_HAS_EXPIRY;
        }
        if record.tx_fully_spent {
            flags |= FLAG_FULLY_SPENT;
        }
        out.push(flags);
        put_vlq(&mut out, record.amount);
        put_vlq(&mut out, u64::from(record.script_version));
        compress_script(&mut out, &record.script);
        put_vlq(&mut out, u64::from(record.tx_index));
        put_vlq(&mut out, u64::from(record.in_index));
        put_vlq(&mut out, u64::from(record.tx_version));
        put_vlq(&mut out, u64::from(record.order));
    }
    out
}

/// Decode a block's journal contribution.
pub fn deserialize_journal(data: &[u8]) -> Result<Vec<SpentTxOut>, UtxoError> {
    let corrupt = |what: &str| UtxoError::JournalCorruption(what.into());

    let mut pos = 0;
    let count = read_vlq(data, &mut pos).ok_or_else(|| corrupt("missing record count"))?;
    let mut records = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let flags = *data.get(pos).ok_or_else(|| corrupt("truncated record"))?;
        pos += 1;
        let tx_type =
            TxType::from_code(flags >> TX_TYPE_SHIFT).ok_or_else(|| corrupt("bad tx type"))?;
        let amount = read_vlq(data, &mut pos).ok_or_else(|| corrupt("truncated amount"))?;
        let script_version =
            read_vlq_u16(data, &mut pos).ok_or_else(|| corrupt("bad script version"))?;
        let script =
            decompress_script(data, &mut pos).ok_or_else(|| corrupt("truncated script"))?;
        let tx_index = read_vlq_u32(data, &mut pos).ok_or_else(|| corrupt("bad tx index"))?;
        let in_index = read_vlq_u32(data, &mut pos).ok_or_else(|| corrupt("bad in index"))?;
        let tx_version = read_vlq_u32(data, &mut pos).ok_or_else(|| corrupt("bad tx version"))?;
        let order = read_vlq_u32(data, &mut pos).ok_or_else(|| corrupt("bad order"))?;
        records.push(SpentTxOut {
            amount,
            script_version,
            script,
            tx_index,
            in_index,
            tx_version,
            order,
            is_coinbase: flags & FLAG_COINBASE != 0,
            has_expiry: flags & FLAG_HAS_EXPIRY != 0,
            tx_type,
            tx_fully_spent: flags & FLAG_FULLY_SPENT != 0,
        });
    }
    if pos != data.len() {
        return Err(corrupt("trailing bytes"));
    }
    Ok(records)
}
