//! On-disk codec for utxo entries.
//!
//! Variable-length quantities keep the common small values at one byte.
//! The encoding is canonical — every value has exactly one representation —
//! so serialising a deserialised entry reproduces the input bytes.

use strand_types::TxType;

use crate::entry::{UtxoEntry, UtxoOutput};
use crate::error::UtxoError;
use crate::script::{compress_script, decompress_script};

/// Append `n` as a base-128 variable-length quantity, most significant
/// group first. Each continuation step is offset by one, which removes
/// redundant encodings.
pub fn put_vlq(out: &mut Vec<u8>, mut n: u64) {
    let mut buf = [0u8; 10];
    let mut len = 0;
    loop {
        let high_bit = if len > 0 { 0x80 } else { 0x00 };
        buf[len] = (n & 0x7f) as u8 | high_bit;
        len += 1;
        if n <= 0x7f {
            break;
        }
        n = (n >> 7) - 1;
    }
    for i in (0..len).rev() {
        out.push(buf[i]);
    }
}

/// Read a VLQ that must fit in 32 bits; wider values are malformed, not
/// truncated.
pub(crate) fn read_vlq_u32(data: &[u8], pos: &mut usize) -> Option<u32> {
    u32::try_from(read_vlq(data, pos)?).ok()
}

/// Read a VLQ that must fit in 16 bits.
pub(crate) fn read_vlq_u16(data: &[u8], pos: &mut usize) -> Option<u16> {
    u16::try_from(read_vlq(data, pos)?).ok()
}

/// Read one VLQ starting at `pos`, advancing it. Returns `None` on
/// truncated or oversized input.
pub fn read_vlq(data: &[u8], pos: &mut usize) -> Option<u64> {
    let mut n: u64 = 0;
    let mut consumed = 0;
    loop {
        let byte = *data.get(*pos + consumed)?;
        consumed += 1;
        n = n.checked_mul(128)? | u64::from(byte & 0x7f);
        if byte & 0x80 != 0x80 {
            break;
        }
        n = n.checked_add(1)?;
        if consumed > 10 {
            return None;
        }
    }
    *pos += consumed;
    Some(n)
}

// Entry header flag bits.
const FLAG_COINBASE: u8 = 1 << 0;
const FLAG_HAS_EXPIRY: u8 = 1 << 1;
const TX_TYPE_SHIFT: u8 = 2;

/// Serialise an entry for the utxo bucket. Only unspent outputs are
/// written; a fully-spent entry serialises with zero outputs and should be
/// deleted rather than stored.
pub fn serialize_utxo_entry(entry: &UtxoEntry) -> Vec<u8> {
    let mut out = Vec::new();
    put_vlq(&mut out, u64::from(entry.tx_version()));
    put_vlq(&mut out, u64::from(entry.order()));
    put_vlq(&mut out, u64::from(entry.index()));

    let mut flags = entry.tx_type().code() << TX_TYPE_SHIFT;
    if entry.is_coinbase() {
        flags |= FLAG_COINBASE;
    }
    if entry.has_expiry() {
        flags |= FLAG_HAS_EXPIRY;
    }
    out.push(flags);

    let indices = entry.unspent_indices();
    put_vlq(&mut out, indices.len() as u64);
    for index in indices {
        let Some(output) = entry.output(index) else {
            continue;
        };
        put_vlq(&mut out, u64::from(index));
        put_vlq(&mut out, u64::from(output.script_version));
        put_vlq(&mut out, output.amount);
        compress_script(&mut out, &output.script);
    }
    out
}

/// Decode an entry from the utxo bucket.
///
/// A zero-length value signals an entry stored for a fully spent
/// transaction, which the store must never contain.
pub fn deserialize_utxo_entry(data: &[u8]) -> Result<UtxoEntry, UtxoError> {
    if data.is_empty() {
        return Err(UtxoError::StoreCorruption(
            "entry for fully spent tx".into(),
        ));
    }
    let corrupt = || UtxoError::StoreCorruption("undecodable utxo entry".into());

    let mut pos = 0;
    let tx_version = read_vlq_u32(data, &mut pos).ok_or_else(corrupt)?;
    let order = read_vlq_u32(data, &mut pos).ok_or_else(corrupt)?;
    let index = read_vlq_u32(data, &mut pos).ok_or_else(corrupt)?;
    let flags = *data.get(pos).ok_or_else(corrupt)?;
    pos += 1;

    let tx_type = TxType::from_code(flags >> TX_TYPE_SHIFT).ok_or_else(corrupt)?;
    let mut entry = UtxoEntry::new(
        tx_version,
        order,
        index,
        flags & FLAG_COINBASE != 0,
        flags & FLAG_HAS_EXPIRY != 0,
        tx_type,
    );

    let count = read_vlq(data, &mut pos).ok_or_else(corrupt)?;
    for _ in 0..count {
        let out_index = read_vlq_u32(data, &mut pos).ok_or_else(corrupt)?;
        let script_version = read_vlq_u16(data, &mut pos).ok_or_else(corrupt)?;
        let amount = read_vlq(data, &mut pos).ok_or_else(corrupt)?;
        let script = decompress_script(data, &mut pos).ok_or_else(corrupt)?;
        entry.outputs.insert(
            out_index,
            UtxoOutput {
                script_version,
                script,
                amount,
                spent: false,
            },
        );
    }
    if pos != data.len() {
        return Err(corrupt());
    }
    Ok(entry)
}
