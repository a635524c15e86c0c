//! Compressed script encoding for the utxo store and spend journal.
//!
//! The vast majority of scripts follow one of a few standard templates, so
//! the store keeps only the parts that cannot be reconstructed: a small tag
//! plus the hash or key payload. Anything non-standard is stored raw behind
//! a size header.

// Opcodes appearing in the standard templates.
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_RETURN: u8 = 0x6a;
const OP_DATA_20: u8 = 0x14;
const OP_DATA_33: u8 = 0x21;

/// Compression tags for the standard templates; anything at or above
/// [`NUM_SPECIAL_SCRIPTS`] encodes a raw script length.
const TAG_PAY_TO_PUBKEY_HASH: u64 = 0;
const TAG_PAY_TO_SCRIPT_HASH: u64 = 1;
const TAG_PAY_TO_PUBKEY_EVEN: u64 = 2;
const TAG_PAY_TO_PUBKEY_ODD: u64 = 3;
const NUM_SPECIAL_SCRIPTS: u64 = 4;

/// Scripts above this size are never relayed or stored uncompressed.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

use crate::serialize::{put_vlq, read_vlq};

/// Whether an output can provably never be spent. Such outputs are skipped
/// when populating the view.
pub fn is_unspendable(amount: u64, script: &[u8]) -> bool {
    if script.first() == Some(&OP_RETURN) {
        return true;
    }
    if script.len() > MAX_SCRIPT_SIZE {
        return true;
    }
    amount == 0 && script.is_empty()
}

fn is_pay_to_pubkey_hash(script: &[u8]) -> bool {
    script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == OP_DATA_20
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
}

fn is_pay_to_script_hash(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == OP_HASH160 && script[1] == OP_DATA_20 && script[22] == OP_EQUAL
}

fn is_pay_to_compressed_pubkey(script: &[u8]) -> bool {
    script.len() == 35
        && script[0] == OP_DATA_33
        && script[34] == OP_CHECKSIG
        && (script[1] == 0x02 || script[1] == 0x03)
}

/// Append the compressed form of `script` to `out`.
pub fn compress_script(out: &mut Vec<u8>, script: &[u8]) {
    if is_pay_to_pubkey_hash(script) {
        put_vlq(out, TAG_PAY_TO_PUBKEY_HASH);
        out.extend_from_slice(&script[3..23]);
        return;
    }
    if is_pay_to_script_hash(script) {
        put_vlq(out, TAG_PAY_TO_SCRIPT_HASH);
        out.extend_from_slice(&script[2..22]);
        return;
    }
    if is_pay_to_compressed_pubkey(script) {
        let tag = if script[1] == 0x02 {
            TAG_PAY_TO_PUBKEY_EVEN
        } else {
            TAG_PAY_TO_PUBKEY_ODD
        };
        put_vlq(out, tag);
        out.extend_from_slice(&script[2..34]);
        return;
    }
    put_vlq(out, script.len() as u64 + NUM_SPECIAL_SCRIPTS);
    out.extend_from_slice(script);
}

/// Read one compressed script starting at `pos`, advancing it. Returns
/// `None` on truncated input.
pub fn decompress_script(data: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    let tag = read_vlq(data, pos)?;
    match tag {
        TAG_PAY_TO_PUBKEY_HASH => {
            let payload = data.get(*pos..*pos + 20)?;
            *pos += 20;
            let mut script = Vec::with_capacity(25);
            script.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
            script.extend_from_slice(payload);
            script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
            Some(script)
        }
        TAG_PAY_TO_SCRIPT_HASH => {
            let payload = data.get(*pos..*pos + 20)?;
            *pos += 20;
            let mut script = Vec::with_capacity(23);
            script.extend_from_slice(&[OP_HASH160, OP_DATA_20]);
            script.extend_from_slice(payload);
            script.push(OP_EQUAL);
            Some(script)
        }
        TAG_PAY_TO_PUBKEY_EVEN | TAG_PAY_TO_PUBKEY_ODD => {
            let payload = data.get(*pos..*pos + 32)?;
            *pos += 32;
            let parity = if tag == TAG_PAY_TO_PUBKEY_EVEN { 0x02 } else { 0x03 };
            let mut script = Vec::with_capacity(35);
            script.push(OP_DATA_33);
            script.push(parity);
            script.extend_from_slice(payload);
            script.push(OP_CHECKSIG);
            Some(script)
        }
        raw => {
            // The length is corruption-controlled; reject anything the
            // remaining input cannot possibly satisfy instead of letting
            // the offset arithmetic wrap.
            let len = usize::try_from(raw - NUM_SPECIAL_SCRIPTS).ok()?;
            let end = pos.checked_add(len)?;
            let payload = data.get(*pos..end)?;
            *pos = end;
            Some(payload.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p2pkh(hash_byte: u8) -> Vec<u8> {
        let mut script = vec![OP_DUP, OP_HASH160, OP_DATA_20];
        script.extend_from_slice(&[hash_byte; 20]);
        script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        script
    }

    fn p2sh(hash_byte: u8) -> Vec<u8> {
        let mut script = vec![OP_HASH160, OP_DATA_20];
        script.extend_from_slice(&[hash_byte; 20]);
        script.push(OP_EQUAL);
        script
    }

    fn p2pk(parity: u8) -> Vec<u8> {
        let mut script = vec![OP_DATA_33, parity];
        script.extend_from_slice(&[0xab; 32]);
        script.push(OP_CHECKSIG);
        script
    }

    fn roundtrip(script: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut compressed = Vec::new();
        compress_script(&mut compressed, script);
        let mut pos = 0;
        let restored = decompress_script(&compressed, &mut pos).expect("valid compressed script");
        assert_eq!(pos, compressed.len());
        (compressed, restored)
    }

    #[test]
    fn p2pkh_compresses_to_21_bytes() {
        let script = p2pkh(0x11);
        let (compressed, restored) = roundtrip(&script);
        assert_eq!(compressed.len(), 21);
        assert_eq!(restored, script);
    }

    #[test]
    fn p2sh_compresses_to_21_bytes() {
        let script = p2sh(0x22);
        let (compressed, restored) = roundtrip(&script);
        assert_eq!(compressed.len(), 21);
        assert_eq!(restored, script);
    }

    #[test]
    fn compressed_pubkey_roundtrips_both_parities() {
        for parity in [0x02, 0x03] {
            let script = p2pk(parity);
            let (compressed, restored) = roundtrip(&script);
            assert_eq!(compressed.len(), 33);
            assert_eq!(restored, script);
        }
    }

    #[test]
    fn nonstandard_script_stored_raw() {
        let script = vec![0x51, 0x52, 0x53];
        let (compressed, restored) = roundtrip(&script);
        assert_eq!(compressed.len(), 4); // 1-byte tag + raw bytes
        assert_eq!(restored, script);
    }

    #[test]
    fn empty_script_roundtrips() {
        let (_, restored) = roundtrip(&[]);
        assert!(restored.is_empty());
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut compressed = Vec::new();
        compress_script(&mut compressed, &p2pkh(0x33));
        compressed.truncate(10);
        let mut pos = 0;
        assert!(decompress_script(&compressed, &mut pos).is_none());
    }

    #[test]
    fn oversized_raw_length_is_rejected() {
        // A raw-length tag near u64::MAX must fail cleanly, not wrap the
        // offset arithmetic.
        let mut data = Vec::new();
        put_vlq(&mut data, u64::MAX);
        data.extend_from_slice(&[0x51; 8]);
        let mut pos = 0;
        assert!(decompress_script(&data, &mut pos).is_none());
    }

    #[test]
    fn unspendable_detection() {
        assert!(is_unspendable(5, &[OP_RETURN]));
        assert!(is_unspendable(5, &vec![0x51; MAX_SCRIPT_SIZE + 1]));
        assert!(is_unspendable(0, &[]));
        assert!(!is_unspendable(5, &p2pkh(0x01)));
        assert!(!is_unspendable(0, &p2pkh(0x01)));
    }
}
