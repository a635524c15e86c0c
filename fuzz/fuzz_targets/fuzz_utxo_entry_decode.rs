#![no_main]

use libfuzzer_sys::fuzz_target;

// Decoding arbitrary utxo entry bytes must never panic, and decoded entries
// must survive a serialize/deserialize round-trip unchanged.
fuzz_target!(|data: &[u8]| {
    if let Ok(entry) = strand_utxo::deserialize_utxo_entry(data) {
        let reserialized = strand_utxo::serialize_utxo_entry(&entry);
        let reparsed = strand_utxo::deserialize_utxo_entry(&reserialized)
            .expect("reserialized entry decodes");
        assert_eq!(reparsed, entry, "utxo entries must round-trip");
    }
});
