#![no_main]

use libfuzzer_sys::fuzz_target;

// Decoding arbitrary journal bytes must never panic, and decoded records
// must survive a serialize/deserialize round-trip unchanged.
fuzz_target!(|data: &[u8]| {
    if let Ok(records) = strand_utxo::deserialize_journal(data) {
        let reserialized = strand_utxo::serialize_journal(&records);
        let reparsed =
            strand_utxo::deserialize_journal(&reserialized).expect("reserialized journal decodes");
        assert_eq!(reparsed, records, "journal records must round-trip");
    }
});
