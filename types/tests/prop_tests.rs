use proptest::prelude::*;

use strand_types::{Block, BlockId, OutPoint, Transaction, TxHash, TxInput, TxOutput};

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        0u32..10,
        prop::collection::vec(
            (prop::array::uniform32(0u8..), 0u32..8, 0u64..1_000_000),
            1..4,
        ),
        prop::collection::vec(
            (0u64..1_000_000, prop::collection::vec(0u8.., 0..40)),
            1..4,
        ),
        0u32..100,
    )
        .prop_map(|(version, ins, outs, expire)| Transaction {
            version,
            inputs: ins
                .into_iter()
                .map(|(id, idx, amount)| TxInput {
                    previous: OutPoint::new(TxHash::new(id), idx),
                    amount_in: amount,
                })
                .collect(),
            outputs: outs
                .into_iter()
                .map(|(amount, script)| TxOutput {
                    amount,
                    script_version: 0,
                    script,
                })
                .collect(),
            expire,
        })
}

proptest! {
    /// BlockId roundtrip: new -> as_bytes -> new produces identical id.
    #[test]
    fn block_id_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = BlockId::new(bytes);
        prop_assert_eq!(id.as_bytes(), &bytes);
    }

    /// TxHash roundtrip.
    #[test]
    fn tx_hash_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(hash.as_bytes(), &bytes);
    }

    /// BlockId ordering matches lexicographic byte ordering.
    #[test]
    fn block_id_order_is_lexicographic(
        a in prop::array::uniform32(0u8..),
        b in prop::array::uniform32(0u8..),
    ) {
        let ia = BlockId::new(a);
        let ib = BlockId::new(b);
        prop_assert_eq!(ia.cmp(&ib), a.cmp(&b));
    }

    /// BlockId::is_zero is true only for all-zero bytes.
    #[test]
    fn block_id_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(BlockId::new(bytes).is_zero(), bytes == [0u8; 32]);
    }

    /// BlockId bincode serialization roundtrip.
    #[test]
    fn block_id_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = BlockId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: BlockId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// Transaction ids are deterministic and stable under clone.
    #[test]
    fn tx_id_deterministic(tx in arb_transaction()) {
        prop_assert_eq!(tx.tx_id(), tx.clone().tx_id());
    }

    /// Transaction bincode roundtrip preserves the id.
    #[test]
    fn transaction_bincode_roundtrip(tx in arb_transaction()) {
        let encoded = bincode::serialize(&tx).unwrap();
        let decoded: Transaction = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded.tx_id(), tx.tx_id());
    }

    /// Block ids commit to the parent list.
    #[test]
    fn block_id_commits_to_parents(
        p1 in prop::array::uniform32(0u8..),
        p2 in prop::array::uniform32(0u8..),
        ts in 0i64..2_000_000_000,
    ) {
        prop_assume!(p1 != p2);
        let a = Block::new(vec![BlockId::new(p1)], ts, vec![]);
        let b = Block::new(vec![BlockId::new(p2)], ts, vec![]);
        prop_assert_ne!(a.id, b.id);
    }
}
