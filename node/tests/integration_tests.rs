//! Integration tests exercising the full pipeline:
//! block acceptance → DAG ordering → utxo connect/disconnect → LMDB
//! persistence → readback.
//!
//! These tests wire together components that are normally only connected
//! inside the chain driver, verifying the system works end-to-end — not
//! just in isolation.

use strand_node::chain::Chain;
use strand_store::JournalStore;
use strand_store_lmdb::LmdbEnvironment;
use strand_types::{Block, BlockId, OutPoint, Transaction, TxInput, TxOutput};
use strand_utxo::deserialize_journal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn temp_chain() -> (tempfile::TempDir, Chain) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = LmdbEnvironment::open(dir.path(), 64 * 1024 * 1024).expect("open env");
    (dir, Chain::new(3, env))
}

fn id(n: u8) -> BlockId {
    let mut bytes = [0u8; 32];
    bytes[0] = n;
    BlockId::new(bytes)
}

fn coinbase(amount: u64, tag: u8) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TxInput {
            previous: OutPoint::null(),
            amount_in: 0,
        }],
        outputs: vec![TxOutput {
            amount,
            script_version: 0,
            script: vec![0x51, tag],
        }],
        expire: 0,
    }
}

fn spend(previous: &Transaction, out_index: u32, amounts: &[u64]) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TxInput {
            previous: OutPoint::new(previous.tx_id(), out_index),
            amount_in: previous.outputs[out_index as usize].amount,
        }],
        outputs: amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| TxOutput {
                amount: *amount,
                script_version: 0,
                script: vec![0x52, i as u8],
            })
            .collect(),
        expire: 0,
    }
}

fn block(n: u8, parents: &[BlockId], txs: Vec<Transaction>) -> Block {
    Block {
        id: id(n),
        parents: parents.to_vec(),
        timestamp: i64::from(n),
        transactions: txs,
    }
}

// ---------------------------------------------------------------------------
// DAG ordering through the driver
// ---------------------------------------------------------------------------

#[test]
fn linear_chain_orders_and_persists() {
    let (_dir, mut chain) = temp_chain();
    chain.process_block(block(0, &[], vec![])).unwrap();
    chain.process_block(block(1, &[id(0)], vec![])).unwrap();
    chain.process_block(block(2, &[id(1)], vec![])).unwrap();

    assert!(chain.dag().tips().has_only(&id(2)));
    assert_eq!(chain.dag().block_by_order(0), Some(id(0)));
    assert_eq!(chain.dag().block_by_order(1), Some(id(1)));
    assert_eq!(chain.dag().block_by_order(2), Some(id(2)));
    assert_eq!(chain.best_block().unwrap(), Some(id(2)));
}

#[test]
fn fork_reorders_utxo_application() {
    let (_dir, mut chain) = temp_chain();
    let cb0 = coinbase(50, 0);
    let cb1 = coinbase(50, 1);
    let cb3 = coinbase(50, 3);

    chain.process_block(block(0, &[], vec![])).unwrap();
    chain
        .process_block(block(1, &[id(0)], vec![cb0.clone()]))
        .unwrap();
    chain
        .process_block(block(3, &[id(1)], vec![cb1.clone()]))
        .unwrap();
    // B2 sorts before B3 (lex tie-break), forcing a disconnect/reconnect of
    // B3's effects.
    chain
        .process_block(block(2, &[id(1)], vec![cb3.clone()]))
        .unwrap();

    assert_eq!(chain.dag().order_of(&id(2)), 2);
    assert_eq!(chain.dag().order_of(&id(3)), 3);
    // all three coinbases are live with their final orders recorded
    let entry = chain.fetch_utxo_entry(&cb3.tx_id()).unwrap().expect("live");
    assert_eq!(entry.order(), 2);
    let entry = chain.fetch_utxo_entry(&cb1.tx_id()).unwrap().expect("live");
    assert_eq!(entry.order(), 3);
}

// ---------------------------------------------------------------------------
// S3/S4: coinbase spend and disconnect via the recorded journal
// ---------------------------------------------------------------------------

#[test]
fn coinbase_spend_and_journal() {
    let (_dir, mut chain) = temp_chain();
    let t1 = coinbase(50, 1);
    let t2 = spend(&t1, 0, &[25, 25]);

    chain.process_block(block(0, &[], vec![])).unwrap();
    chain
        .process_block(block(1, &[id(0)], vec![t1.clone()]))
        .unwrap();
    chain
        .process_block(block(2, &[id(1)], vec![coinbase(50, 2), t2.clone()]))
        .unwrap();

    // T1 fully spent and pruned from the store.
    assert!(chain.fetch_utxo_entry(&t1.tx_id()).unwrap().is_none());
    let entry = chain.fetch_utxo_entry(&t2.tx_id()).unwrap().expect("live");
    assert_eq!(entry.unspent_indices(), vec![0, 1]);

    // Journal for the spending block holds exactly one record.
    let journal_bytes = chain
        .store()
        .journal_store()
        .get_journal(&id(2))
        .unwrap()
        .expect("journal stored");
    let records = deserialize_journal(&journal_bytes).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, 50);
    assert!(records[0].tx_fully_spent);
}

#[test]
fn reorg_disconnect_restores_spent_entry() {
    let (_dir, mut chain) = temp_chain();
    let t1 = coinbase(50, 1);
    let t2 = spend(&t1, 0, &[25, 25]);

    chain.process_block(block(0, &[], vec![])).unwrap();
    chain
        .process_block(block(1, &[id(0)], vec![t1.clone()]))
        .unwrap();
    // B5 spends T1; a lexicographically-smaller sibling will later displace
    // it in the order.
    chain
        .process_block(block(5, &[id(1)], vec![coinbase(50, 5), t2.clone()]))
        .unwrap();
    assert!(chain.fetch_utxo_entry(&t1.tx_id()).unwrap().is_none());

    // Sideways sibling B2 sorts before B5: B5 is disconnected (restoring
    // T1) and reconnected at its new order.
    chain
        .process_block(block(2, &[id(1)], vec![coinbase(50, 9)]))
        .unwrap();

    // T1 is spent again after reconnection, and T2 is live at B5's new
    // order.
    assert!(chain.fetch_utxo_entry(&t1.tx_id()).unwrap().is_none());
    let entry = chain.fetch_utxo_entry(&t2.tx_id()).unwrap().expect("live");
    assert_eq!(i64::from(entry.order()), chain.dag().order_of(&id(5)));
    assert_eq!(entry.unspent_indices(), vec![0, 1]);
}

#[test]
fn journal_removed_for_disconnected_blocks() {
    let (_dir, mut chain) = temp_chain();
    chain.process_block(block(0, &[], vec![])).unwrap();
    chain.process_block(block(1, &[id(0)], vec![])).unwrap();
    chain
        .process_block(block(5, &[id(1)], vec![coinbase(50, 5)]))
        .unwrap();
    let old_order = chain.dag().order_of(&id(5));

    chain.process_block(block(2, &[id(1)], vec![])).unwrap();
    // B5 was re-ordered; its journal was rewritten at the new position.
    assert_ne!(chain.dag().order_of(&id(5)), old_order);
    assert!(chain
        .store()
        .journal_store()
        .get_journal(&id(5))
        .unwrap()
        .is_some());
    assert_eq!(chain.best_block().unwrap(), chain.dag().last_block());
}

// ---------------------------------------------------------------------------
// In-flight references within one block
// ---------------------------------------------------------------------------

#[test]
fn in_flight_chain_within_block() {
    let (_dir, mut chain) = temp_chain();
    let cb = coinbase(50, 1);
    let t2 = spend(&cb, 0, &[30, 20]);
    let t3 = spend(&t2, 1, &[20]);

    chain.process_block(block(0, &[], vec![])).unwrap();
    chain
        .process_block(block(1, &[id(0)], vec![cb.clone(), t2.clone(), t3.clone()]))
        .unwrap();

    assert!(chain.fetch_utxo_entry(&cb.tx_id()).unwrap().is_none());
    let t2_entry = chain.fetch_utxo_entry(&t2.tx_id()).unwrap().expect("live");
    assert_eq!(t2_entry.unspent_indices(), vec![0]);
    let t3_entry = chain.fetch_utxo_entry(&t3.tx_id()).unwrap().expect("live");
    assert_eq!(t3_entry.unspent_indices(), vec![0]);
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[test]
fn fetch_utxo_view_holds_inputs_and_self() {
    let (_dir, mut chain) = temp_chain();
    let t1 = coinbase(50, 1);
    chain.process_block(block(0, &[], vec![])).unwrap();
    chain
        .process_block(block(1, &[id(0)], vec![t1.clone()]))
        .unwrap();

    let spender = spend(&t1, 0, &[50]);
    let view = chain.fetch_utxo_view(&spender).unwrap();
    assert!(view.lookup_entry(&t1.tx_id()).is_some());
    // the spender itself has no entry yet
    assert!(view.lookup_entry(&spender.tx_id()).is_none());
    assert_eq!(view.best(), chain.dag().last_block().unwrap());
}

#[test]
fn graph_state_reflects_tips() {
    let (_dir, mut chain) = temp_chain();
    chain.process_block(block(0, &[], vec![])).unwrap();
    chain.process_block(block(1, &[id(0)], vec![])).unwrap();
    chain.process_block(block(2, &[id(1)], vec![])).unwrap();
    chain.process_block(block(3, &[id(1)], vec![])).unwrap();

    let state = chain.graph_state();
    assert_eq!(state.genesis, id(0));
    assert_eq!(state.total, 4);
    let mut tips: Vec<BlockId> = state.tips.iter().map(|t| t.id).collect();
    tips.sort();
    assert_eq!(tips, vec![id(2), id(3)]);
    assert_eq!(state.max_past_count(), 2);
}

#[test]
fn peer_fault_errors_are_classified() {
    let (_dir, mut chain) = temp_chain();
    chain.process_block(block(0, &[], vec![])).unwrap();
    let err = chain.process_block(block(0, &[], vec![])).unwrap_err();
    assert!(err.is_peer_fault());
    assert!(!err.is_fatal());

    let err = chain
        .process_block(block(7, &[id(9)], vec![]))
        .unwrap_err();
    assert!(err.is_peer_fault());
}
