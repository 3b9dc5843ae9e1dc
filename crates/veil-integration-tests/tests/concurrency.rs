//! # Concurrency
//!
//! Racing writers against shared stores: at most one copy of a transaction
//! is stored, at most one cancellation wins, and independent transfers do
//! not interfere.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use veil_core::{ErrorCode, Family, ManualClock, Timestamp, VeilError};
use veil_crypto::{Ed25519KeyPair, ElGamalKeypair};
use veil_flow::{FlowConfig, FlowStores, TransactionFlow};
use veil_ledger::{LedgerStore, NotaryStore};
use veil_store::{KvStore, MemoryKv, SledKv};
use veil_zkp::RangeProofBackend;

const THREADS: usize = 8;

fn flow_over(ledger: Arc<dyn KvStore>, notary: Arc<dyn KvStore>) -> TransactionFlow {
    let clock = Arc::new(ManualClock::new(Timestamp::from_epoch_secs(1_700_000_000).unwrap()));
    let config = FlowConfig {
        range_proof_backend: RangeProofBackend::Emulated,
        ..FlowConfig::default()
    };
    let stores = FlowStores {
        ledger,
        notary,
        compliance: Arc::new(MemoryKv::new()),
    };
    TransactionFlow::new(config, stores, *ElGamalKeypair::generate().public_key(), clock).unwrap()
}

#[test]
fn racing_puts_of_one_transaction_store_it_once() {
    let dir = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KvStore> = Arc::new(SledKv::open(dir.path().join("ledger")).unwrap());
    let flow = flow_over(kv.clone(), Arc::new(MemoryKv::new()));
    let created = flow
        .create_transaction(
            &Ed25519KeyPair::from_seed(&[1u8; 32]),
            &Ed25519KeyPair::from_seed(&[2u8; 32]).address(),
            100,
        )
        .unwrap();
    let tx = created.transaction().clone();
    let ledger = LedgerStore::new(kv);

    let stored = AtomicUsize::new(0);
    let duplicates = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| match ledger.put(&tx) {
                Ok(_) => {
                    stored.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    assert_eq!(VeilError::from(e).code(), ErrorCode::DuplicateTransaction);
                    duplicates.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });
    assert_eq!(stored.load(Ordering::SeqCst), 1);
    assert_eq!(duplicates.load(Ordering::SeqCst), THREADS - 1);
    assert_eq!(ledger.list(None).unwrap().len(), 1);
}

#[test]
fn racing_cancels_have_one_winner() {
    let notary_kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let flow = flow_over(Arc::new(MemoryKv::new()), notary_kv.clone());
    let receipt = flow
        .process_transaction(
            &Ed25519KeyPair::from_seed(&[3u8; 32]),
            &Ed25519KeyPair::from_seed(&[4u8; 32]).address(),
            9,
            Some(true),
        )
        .unwrap();
    let tx_id = *receipt.transaction.tx_id();

    let wins = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| match flow.cancel(&tx_id) {
                Ok(_) => {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => assert_eq!(e.code(), ErrorCode::NotFound),
            });
        }
    });
    assert_eq!(wins.load(Ordering::SeqCst), 1);

    let clock = Arc::new(ManualClock::new(Timestamp::from_epoch_secs(1_700_000_000).unwrap()));
    assert!(NotaryStore::new(notary_kv, clock).list(true).unwrap().is_empty());
}

#[test]
fn independent_transfers_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let flow = flow_over(
        Arc::new(SledKv::open(dir.path().join("ledger")).unwrap()),
        Arc::new(SledKv::open(dir.path().join("notary")).unwrap()),
    );
    let recipient = Ed25519KeyPair::from_seed(&[0xee; 32]).address();

    std::thread::scope(|s| {
        for i in 0..THREADS {
            let flow = &flow;
            let recipient = &recipient;
            s.spawn(move || {
                let sender = Ed25519KeyPair::from_seed(&[i as u8 + 10; 32]);
                flow.process_transaction(&sender, recipient, 10, Some(true)).unwrap();
            });
        }
    });

    let family = Family::financial();
    assert_eq!(flow.list_transactions(Some(&family)).unwrap().len(), THREADS);
    assert_eq!(flow.list_notary_records(false).unwrap().len(), THREADS);
    assert_eq!(flow.get_balance(&family, &recipient).unwrap(), 10 * THREADS as i128);
}
