//! Scenario: restart from the journal
//!
//! # Invariants under test
//! - A host opened on an existing journal restores the exact snapshot.
//! - New submissions continue the same chain; the journal still verifies.
//! - A journal from another genesis is refused.
//! - A tampered journal is refused.
//! - `replay` over the same op list is deterministic.

use npt_audit::{verify_hash_chain, VerifyResult};
use npt_config::{JournalSettings, LedgerSettings};
use npt_ledger::{GenesisConfig, LedgerOp, Principal};
use npt_runtime::{replay, replay_journal, LedgerHost};
use std::path::PathBuf;

fn settings(path: PathBuf) -> LedgerSettings {
    LedgerSettings {
        genesis: GenesisConfig::new("ADMIN", 10_000, 50),
        journal: JournalSettings {
            path: Some(path),
            hash_chain: true,
        },
    }
}

fn script() -> Vec<(Principal, LedgerOp)> {
    let admin = Principal::new("ADMIN");
    let a = Principal::new("A");
    let b = Principal::new("B");
    vec![
        (admin.clone(), LedgerOp::Mint { recipient: a.clone(), amount: 1_000 }),
        (a.clone(), LedgerOp::Approve { spender: b.clone(), amount: 300 }),
        (b.clone(), LedgerOp::TransferFrom { owner: a.clone(), recipient: b.clone(), amount: 200 }),
        (a.clone(), LedgerOp::Stake { amount: 400, height: 10 }),
        (a.clone(), LedgerOp::Unstake { amount: 100, height: 20 }),
        (admin.clone(), LedgerOp::SetDelegateAdmin { delegate: Some(b.clone()) }),
        (b.clone(), LedgerOp::Burn { amount: 50 }),
    ]
}

async fn run_script(host: &LedgerHost) {
    for (caller, op) in script() {
        let _ = host.submit(&caller, op).await;
    }
}

#[tokio::test]
async fn reopen_restores_snapshot_and_continues_chain() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = settings(dir.path().join("journal.jsonl"));

    let before = {
        let host = LedgerHost::open(&cfg).unwrap();
        run_script(&host).await;
        host.snapshot().await
    };
    assert_eq!(before.total_supply, 950);
    assert_eq!(before.balance_of(&Principal::new("B")), 150);

    let host = LedgerHost::open(&cfg).unwrap();
    assert_eq!(host.snapshot().await, before);
    assert_eq!(host.submitted().await, 7);

    host.submit(&Principal::new("A"), LedgerOp::Unstake { amount: 300, height: 70 })
        .await
        .unwrap();
    assert_eq!(
        verify_hash_chain(cfg.journal.path.as_ref().unwrap()).unwrap(),
        VerifyResult::Valid { lines: 8 }
    );

    let report = replay_journal(cfg.genesis.clone(), cfg.journal.path.as_ref().unwrap()).unwrap();
    assert_eq!(report.accepted, 7, "unstake at 20 was still locked");
    assert_eq!(report.rejected, 1);
    assert_eq!(report.ledger.snapshot(), host.snapshot().await);
}

#[tokio::test]
async fn journal_from_other_genesis_refused() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = settings(dir.path().join("journal.jsonl"));
    {
        let host = LedgerHost::open(&cfg).unwrap();
        run_script(&host).await;
    }

    let mut other = cfg.clone();
    other.genesis.max_supply = 20_000;
    let err = LedgerHost::open(&other).err().unwrap();
    assert!(format!("{err:#}").contains("JOURNAL_LEDGER_MISMATCH"), "{err:#}");
}

#[tokio::test]
async fn tampered_journal_refused() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = settings(dir.path().join("journal.jsonl"));
    {
        let host = LedgerHost::open(&cfg).unwrap();
        run_script(&host).await;
    }

    let path = cfg.journal.path.clone().unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replacen("\"amount\":1000", "\"amount\":9000", 1)).unwrap();

    let err = LedgerHost::open(&cfg).err().unwrap();
    assert!(format!("{err:#}").contains("JOURNAL_CHAIN_BROKEN line=1"), "{err:#}");
}

#[test]
fn replay_is_deterministic() {
    let genesis = GenesisConfig::new("ADMIN", 10_000, 50);
    let a = replay(genesis.clone(), script()).unwrap();
    let b = replay(genesis, script()).unwrap();

    assert_eq!(a.ledger.snapshot(), b.ledger.snapshot());
    assert_eq!((a.accepted, a.rejected), (6, 1));
}
