//! Scenario: serialized shape of operations and snapshots
//!
//! The host journal stores `LedgerOp` and `LedgerSnapshot` as JSON. These
//! tests pin the external shape so recorded journals stay readable.

use npt_ledger::{GenesisConfig, LedgerOp, LedgerSnapshot, Principal, TokenLedger};
use serde_json::json;

#[test]
fn ops_serialize_externally_tagged_snake_case() {
    let op = LedgerOp::TransferFrom {
        owner: Principal::new("A"),
        recipient: Principal::new("C"),
        amount: 25,
    };
    let v = serde_json::to_value(&op).unwrap();
    assert_eq!(
        v,
        json!({"transfer_from": {"owner": "A", "recipient": "C", "amount": 25}})
    );

    let back: LedgerOp = serde_json::from_value(v).unwrap();
    assert_eq!(back, op);
}

#[test]
fn clearing_delegate_serializes_as_null() {
    let v = serde_json::to_value(LedgerOp::SetDelegateAdmin { delegate: None }).unwrap();
    assert_eq!(v, json!({"set_delegate_admin": {"delegate": null}}));
}

#[test]
fn snapshot_survives_json() {
    let admin = Principal::new("ADMIN");
    let mut l = TokenLedger::new(GenesisConfig::new("ADMIN", 1_000, 10)).unwrap();
    l.mint(&admin, &Principal::new("A"), 300).unwrap();
    l.approve(&Principal::new("A"), &Principal::new("B"), 40).unwrap();
    l.stake(&Principal::new("A"), 100, 7).unwrap();

    let snap = l.snapshot();
    let text = serde_json::to_string(&snap).unwrap();
    let back: LedgerSnapshot = serde_json::from_str(&text).unwrap();

    assert_eq!(back, snap);
    assert_eq!(back.stake_timestamps.get(&Principal::new("A")), Some(&7));
}
