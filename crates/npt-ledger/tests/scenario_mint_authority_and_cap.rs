//! Scenario: mint authority and the supply cap
//!
//! # Invariants under test
//!
//! 1. The admin can mint; balance and total supply move together.
//! 2. A caller that is neither admin nor delegate gets code 100.
//! 3. Minting past the cap gets code 103 and leaves the state untouched.
//! 4. A delegate admin shares mint authority once set.
//! 5. Minting to the null principal gets code 105.

use npt_ledger::{codes, GenesisConfig, LedgerError, Principal, TokenLedger};

const ADMIN: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";
const MAX_SUPPLY: u128 = 1_000_000_000;
const LOCK: u64 = 1_440;

fn ledger() -> TokenLedger {
    TokenLedger::new(GenesisConfig::new(ADMIN, MAX_SUPPLY, LOCK)).unwrap()
}

fn p(s: &str) -> Principal {
    Principal::new(s)
}

#[test]
fn admin_mint_credits_recipient_and_supply() {
    let mut l = ledger();
    l.mint(&p(ADMIN), &p("ST2CY5"), 1_000).unwrap();

    assert_eq!(l.balance_of(&p("ST2CY5")), 1_000);
    assert_eq!(l.total_supply(), 1_000);
    assert!(l.verify_integrity());
}

#[test]
fn non_admin_mint_is_unauthorized() {
    let mut l = ledger();
    let err = l.mint(&p("ST2CY5"), &p("ST3NB"), 1_000).unwrap_err();

    assert_eq!(err.code(), codes::NOT_AUTHORIZED);
    assert_eq!(l.total_supply(), 0);
}

#[test]
fn mint_over_max_supply_rejected_without_side_effects() {
    let mut l = ledger();
    let before = l.snapshot();

    let err = l.mint(&p(ADMIN), &p("ST2CY5"), 2_000_000_000).unwrap_err();

    assert_eq!(err.code(), codes::MAX_SUPPLY_EXCEEDED);
    assert_eq!(
        err,
        LedgerError::MaxSupplyExceeded {
            max: MAX_SUPPLY,
            would_have: 2_000_000_000
        }
    );
    assert_eq!(l.snapshot(), before, "rejected mint must not mutate state");
}

#[test]
fn cap_counts_staked_tokens_as_outstanding() {
    let mut l = ledger();
    l.mint(&p(ADMIN), &p("A"), MAX_SUPPLY).unwrap();
    l.stake(&p("A"), MAX_SUPPLY / 2, 1).unwrap();

    let err = l.mint(&p(ADMIN), &p("B"), 1).unwrap_err();
    assert_eq!(err.code(), codes::MAX_SUPPLY_EXCEEDED);
}

#[test]
fn delegate_admin_can_mint() {
    let mut l = ledger();
    l.set_delegate_admin(&p(ADMIN), Some(p("ST3NB"))).unwrap();

    l.mint(&p("ST3NB"), &p("ST2CY5"), 1_000).unwrap();
    assert_eq!(l.balance_of(&p("ST2CY5")), 1_000);
}

#[test]
fn replaced_delegate_loses_authority() {
    let mut l = ledger();
    l.set_delegate_admin(&p(ADMIN), Some(p("OLD"))).unwrap();
    l.set_delegate_admin(&p(ADMIN), Some(p("NEW"))).unwrap();

    assert_eq!(
        l.mint(&p("OLD"), &p("A"), 1).unwrap_err().code(),
        codes::NOT_AUTHORIZED
    );
    l.mint(&p("NEW"), &p("A"), 1).unwrap();
}

#[test]
fn mint_to_null_principal_rejected() {
    let mut l = ledger();
    let err = l.mint(&p(ADMIN), &Principal::null(), 10).unwrap_err();
    assert_eq!(err.code(), codes::NULL_PRINCIPAL);
    assert_eq!(l.total_supply(), 0);
}
