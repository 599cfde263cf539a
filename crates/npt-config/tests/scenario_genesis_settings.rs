//! Scenario: genesis settings from layered YAML files
//!
//! GREEN when:
//! - A base + overlay pair on disk yields the expected GenesisConfig.
//! - Max supply above u64 is accepted as a quoted decimal.
//! - Missing required keys fail with CONFIG_MISSING_KEY.
//! - A null admin fails with CONFIG_INVALID_GENESIS at ledger construction.

use std::fs;

use npt_config::{load_layered_yaml, load_layered_yaml_from_strings, LedgerSettings};
use npt_ledger::{Principal, DEFAULT_NULL_PRINCIPAL};

const BASE: &str = r#"
genesis:
  admin: "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"
  max_supply: 1000000000
  stake_lock_period: 1440
"#;

#[test]
fn layered_files_build_genesis() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("devnet.yaml");
    fs::write(&base, BASE).unwrap();
    fs::write(&overlay, "genesis:\n  stake_lock_period: 3\njournal:\n  path: \"j.jsonl\"\n").unwrap();

    let loaded = load_layered_yaml(&[
        base.to_str().unwrap(),
        overlay.to_str().unwrap(),
    ])
    .unwrap();
    let settings = loaded.ledger_settings().unwrap();

    assert_eq!(
        settings.genesis.admin,
        Principal::new("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM")
    );
    assert_eq!(settings.genesis.max_supply, 1_000_000_000);
    assert_eq!(settings.genesis.stake_lock_period, 3);
    assert_eq!(settings.genesis.null_principal.as_str(), DEFAULT_NULL_PRINCIPAL);
    assert_eq!(settings.journal.path.as_deref(), Some(std::path::Path::new("j.jsonl")));
    assert!(settings.journal.hash_chain, "hash chain defaults on");

    let ledger = settings.build_ledger().unwrap();
    assert_eq!(ledger.max_supply(), 1_000_000_000);
    assert_eq!(ledger.stake_lock_period(), 3);
}

#[test]
fn missing_file_reports_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}

#[test]
fn quoted_supply_above_u64() {
    let overlay = "genesis:\n  max_supply: \"100_000_000_000_000_000_000\"\n";
    let loaded = load_layered_yaml_from_strings(&[BASE, overlay]).unwrap();
    let settings = loaded.ledger_settings().unwrap();
    assert_eq!(settings.genesis.max_supply, 100_000_000_000_000_000_000u128);
}

#[test]
fn missing_lock_period_is_reported() {
    let yaml = "genesis:\n  admin: \"A\"\n  max_supply: 5\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let err = LedgerSettings::from_config_json(&loaded.config_json).unwrap_err();
    assert_eq!(err.to_string(), "CONFIG_MISSING_KEY /genesis/stake_lock_period");
}

#[test]
fn null_admin_rejected_at_build() {
    let yaml = "genesis:\n  admin: \"BURN\"\n  null_principal: \"BURN\"\n  max_supply: 5\n  stake_lock_period: 1\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let settings = loaded.ledger_settings().unwrap();

    let err = settings.build_ledger().unwrap_err();
    assert!(err.to_string().starts_with("CONFIG_INVALID_GENESIS"), "{err}");
}

#[test]
fn journal_can_disable_hash_chain() {
    let overlay = "journal:\n  hash_chain: false\n";
    let loaded = load_layered_yaml_from_strings(&[BASE, overlay]).unwrap();
    let settings = loaded.ledger_settings().unwrap();
    assert!(!settings.journal.hash_chain);
    assert!(settings.journal.path.is_none());
}
