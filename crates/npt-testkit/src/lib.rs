//! Shared fixtures for ledger scenario tests.

use std::path::PathBuf;

use anyhow::{bail, Result};
use npt_config::{load_layered_yaml_from_strings, LedgerSettings};
use npt_ledger::{
    Amount, GenesisConfig, LedgerSnapshot, Principal, TokenLedger, DEFAULT_NULL_PRINCIPAL,
};
use tempfile::TempDir;

/// Max supply used by the reference deployment.
pub const DEFAULT_MAX_SUPPLY: Amount = 1_000_000_000;
/// Lock period used by the reference deployment (blocks).
pub const DEFAULT_LOCK_PERIOD: u64 = 1440;

pub const ADMIN: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";
pub const ALICE: &str = "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5";
pub const BOB: &str = "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG";
pub const CAROL: &str = "ST2JHG361ZXG51QTKY2NQCVBPPRRE2KZB1HR05NNC";

pub fn admin() -> Principal {
    Principal::new(ADMIN)
}

pub fn alice() -> Principal {
    Principal::new(ALICE)
}

pub fn bob() -> Principal {
    Principal::new(BOB)
}

pub fn carol() -> Principal {
    Principal::new(CAROL)
}

pub fn null_principal() -> Principal {
    Principal::new(DEFAULT_NULL_PRINCIPAL)
}

pub fn default_genesis() -> GenesisConfig {
    GenesisConfig::new(admin(), DEFAULT_MAX_SUPPLY, DEFAULT_LOCK_PERIOD)
}

pub fn fresh_ledger() -> TokenLedger {
    TokenLedger::new(default_genesis()).expect("default genesis is valid")
}

/// Fresh ledger with each `(holder, amount)` minted by the admin.
pub fn funded_ledger(holders: &[(Principal, Amount)]) -> TokenLedger {
    let mut ledger = fresh_ledger();
    for (holder, amount) in holders {
        ledger
            .mint(&admin(), holder, *amount)
            .expect("fixture mint must succeed");
    }
    ledger
}

/// Panics with every violation listed if the ledger is inconsistent.
pub fn assert_invariants(ledger: &TokenLedger) {
    let violations = ledger.check_invariants();
    assert!(
        violations.is_empty(),
        "ledger invariants violated:\n{}",
        violations
            .iter()
            .map(|v| format!("  - {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Snapshot diff helper: every account whose spendable balance differs.
pub fn balance_changes(before: &LedgerSnapshot, after: &LedgerSnapshot) -> Vec<(Principal, Amount, Amount)> {
    let mut who: Vec<&Principal> = before.balances.keys().chain(after.balances.keys()).collect();
    who.sort();
    who.dedup();
    who.into_iter()
        .filter_map(|p| {
            let (b, a) = (before.balance_of(p), after.balance_of(p));
            (b != a).then(|| (p.clone(), b, a))
        })
        .collect()
}

/// Temp dir holding a journal path; the dir is removed on drop.
pub struct TempJournal {
    pub dir: TempDir,
    pub path: PathBuf,
}

pub fn temp_journal() -> Result<TempJournal> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ledger.jsonl");
    Ok(TempJournal { dir, path })
}

/// Reference deployment config as YAML, journaling to `journal_path`.
pub fn reference_yaml(journal_path: &std::path::Path) -> String {
    format!(
        "genesis:\n  admin: \"{ADMIN}\"\n  max_supply: {DEFAULT_MAX_SUPPLY}\n  stake_lock_period: {DEFAULT_LOCK_PERIOD}\njournal:\n  path: {}\n",
        serde_json::Value::String(journal_path.display().to_string())
    )
}

/// Load `reference_yaml` plus any overlays into ledger settings.
pub fn reference_settings(journal_path: &std::path::Path, overlays: &[&str]) -> Result<LedgerSettings> {
    let base = reference_yaml(journal_path);
    let mut docs = vec![base.as_str()];
    docs.extend_from_slice(overlays);
    let loaded = load_layered_yaml_from_strings(&docs)?;
    let settings = loaded.ledger_settings()?;
    if settings.journal.path.is_none() {
        bail!("reference settings must journal");
    }
    Ok(settings)
}

/// Install a test-writer tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_principals_are_distinct_and_not_null() {
        let all = [admin(), alice(), bob(), carol()];
        for (i, p) in all.iter().enumerate() {
            assert_ne!(*p, null_principal());
            for q in &all[i + 1..] {
                assert_ne!(p, q);
            }
        }
    }

    #[test]
    fn balance_changes_lists_only_moved_accounts() {
        let mut l = funded_ledger(&[(alice(), 100), (bob(), 5)]);
        let before = l.snapshot();
        l.transfer(&alice(), &carol(), 40).unwrap();
        let after = l.snapshot();

        assert_eq!(
            balance_changes(&before, &after),
            {
                let mut v = vec![(alice(), 100, 60), (carol(), 0, 40)];
                v.sort();
                v
            }
        );
    }

    #[test]
    fn reference_settings_round_trip_path() {
        let j = temp_journal().unwrap();
        let s = reference_settings(&j.path, &[]).unwrap();
        assert_eq!(s.journal.path.as_deref(), Some(j.path.as_path()));
        assert_eq!(s.genesis, default_genesis());
    }
}
