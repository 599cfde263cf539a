//! Genesis + journal settings read from the merged config tree.
//!
//! ```yaml
//! genesis:
//!   admin: "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"
//!   max_supply: 1000000000          # integer, or decimal string for > u64
//!   stake_lock_period: 1440         # blocks
//!   null_principal: "SP000000000000000000002Q6VF78"   # optional
//! journal:
//!   path: "var/ledger.jsonl"        # optional; no journal when absent
//!   hash_chain: true                # optional, default true
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use npt_ledger::{Amount, BlockHeight, GenesisConfig, Principal, TokenLedger};
use serde_json::Value;

/// Where (and how) the host journals operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalSettings {
    pub path: Option<PathBuf>,
    pub hash_chain: bool,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            path: None,
            hash_chain: true,
        }
    }
}

/// Everything a host needs to boot a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub genesis: GenesisConfig,
    pub journal: JournalSettings,
}

impl LedgerSettings {
    pub fn from_config_json(v: &Value) -> Result<Self> {
        let admin = required_str(v, "/genesis/admin")?;
        let max_supply = read_amount(v, "/genesis/max_supply")?;
        let stake_lock_period = read_height(v, "/genesis/stake_lock_period")?;

        let mut genesis = GenesisConfig::new(admin, max_supply, stake_lock_period);
        if let Some(null) = optional_str(v, "/genesis/null_principal")? {
            genesis = genesis.with_null_principal(Principal::new(null));
        }

        let path = optional_str(v, "/journal/path")?.map(PathBuf::from);
        let hash_chain = match v.pointer("/journal/hash_chain") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => *b,
            Some(other) => bail!("CONFIG_INVALID_VALUE /journal/hash_chain: expected bool, got {other}"),
        };

        Ok(Self {
            genesis,
            journal: JournalSettings { path, hash_chain },
        })
    }

    /// Construct the genesis ledger these settings describe.
    pub fn build_ledger(&self) -> Result<TokenLedger> {
        TokenLedger::new(self.genesis.clone())
            .map_err(|e| anyhow!("CONFIG_INVALID_GENESIS: {e}"))
    }
}

fn required_str<'a>(v: &'a Value, ptr: &str) -> Result<&'a str> {
    optional_str(v, ptr)?.with_context(|| format!("CONFIG_MISSING_KEY {ptr}"))
}

fn optional_str<'a>(v: &'a Value, ptr: &str) -> Result<Option<&'a str>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim())),
        Some(Value::String(_)) => bail!("CONFIG_INVALID_VALUE {ptr}: must not be empty"),
        Some(other) => bail!("CONFIG_INVALID_VALUE {ptr}: expected string, got {other}"),
    }
}

/// Amounts may exceed u64, which JSON numbers cannot carry losslessly, so a
/// decimal string (underscores allowed) is accepted as well.
fn read_amount(v: &Value, ptr: &str) -> Result<Amount> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => bail!("CONFIG_MISSING_KEY {ptr}"),
        Some(Value::Number(n)) => n.as_u64().map(Amount::from).with_context(|| {
            format!("CONFIG_INVALID_VALUE {ptr}: {n} is not a non-negative integer (quote values above u64)")
        }),
        Some(Value::String(s)) => {
            let digits: String = s.trim().chars().filter(|c| *c != '_').collect();
            digits
                .parse::<Amount>()
                .with_context(|| format!("CONFIG_INVALID_VALUE {ptr}: {s:?} is not an amount"))
        }
        Some(other) => bail!("CONFIG_INVALID_VALUE {ptr}: expected integer, got {other}"),
    }
}

fn read_height(v: &Value, ptr: &str) -> Result<BlockHeight> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => bail!("CONFIG_MISSING_KEY {ptr}"),
        Some(Value::Number(n)) => n
            .as_u64()
            .with_context(|| format!("CONFIG_INVALID_VALUE {ptr}: {n} is not a block count")),
        Some(other) => bail!("CONFIG_INVALID_VALUE {ptr}: expected integer, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amount_accepts_number_and_string() {
        let v = json!({"a": 7, "b": "340_282_366_920_938_463_463_374_607_431_768_211_455"});
        assert_eq!(read_amount(&v, "/a").unwrap(), 7);
        assert_eq!(read_amount(&v, "/b").unwrap(), u128::MAX);
    }

    #[test]
    fn negative_or_fractional_amount_rejected() {
        let v = json!({"neg": -1, "frac": 1.5});
        assert!(read_amount(&v, "/neg").is_err());
        assert!(read_amount(&v, "/frac").is_err());
    }

    #[test]
    fn blank_admin_is_invalid_not_missing() {
        let v = json!({"genesis": {"admin": "  "}});
        let err = required_str(&v, "/genesis/admin").unwrap_err().to_string();
        assert!(err.starts_with("CONFIG_INVALID_VALUE"), "{err}");
    }
}
