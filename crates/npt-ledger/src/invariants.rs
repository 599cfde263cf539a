//! Whole-state invariant audit.
//!
//! Operations keep these invariants by construction; this module re-derives
//! them from the maps so tests and hosts can prove it after the fact.

use crate::{
    ledger::TokenLedger,
    types::{Amount, Principal},
};

/// One broken ledger invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `total_supply != sum(balances) + sum(staked)`.
    SupplyMismatch {
        total_supply: Amount,
        balances: Amount,
        staked: Amount,
    },
    /// `total_supply > max_supply`.
    SupplyAboveCap { total_supply: Amount, max_supply: Amount },
    /// A lock start exists for an account with nothing staked.
    StaleStakeTimestamp { principal: Principal },
    /// An account has a stake but no lock start.
    MissingStakeTimestamp { principal: Principal },
    /// The null principal holds spendable or staked tokens.
    NullPrincipalHolds { amount: Amount },
    /// The null principal is an approved spender.
    NullPrincipalSpender { owner: Principal },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SupplyMismatch {
                total_supply,
                balances,
                staked,
            } => write!(
                f,
                "supply mismatch: total {total_supply} != balances {balances} + staked {staked}"
            ),
            Self::SupplyAboveCap {
                total_supply,
                max_supply,
            } => write!(f, "supply {total_supply} above cap {max_supply}"),
            Self::StaleStakeTimestamp { principal } => {
                write!(f, "stale stake timestamp for {principal}")
            }
            Self::MissingStakeTimestamp { principal } => {
                write!(f, "staked account {principal} has no lock start")
            }
            Self::NullPrincipalHolds { amount } => {
                write!(f, "null principal holds {amount}")
            }
            Self::NullPrincipalSpender { owner } => {
                write!(f, "null principal approved as spender by {owner}")
            }
        }
    }
}

impl TokenLedger {
    /// Recompute every invariant from the raw maps. Empty when healthy.
    ///
    /// O(accounts + allowances); meant for tests, startup checks and audit
    /// flows rather than the per-operation hot path.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut out = Vec::new();

        let balances = saturating_sum(self.balances().values().copied());
        let staked = saturating_sum(self.staked().values().copied());
        let total_supply = self.total_supply();

        if balances.checked_add(staked) != Some(total_supply) {
            out.push(InvariantViolation::SupplyMismatch {
                total_supply,
                balances,
                staked,
            });
        }
        if total_supply > self.max_supply() {
            out.push(InvariantViolation::SupplyAboveCap {
                total_supply,
                max_supply: self.max_supply(),
            });
        }

        for principal in self.stake_timestamps().keys() {
            if self.staked_of(principal) == 0 {
                out.push(InvariantViolation::StaleStakeTimestamp {
                    principal: principal.clone(),
                });
            }
        }
        for (principal, amount) in self.staked() {
            if *amount > 0 && !self.stake_timestamps().contains_key(principal) {
                out.push(InvariantViolation::MissingStakeTimestamp {
                    principal: principal.clone(),
                });
            }
        }

        let null = self.null_principal();
        let null_holds = self.balance_of(null).saturating_add(self.staked_of(null));
        if null_holds > 0 {
            out.push(InvariantViolation::NullPrincipalHolds { amount: null_holds });
        }
        for (owner, spender) in self.allowances().keys() {
            if spender == null {
                out.push(InvariantViolation::NullPrincipalSpender {
                    owner: owner.clone(),
                });
            }
        }

        out
    }

    /// `true` if [`check_invariants`](Self::check_invariants) finds nothing.
    pub fn verify_integrity(&self) -> bool {
        self.check_invariants().is_empty()
    }
}

fn saturating_sum(values: impl Iterator<Item = Amount>) -> Amount {
    values.fold(0, Amount::saturating_add)
}

#[cfg(test)]
mod tests {
    use crate::{GenesisConfig, Principal, TokenLedger};

    #[test]
    fn fresh_ledger_is_consistent() {
        let l = TokenLedger::new(GenesisConfig::new("ADMIN", 100, 10)).unwrap();
        assert!(l.verify_integrity());
    }

    #[test]
    fn staking_keeps_supply_accounted() {
        let admin = Principal::new("ADMIN");
        let a = Principal::new("A");
        let mut l = TokenLedger::new(GenesisConfig::new("ADMIN", 100, 10)).unwrap();
        l.mint(&admin, &a, 60).unwrap();
        l.stake(&a, 25, 3).unwrap();
        assert!(l.check_invariants().is_empty());
        l.unstake(&a, 10, 13).unwrap();
        assert!(l.verify_integrity());
    }
}
