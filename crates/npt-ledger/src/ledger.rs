//! Token ledger state machine.
//!
//! # Purpose
//! [`TokenLedger`] owns every balance, allowance and stake position, plus the
//! admin/pause controls. Each public operation is one atomic transition:
//!
//! 1. Preconditions run in the documented order; the first failure is
//!    returned and nothing is written.
//! 2. Every post-state value is computed before the first write.
//! 3. The writes are applied.
//!
//! # Usage
//! ```ignore
//! let mut ledger = TokenLedger::new(GenesisConfig::new("ADMIN", 1_000_000_000, 1_440))?;
//! ledger.mint(&admin, &alice, 500)?;
//! ledger.stake(&alice, 200, 10_000)?;
//! ledger.unstake(&alice, 200, 11_440)?;
//! ```
//!
//! # Determinism
//! No IO, no clock, no randomness. Block height is an explicit argument of
//! `stake` and `unstake`. Maps are `BTreeMap`s so snapshots iterate in a
//! stable order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{GenesisError, LedgerError, LedgerResult},
    types::{Amount, BlockHeight, GenesisConfig, LedgerOp, Outcome, Principal},
};

// ---------------------------------------------------------------------------
// Snapshot (read-only view)
// ---------------------------------------------------------------------------

/// One approved (owner, spender) budget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceEntry {
    pub owner: Principal,
    pub spender: Principal,
    pub amount: Amount,
}

/// A point-in-time copy of the total ledger state.
///
/// Zero-valued balances, stakes and allowances are never present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub admin: Principal,
    pub delegate_admin: Option<Principal>,
    pub paused: bool,
    pub total_supply: Amount,
    pub max_supply: Amount,
    pub stake_lock_period: BlockHeight,
    pub null_principal: Principal,
    pub balances: BTreeMap<Principal, Amount>,
    pub staked: BTreeMap<Principal, Amount>,
    pub allowances: Vec<AllowanceEntry>,
    pub stake_timestamps: BTreeMap<Principal, BlockHeight>,
}

impl LedgerSnapshot {
    pub fn balance_of(&self, who: &Principal) -> Amount {
        self.balances.get(who).copied().unwrap_or(0)
    }

    pub fn staked_of(&self, who: &Principal) -> Amount {
        self.staked.get(who).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The ledger's total state. Created once at genesis and owned by its host.
#[derive(Clone, Debug)]
pub struct TokenLedger {
    genesis: GenesisConfig,
    delegate_admin: Option<Principal>,
    paused: bool,
    total_supply: Amount,
    balances: BTreeMap<Principal, Amount>,
    staked: BTreeMap<Principal, Amount>,
    allowances: BTreeMap<(Principal, Principal), Amount>,
    stake_timestamps: BTreeMap<Principal, BlockHeight>,
}

impl TokenLedger {
    /// Build the genesis state: no delegate, unpaused, zero supply, empty maps.
    ///
    /// # Errors
    /// Rejects empty principals and an admin equal to the null principal.
    pub fn new(genesis: GenesisConfig) -> Result<Self, GenesisError> {
        if genesis.admin.as_str().trim().is_empty() {
            return Err(GenesisError::EmptyPrincipal { field: "admin" });
        }
        if genesis.null_principal.as_str().trim().is_empty() {
            return Err(GenesisError::EmptyPrincipal {
                field: "null_principal",
            });
        }
        if genesis.admin == genesis.null_principal {
            return Err(GenesisError::AdminIsNullPrincipal);
        }
        Ok(Self {
            genesis,
            delegate_admin: None,
            paused: false,
            total_supply: 0,
            balances: BTreeMap::new(),
            staked: BTreeMap::new(),
            allowances: BTreeMap::new(),
            stake_timestamps: BTreeMap::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    /// `true` iff `caller` is the admin or the currently set delegate admin.
    pub fn is_authorized(&self, caller: &Principal) -> bool {
        *caller == self.genesis.admin || self.delegate_admin.as_ref() == Some(caller)
    }

    // -----------------------------------------------------------------------
    // Write surface
    // -----------------------------------------------------------------------

    /// Flip the global pause flag. Returns the new flag.
    ///
    /// Checks: authorized (100).
    pub fn set_paused(&mut self, caller: &Principal, paused: bool) -> LedgerResult<bool> {
        self.require_authorized(caller)?;
        self.paused = paused;
        Ok(paused)
    }

    /// Replace (or clear, with `None`) the delegate admin.
    ///
    /// Checks: caller is the admin (100), delegate is not the null principal (105).
    /// The delegate itself cannot reassign the delegate slot.
    pub fn set_delegate_admin(
        &mut self,
        caller: &Principal,
        delegate: Option<Principal>,
    ) -> LedgerResult<()> {
        if *caller != self.genesis.admin {
            return Err(LedgerError::Unauthorized {
                caller: caller.clone(),
            });
        }
        if let Some(d) = &delegate {
            self.require_not_null(d)?;
        }
        self.delegate_admin = delegate;
        Ok(())
    }

    /// Issue new tokens to `recipient`.
    ///
    /// Checks: authorized (100), amount > 0 (107), recipient not null (105),
    /// supply + amount <= max supply (103). Mint ignores the pause flag.
    pub fn mint(
        &mut self,
        caller: &Principal,
        recipient: &Principal,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.require_authorized(caller)?;
        require_nonzero(amount)?;
        self.require_not_null(recipient)?;

        let max = self.genesis.max_supply;
        let new_supply = match self.total_supply.checked_add(amount) {
            Some(s) if s <= max => s,
            _ => {
                return Err(LedgerError::MaxSupplyExceeded {
                    max,
                    would_have: self.total_supply.saturating_add(amount),
                })
            }
        };
        let new_balance = credit(self.balance_of(recipient), amount);

        self.total_supply = new_supply;
        put(&mut self.balances, recipient.clone(), new_balance);
        Ok(())
    }

    /// Destroy `amount` of the caller's spendable balance.
    ///
    /// Checks: not paused (104), amount > 0 (107), balance >= amount (101).
    pub fn burn(&mut self, caller: &Principal, amount: Amount) -> LedgerResult<()> {
        self.require_not_paused()?;
        require_nonzero(amount)?;
        let new_balance = debit_balance(self.balance_of(caller), amount)?;
        let new_supply = debit_corrupt(self.total_supply, amount, "total_supply");

        put(&mut self.balances, caller.clone(), new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Move `amount` from the caller to `recipient`.
    ///
    /// Checks: not paused (104), amount > 0 (107), recipient not null (105),
    /// balance >= amount (101).
    pub fn transfer(
        &mut self,
        caller: &Principal,
        recipient: &Principal,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.require_not_paused()?;
        require_nonzero(amount)?;
        self.require_not_null(recipient)?;
        let sender_after = debit_balance(self.balance_of(caller), amount)?;

        self.move_balance(caller, recipient, sender_after, amount);
        Ok(())
    }

    /// Set the caller's allowance for `spender` to exactly `amount`.
    ///
    /// Overwrites any prior allowance. Checks: not paused (104),
    /// spender not null (105), amount > 0 (107).
    pub fn approve(
        &mut self,
        caller: &Principal,
        spender: &Principal,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.require_not_paused()?;
        self.require_not_null(spender)?;
        require_nonzero(amount)?;

        self.allowances
            .insert((caller.clone(), spender.clone()), amount);
        Ok(())
    }

    /// Spend `amount` of `owner`'s balance on `recipient`, consuming the
    /// allowance `owner` granted to the caller.
    ///
    /// Checks: not paused (104), recipient not null (105), amount > 0 (107),
    /// allowance >= amount (100), owner balance >= amount (101).
    pub fn transfer_from(
        &mut self,
        caller: &Principal,
        owner: &Principal,
        recipient: &Principal,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.require_not_paused()?;
        self.require_not_null(recipient)?;
        require_nonzero(amount)?;

        let key = (owner.clone(), caller.clone());
        let allowance = self.allowances.get(&key).copied().unwrap_or(0);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                have: allowance,
                need: amount,
            });
        }
        let owner_after = debit_balance(self.balance_of(owner), amount)?;

        put(&mut self.allowances, key, allowance - amount);
        self.move_balance(owner, recipient, owner_after, amount);
        Ok(())
    }

    /// Lock `amount` of the caller's balance in the staking pool.
    ///
    /// Checks: not paused (104), amount > 0 (107), balance >= amount (101).
    /// The lock clock restarts at `height` for the account's entire stake.
    pub fn stake(
        &mut self,
        caller: &Principal,
        amount: Amount,
        height: BlockHeight,
    ) -> LedgerResult<()> {
        self.require_not_paused()?;
        require_nonzero(amount)?;
        let balance_after = debit_balance(self.balance_of(caller), amount)?;
        let staked_after = credit(self.staked_of(caller), amount);

        put(&mut self.balances, caller.clone(), balance_after);
        put(&mut self.staked, caller.clone(), staked_after);
        self.stake_timestamps.insert(caller.clone(), height);
        Ok(())
    }

    /// Release `amount` of the caller's stake back to its spendable balance.
    ///
    /// Checks: not paused (104), amount > 0 (107), staked >= amount (102),
    /// `height - lock_start >= stake_lock_period` (106). A partial unstake
    /// keeps the lock start; a full unstake deletes it.
    pub fn unstake(
        &mut self,
        caller: &Principal,
        amount: Amount,
        height: BlockHeight,
    ) -> LedgerResult<()> {
        self.require_not_paused()?;
        require_nonzero(amount)?;

        let staked = self.staked_of(caller);
        if staked < amount {
            return Err(LedgerError::InsufficientStake {
                have: staked,
                need: amount,
            });
        }

        let lock_start = match self.stake_timestamps.get(caller) {
            Some(start) => *start,
            None => corrupted("staked account without a lock start"),
        };
        let lock = self.genesis.stake_lock_period;
        // A height before the lock start counts as "not elapsed".
        let elapsed_ok = height
            .checked_sub(lock_start)
            .is_some_and(|elapsed| elapsed >= lock);
        if !elapsed_ok {
            return Err(LedgerError::StakeLocked {
                unlock_height: lock_start.saturating_add(lock),
                current_height: height,
            });
        }

        let staked_after = staked - amount;
        let balance_after = credit(self.balance_of(caller), amount);

        put(&mut self.staked, caller.clone(), staked_after);
        put(&mut self.balances, caller.clone(), balance_after);
        if staked_after == 0 {
            self.stake_timestamps.remove(caller);
        }
        Ok(())
    }

    /// Dispatch a [`LedgerOp`] on behalf of `caller`.
    pub fn apply(&mut self, caller: &Principal, op: &LedgerOp) -> LedgerResult<Outcome> {
        match op {
            LedgerOp::SetPaused { paused } => self
                .set_paused(caller, *paused)
                .map(|value| Outcome { value }),
            LedgerOp::SetDelegateAdmin { delegate } => self
                .set_delegate_admin(caller, delegate.clone())
                .map(|()| Outcome::DONE),
            LedgerOp::Mint { recipient, amount } => {
                self.mint(caller, recipient, *amount).map(|()| Outcome::DONE)
            }
            LedgerOp::Burn { amount } => self.burn(caller, *amount).map(|()| Outcome::DONE),
            LedgerOp::Transfer { recipient, amount } => self
                .transfer(caller, recipient, *amount)
                .map(|()| Outcome::DONE),
            LedgerOp::Approve { spender, amount } => self
                .approve(caller, spender, *amount)
                .map(|()| Outcome::DONE),
            LedgerOp::TransferFrom {
                owner,
                recipient,
                amount,
            } => self
                .transfer_from(caller, owner, recipient, *amount)
                .map(|()| Outcome::DONE),
            LedgerOp::Stake { amount, height } => self
                .stake(caller, *amount, *height)
                .map(|()| Outcome::DONE),
            LedgerOp::Unstake { amount, height } => self
                .unstake(caller, *amount, *height)
                .map(|()| Outcome::DONE),
        }
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    pub fn genesis(&self) -> &GenesisConfig {
        &self.genesis
    }

    pub fn admin(&self) -> &Principal {
        &self.genesis.admin
    }

    pub fn delegate_admin(&self) -> Option<&Principal> {
        self.delegate_admin.as_ref()
    }

    pub fn null_principal(&self) -> &Principal {
        &self.genesis.null_principal
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn max_supply(&self) -> Amount {
        self.genesis.max_supply
    }

    pub fn stake_lock_period(&self) -> BlockHeight {
        self.genesis.stake_lock_period
    }

    /// How much more can be minted before the cap is reached.
    pub fn remaining_mintable(&self) -> Amount {
        self.genesis.max_supply.saturating_sub(self.total_supply)
    }

    /// Spendable balance (0 if unknown).
    pub fn balance_of(&self, who: &Principal) -> Amount {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Staked balance (0 if unknown).
    pub fn staked_of(&self, who: &Principal) -> Amount {
        self.staked.get(who).copied().unwrap_or(0)
    }

    /// Amount `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Principal, spender: &Principal) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Height at which the account's current lock started, if it has a stake.
    pub fn stake_timestamp(&self, who: &Principal) -> Option<BlockHeight> {
        self.stake_timestamps.get(who).copied()
    }

    /// First height at which `unstake` passes the lock check.
    pub fn unlock_height(&self, who: &Principal) -> Option<BlockHeight> {
        self.stake_timestamp(who)
            .map(|start| start.saturating_add(self.genesis.stake_lock_period))
    }

    /// Return a cloned snapshot of the current ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            admin: self.genesis.admin.clone(),
            delegate_admin: self.delegate_admin.clone(),
            paused: self.paused,
            total_supply: self.total_supply,
            max_supply: self.genesis.max_supply,
            stake_lock_period: self.genesis.stake_lock_period,
            null_principal: self.genesis.null_principal.clone(),
            balances: self.balances.clone(),
            staked: self.staked.clone(),
            allowances: self
                .allowances
                .iter()
                .map(|((owner, spender), amount)| AllowanceEntry {
                    owner: owner.clone(),
                    spender: spender.clone(),
                    amount: *amount,
                })
                .collect(),
            stake_timestamps: self.stake_timestamps.clone(),
        }
    }

    pub(crate) fn balances(&self) -> &BTreeMap<Principal, Amount> {
        &self.balances
    }

    pub(crate) fn staked(&self) -> &BTreeMap<Principal, Amount> {
        &self.staked
    }

    pub(crate) fn allowances(&self) -> &BTreeMap<(Principal, Principal), Amount> {
        &self.allowances
    }

    pub(crate) fn stake_timestamps(&self) -> &BTreeMap<Principal, BlockHeight> {
        &self.stake_timestamps
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn require_authorized(&self, caller: &Principal) -> LedgerResult<()> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: caller.clone(),
            })
        }
    }

    fn require_not_paused(&self) -> LedgerResult<()> {
        if self.paused {
            Err(LedgerError::Paused)
        } else {
            Ok(())
        }
    }

    fn require_not_null(&self, who: &Principal) -> LedgerResult<()> {
        if *who == self.genesis.null_principal {
            Err(LedgerError::NullPrincipal {
                principal: who.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Write side of a validated balance move. `from_after` is the sender's
    /// already-debited balance.
    fn move_balance(
        &mut self,
        from: &Principal,
        to: &Principal,
        from_after: Amount,
        amount: Amount,
    ) {
        if from == to {
            // Self-transfer: debit and credit cancel out.
            return;
        }
        let to_after = credit(self.balance_of(to), amount);
        put(&mut self.balances, from.clone(), from_after);
        put(&mut self.balances, to.clone(), to_after);
    }
}

fn require_nonzero(amount: Amount) -> LedgerResult<()> {
    if amount == 0 {
        Err(LedgerError::ZeroAmount)
    } else {
        Ok(())
    }
}

fn debit_balance(have: Amount, need: Amount) -> LedgerResult<Amount> {
    have.checked_sub(need)
        .ok_or(LedgerError::InsufficientBalance { have, need })
}

/// Insert `value`, or drop the key when it reaches zero (absent == 0).
fn put<K: Ord>(map: &mut BTreeMap<K, Amount>, key: K, value: Amount) {
    if value == 0 {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}

/// Credit a balance-like counter.
///
/// Every balance and stake is bounded by total supply, itself bounded by the
/// cap, so overflow here means the ledger state is already corrupt.
fn credit(current: Amount, amount: Amount) -> Amount {
    match current.checked_add(amount) {
        Some(v) => v,
        None => corrupted("credit overflow"),
    }
}

fn debit_corrupt(current: Amount, amount: Amount, what: &'static str) -> Amount {
    match current.checked_sub(amount) {
        Some(v) => v,
        None => corrupted(what),
    }
}

#[cold]
#[inline(never)]
fn corrupted(what: &str) -> ! {
    panic!("ledger state corrupted: {what}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
