//! npt-ledger
//!
//! State-transition core of the NewsPledge token ledger.
//! - Single denomination, fixed issuance cap
//! - Admin + optional delegate admin (mint / pause authority)
//! - Global pause killswitch
//! - Overwriting allowances for delegated transfers
//! - One time-locked staking pool per account
//! - Pure deterministic logic (no IO, no clock, no logging)
//!
//! Every operation validates its preconditions in a fixed order, then
//! mutates. A rejected operation leaves the ledger untouched.

mod error;
mod invariants;
mod types;

pub mod ledger;

pub use error::{codes, GenesisError, LedgerError, LedgerResult};
pub use invariants::InvariantViolation;
pub use ledger::{AllowanceEntry, LedgerSnapshot, TokenLedger};
pub use types::{
    Amount, BlockHeight, GenesisConfig, LedgerOp, Outcome, Principal, DEFAULT_NULL_PRINCIPAL,
};
