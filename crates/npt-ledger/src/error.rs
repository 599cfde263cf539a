use crate::types::{Amount, BlockHeight, Principal};

/// Stable caller-visible error codes.
pub mod codes {
    pub const NOT_AUTHORIZED: u32 = 100;
    pub const INSUFFICIENT_BALANCE: u32 = 101;
    pub const INSUFFICIENT_STAKE: u32 = 102;
    pub const MAX_SUPPLY_EXCEEDED: u32 = 103;
    pub const PAUSED: u32 = 104;
    pub const NULL_PRINCIPAL: u32 = 105;
    pub const STAKE_LOCKED: u32 = 106;
    pub const ZERO_AMOUNT: u32 = 107;
}

// ---------------------------------------------------------------------------
// Operation errors
// ---------------------------------------------------------------------------

/// A rejected operation. The ledger is never mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Caller lacks admin / delegate authority for the operation.
    Unauthorized { caller: Principal },
    /// `transfer_from` asked for more than the owner approved.
    InsufficientAllowance { have: Amount, need: Amount },
    /// Spendable balance too low (staked tokens do not count).
    InsufficientBalance { have: Amount, need: Amount },
    /// Staked balance too low for the unstake.
    InsufficientStake { have: Amount, need: Amount },
    /// Mint would push total supply over the genesis cap.
    MaxSupplyExceeded { max: Amount, would_have: Amount },
    /// Ledger is paused.
    Paused,
    /// Destination or spender is the reserved null principal.
    NullPrincipal { principal: Principal },
    /// Lock period since the latest stake has not elapsed.
    StakeLocked {
        unlock_height: BlockHeight,
        current_height: BlockHeight,
    },
    /// Amount must be strictly positive.
    ZeroAmount,
}

impl LedgerError {
    /// Stable numeric code (see [`codes`]).
    pub fn code(&self) -> u32 {
        match self {
            Self::Unauthorized { .. } | Self::InsufficientAllowance { .. } => codes::NOT_AUTHORIZED,
            Self::InsufficientBalance { .. } => codes::INSUFFICIENT_BALANCE,
            Self::InsufficientStake { .. } => codes::INSUFFICIENT_STAKE,
            Self::MaxSupplyExceeded { .. } => codes::MAX_SUPPLY_EXCEEDED,
            Self::Paused => codes::PAUSED,
            Self::NullPrincipal { .. } => codes::NULL_PRINCIPAL,
            Self::StakeLocked { .. } => codes::STAKE_LOCKED,
            Self::ZeroAmount => codes::ZERO_AMOUNT,
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code();
        match self {
            Self::Unauthorized { caller } => {
                write!(f, "err {code}: {caller} is not authorized for this action")
            }
            Self::InsufficientAllowance { have, need } => {
                write!(f, "err {code}: insufficient allowance: have {have}, need {need}")
            }
            Self::InsufficientBalance { have, need } => {
                write!(f, "err {code}: insufficient balance: have {have}, need {need}")
            }
            Self::InsufficientStake { have, need } => {
                write!(f, "err {code}: insufficient stake: have {have}, need {need}")
            }
            Self::MaxSupplyExceeded { max, would_have } => write!(
                f,
                "err {code}: max supply exceeded: max {max}, would have {would_have}"
            ),
            Self::Paused => write!(f, "err {code}: ledger is paused"),
            Self::NullPrincipal { principal } => {
                write!(f, "err {code}: {principal} is the reserved null principal")
            }
            Self::StakeLocked {
                unlock_height,
                current_height,
            } => write!(
                f,
                "err {code}: stake locked until height {unlock_height}, current {current_height}"
            ),
            Self::ZeroAmount => write!(f, "err {code}: amount must be > 0"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// ---------------------------------------------------------------------------
// Genesis errors
// ---------------------------------------------------------------------------

/// Genesis parameters that cannot describe a usable ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenesisError {
    /// A principal identifier was empty or whitespace.
    EmptyPrincipal { field: &'static str },
    /// The admin would be the burn address and could never act.
    AdminIsNullPrincipal,
}

impl std::fmt::Display for GenesisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPrincipal { field } => {
                write!(f, "genesis invariant: {field} must not be empty")
            }
            Self::AdminIsNullPrincipal => {
                write!(f, "genesis invariant: admin must not be the null principal")
            }
        }
    }
}

impl std::error::Error for GenesisError {}
