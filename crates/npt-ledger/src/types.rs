use std::fmt;

use serde::{Deserialize, Serialize};

/// Token quantity. Unsigned, so no balance can ever be negative.
pub type Amount = u128;

/// Chain block height supplied by the caller's execution environment.
pub type BlockHeight = u64;

/// Burn address used when genesis does not name one.
pub const DEFAULT_NULL_PRINCIPAL: &str = "SP000000000000000000002Q6VF78";

/// Opaque account identifier.
///
/// The ledger never interprets the string; it only compares principals for
/// equality and orders them for deterministic iteration.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The conventional burn address ([`DEFAULT_NULL_PRINCIPAL`]).
    pub fn null() -> Self {
        Self::new(DEFAULT_NULL_PRINCIPAL)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Principal {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Immutable genesis parameters, fixed when the ledger is constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub admin: Principal,
    /// Hard cap on total supply.
    pub max_supply: Amount,
    /// Blocks that must elapse after the latest stake before any unstake.
    pub stake_lock_period: BlockHeight,
    /// Reserved burn address, never a valid destination or spender.
    pub null_principal: Principal,
}

impl GenesisConfig {
    pub fn new(
        admin: impl Into<Principal>,
        max_supply: Amount,
        stake_lock_period: BlockHeight,
    ) -> Self {
        Self {
            admin: admin.into(),
            max_supply,
            stake_lock_period,
            null_principal: Principal::null(),
        }
    }

    pub fn with_null_principal(mut self, null_principal: impl Into<Principal>) -> Self {
        self.null_principal = null_principal.into();
        self
    }
}

/// One ledger operation with its arguments (the caller is passed separately).
///
/// This is the unit the host runtime serializes into the journal and the
/// unit [`TokenLedger::apply`](crate::TokenLedger::apply) dispatches on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOp {
    SetPaused {
        paused: bool,
    },
    /// `None` clears the delegate.
    SetDelegateAdmin {
        delegate: Option<Principal>,
    },
    Mint {
        recipient: Principal,
        amount: Amount,
    },
    Burn {
        amount: Amount,
    },
    Transfer {
        recipient: Principal,
        amount: Amount,
    },
    Approve {
        spender: Principal,
        amount: Amount,
    },
    TransferFrom {
        owner: Principal,
        recipient: Principal,
        amount: Amount,
    },
    Stake {
        amount: Amount,
        height: BlockHeight,
    },
    Unstake {
        amount: Amount,
        height: BlockHeight,
    },
}

impl LedgerOp {
    /// Stable snake_case operation name (journal `event_type`, log field).
    pub fn name(&self) -> &'static str {
        match self {
            LedgerOp::SetPaused { .. } => "set_paused",
            LedgerOp::SetDelegateAdmin { .. } => "set_delegate_admin",
            LedgerOp::Mint { .. } => "mint",
            LedgerOp::Burn { .. } => "burn",
            LedgerOp::Transfer { .. } => "transfer",
            LedgerOp::Approve { .. } => "approve",
            LedgerOp::TransferFrom { .. } => "transfer_from",
            LedgerOp::Stake { .. } => "stake",
            LedgerOp::Unstake { .. } => "unstake",
        }
    }

    /// True for operations that only the admin or delegate may perform.
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            LedgerOp::SetPaused { .. } | LedgerOp::SetDelegateAdmin { .. } | LedgerOp::Mint { .. }
        )
    }
}

/// Success payload of an applied operation.
///
/// `set_paused` reports the new pause flag; every other operation reports `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub value: bool,
}

impl Outcome {
    pub const DONE: Outcome = Outcome { value: true };
}
