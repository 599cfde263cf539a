//! What the host journals and broadcasts for every submitted operation.

use npt_ledger::{LedgerError, LedgerOp, LedgerResult, Outcome, Principal};
use serde::{Deserialize, Serialize};

/// One submission, accepted or rejected. This is the journal payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpRecord {
    pub caller: Principal,
    pub op: LedgerOp,
    /// `Some` when the op was accepted.
    pub value: Option<bool>,
    /// Stable error code when the op was rejected.
    pub code: Option<u32>,
    pub error: Option<String>,
}

impl OpRecord {
    pub fn new(caller: &Principal, op: &LedgerOp, result: &LedgerResult<Outcome>) -> Self {
        let (value, code, error) = match result {
            Ok(outcome) => (Some(outcome.value), None, None),
            Err(e) => (None, Some(e.code()), Some(e.to_string())),
        };
        Self {
            caller: caller.clone(),
            op: op.clone(),
            value,
            code,
            error,
        }
    }

    pub fn accepted(&self) -> bool {
        self.code.is_none()
    }

    /// Journal event type for this record.
    pub fn event_type(&self) -> &'static str {
        if self.accepted() {
            "op_accepted"
        } else {
            "op_rejected"
        }
    }
}

/// Journal topic for ledger submissions.
pub const JOURNAL_TOPIC: &str = "ledger";

/// Sent to [`LedgerHost::subscribe`](crate::LedgerHost::subscribe) receivers
/// after each submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    Accepted { seq: u64, record: OpRecord },
    Rejected { seq: u64, record: OpRecord, error: LedgerError },
}

impl LedgerEvent {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Accepted { seq, .. } | Self::Rejected { seq, .. } => *seq,
        }
    }

    pub fn record(&self) -> &OpRecord {
        match self {
            Self::Accepted { record, .. } | Self::Rejected { record, .. } => record,
        }
    }
}
