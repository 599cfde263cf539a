//! Shared ledger host.
//!
//! `LedgerHost` is `Clone` (all state behind `Arc`). Every submission takes
//! the write lock, applies the op, journals the attempt and broadcasts it
//! before the lock is released, so journal order, broadcast order and apply
//! order agree. A submission the journal fails to record is not applied.

use std::sync::Arc;

use anyhow::{Context, Result};
use npt_audit::JournalWriter;
use npt_config::LedgerSettings;
use npt_ledger::{
    Amount, BlockHeight, InvariantViolation, LedgerError, LedgerOp, LedgerSnapshot, Outcome,
    Principal, TokenLedger,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{LedgerEvent, OpRecord, JOURNAL_TOPIC};
use crate::replay::{ledger_id_for, replay_journal};

const BUS_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// SubmitError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SubmitError {
    /// The ledger refused the op; state is unchanged.
    Rejected(LedgerError),
    /// The journal could not record the attempt. Nothing was applied and no
    /// seq was consumed.
    Journal(anyhow::Error),
}

impl SubmitError {
    /// Stable ledger code, if the ledger rejected the op.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Rejected(e) => Some(e.code()),
            Self::Journal(_) => None,
        }
    }
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "rejected: {e}"),
            Self::Journal(e) => write!(f, "journal failure: {e:#}"),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(e) => Some(e),
            Self::Journal(e) => Some(&**e),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerHost
// ---------------------------------------------------------------------------

struct HostState {
    ledger: TokenLedger,
    journal: Option<JournalWriter>,
    /// Submissions so far, accepted or rejected.
    seq: u64,
}

#[derive(Clone)]
pub struct LedgerHost {
    ledger_id: Uuid,
    state: Arc<RwLock<HostState>>,
    bus: broadcast::Sender<LedgerEvent>,
}

impl LedgerHost {
    /// Host a ledger in memory only.
    pub fn new(ledger: TokenLedger) -> Self {
        let ledger_id = ledger_id_for(ledger.genesis());
        Self::from_parts(ledger_id, ledger, None, 0)
    }

    /// Host a ledger and journal every submission to `journal`.
    pub fn with_journal(ledger: TokenLedger, journal: JournalWriter) -> Self {
        let seq = journal.seq();
        Self::from_parts(journal.ledger_id(), ledger, Some(journal), seq)
    }

    /// Boot from config. With a journal path configured, an existing journal
    /// is verified and replayed to restore state, then appended to.
    pub fn open(settings: &LedgerSettings) -> Result<Self> {
        let ledger_id = ledger_id_for(&settings.genesis);

        let Some(path) = settings.journal.path.as_ref() else {
            info!(%ledger_id, "ledger host started without journal");
            return Ok(Self::from_parts(ledger_id, settings.build_ledger()?, None, 0));
        };

        let ledger = if path.exists() {
            let report = replay_journal(settings.genesis.clone(), path)
                .with_context(|| format!("restore ledger from {:?}", path))?;
            info!(
                %ledger_id,
                accepted = report.accepted,
                rejected = report.rejected,
                "ledger restored from journal"
            );
            report.ledger
        } else {
            settings.build_ledger()?
        };

        let journal = JournalWriter::resume(path, ledger_id, settings.journal.hash_chain)?;
        let seq = journal.seq();
        info!(%ledger_id, path = ?path, seq, "ledger host started");
        Ok(Self::from_parts(ledger_id, ledger, Some(journal), seq))
    }

    fn from_parts(
        ledger_id: Uuid,
        ledger: TokenLedger,
        journal: Option<JournalWriter>,
        seq: u64,
    ) -> Self {
        let (bus, _rx) = broadcast::channel(BUS_CAPACITY);
        Self {
            ledger_id,
            state: Arc::new(RwLock::new(HostState {
                ledger,
                journal,
                seq,
            })),
            bus,
        }
    }

    pub fn ledger_id(&self) -> Uuid {
        self.ledger_id
    }

    /// Receive a [`LedgerEvent`] for every later submission.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.bus.subscribe()
    }

    /// Apply `op` as `caller`.
    pub async fn submit(&self, caller: &Principal, op: LedgerOp) -> Result<Outcome, SubmitError> {
        let mut state = self.state.write().await;

        // Refuse before mutating if the journal could not record this op.
        if state.journal.is_some() {
            serde_json::to_value(&op)
                .context("JOURNAL_ENCODE: op cannot be journaled")
                .map_err(SubmitError::Journal)?;
        }

        // With a journal, the op runs against a copy that replaces the live
        // ledger only once the append succeeds. Live state never runs ahead
        // of the journal.
        let (result, next) = if state.journal.is_some() {
            let mut next = state.ledger.clone();
            let result = next.apply(caller, &op);
            let next = result.is_ok().then_some(next);
            (result, next)
        } else {
            (state.ledger.apply(caller, &op), None)
        };
        let record = OpRecord::new(caller, &op, &result);
        let seq = state.seq;

        if let Some(journal) = state.journal.as_mut() {
            let appended = serde_json::to_value(&record)
                .context("JOURNAL_ENCODE: record")
                .and_then(|payload| journal.append(JOURNAL_TOPIC, record.event_type(), payload));
            if let Err(err) = appended {
                error!(
                    seq,
                    op = op.name(),
                    accepted = record.accepted(),
                    error = ?err,
                    "journal append failed"
                );
                return Err(SubmitError::Journal(err));
            }
        }
        if let Some(next) = next {
            state.ledger = next;
        }
        state.seq += 1;

        let event = match &result {
            Ok(_) => {
                info!(seq, caller = %caller, op = op.name(), "op accepted");
                LedgerEvent::Accepted { seq, record }
            }
            Err(e) => {
                warn!(seq, caller = %caller, op = op.name(), code = e.code(), error = %e, "op rejected");
                LedgerEvent::Rejected {
                    seq,
                    record,
                    error: e.clone(),
                }
            }
        };
        // No receivers is fine.
        let _ = self.bus.send(event);

        result.map_err(SubmitError::Rejected)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().await.ledger.snapshot()
    }

    pub async fn balance_of(&self, who: &Principal) -> Amount {
        self.state.read().await.ledger.balance_of(who)
    }

    pub async fn staked_of(&self, who: &Principal) -> Amount {
        self.state.read().await.ledger.staked_of(who)
    }

    pub async fn allowance(&self, owner: &Principal, spender: &Principal) -> Amount {
        self.state.read().await.ledger.allowance(owner, spender)
    }

    pub async fn unlock_height(&self, who: &Principal) -> Option<BlockHeight> {
        self.state.read().await.ledger.unlock_height(who)
    }

    pub async fn total_supply(&self) -> Amount {
        self.state.read().await.ledger.total_supply()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.ledger.is_paused()
    }

    pub async fn check_invariants(&self) -> Vec<InvariantViolation> {
        self.state.read().await.ledger.check_invariants()
    }

    /// Number of submissions so far (journal `seq` of the next one).
    pub async fn submitted(&self) -> u64 {
        self.state.read().await.seq
    }

    /// Run `f` against the ledger under the read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&TokenLedger) -> R) -> R {
        f(&self.state.read().await.ledger)
    }
}
