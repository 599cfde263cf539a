//! Deterministic rebuild of a ledger from recorded operations.

use std::path::Path;

use anyhow::{bail, Context, Result};
use npt_audit::{read_events, verify_hash_chain, VerifyResult};
use npt_ledger::{GenesisConfig, GenesisError, LedgerOp, Principal, TokenLedger};
use uuid::Uuid;

use crate::events::{OpRecord, JOURNAL_TOPIC};

/// Namespace for ledger ids derived from genesis parameters.
const LEDGER_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6e, 0x70, 0x74, 0x2d, 0x6c, 0x65, 0x64, 0x67, 0x65, 0x72, 0x2d, 0x67, 0x65, 0x6e, 0x65, 0x73,
]);

/// Stable id for the ledger a genesis describes. A journal carries it on
/// every event, so it cannot be replayed onto a different genesis.
pub fn ledger_id_for(genesis: &GenesisConfig) -> Uuid {
    let material = format!(
        "{}|{}|{}|{}",
        genesis.admin, genesis.max_supply, genesis.stake_lock_period, genesis.null_principal
    );
    Uuid::new_v5(&LEDGER_ID_NAMESPACE, material.as_bytes())
}

#[derive(Clone, Debug)]
pub struct ReplayReport {
    pub ledger: TokenLedger,
    pub accepted: usize,
    pub rejected: usize,
}

/// Apply `ops` in order to a fresh genesis ledger. Rejected ops are counted
/// and leave no trace, exactly as they did live.
pub fn replay<I>(genesis: GenesisConfig, ops: I) -> Result<ReplayReport, GenesisError>
where
    I: IntoIterator<Item = (Principal, LedgerOp)>,
{
    let mut ledger = TokenLedger::new(genesis)?;
    let mut accepted = 0;
    let mut rejected = 0;
    for (caller, op) in ops {
        match ledger.apply(&caller, &op) {
            Ok(_) => accepted += 1,
            Err(_) => rejected += 1,
        }
    }
    Ok(ReplayReport {
        ledger,
        accepted,
        rejected,
    })
}

/// Rebuild a ledger from a host journal.
///
/// The chain must verify, every event must belong to this genesis, and each
/// re-applied op must reproduce the recorded outcome (value or error code).
pub fn replay_journal(genesis: GenesisConfig, path: impl AsRef<Path>) -> Result<ReplayReport> {
    let path = path.as_ref();
    if let VerifyResult::Broken { line, reason } = verify_hash_chain(path)? {
        bail!("JOURNAL_CHAIN_BROKEN line={line}: {reason}");
    }

    let ledger_id = ledger_id_for(&genesis);
    let mut ledger = TokenLedger::new(genesis).map_err(|e| anyhow::anyhow!("JOURNAL_GENESIS: {e}"))?;
    let mut accepted = 0;
    let mut rejected = 0;

    for ev in read_events(path)? {
        if ev.ledger_id != ledger_id {
            bail!(
                "JOURNAL_LEDGER_MISMATCH seq={}: journal belongs to {}, not {}",
                ev.seq,
                ev.ledger_id,
                ledger_id
            );
        }
        if ev.topic != JOURNAL_TOPIC {
            continue;
        }

        let recorded: OpRecord = serde_json::from_value(ev.payload)
            .with_context(|| format!("decode op record seq={}", ev.seq))?;
        let result = ledger.apply(&recorded.caller, &recorded.op);
        let replayed = OpRecord::new(&recorded.caller, &recorded.op, &result);

        if replayed.value != recorded.value || replayed.code != recorded.code {
            bail!(
                "JOURNAL_REPLAY_DIVERGED seq={} op={}: recorded value={:?} code={:?}, replayed value={:?} code={:?}",
                ev.seq,
                recorded.op.name(),
                recorded.value,
                recorded.code,
                replayed.value,
                replayed.code
            );
        }
        if replayed.accepted() {
            accepted += 1;
        } else {
            rejected += 1;
        }
    }

    Ok(ReplayReport {
        ledger,
        accepted,
        rejected,
    })
}
