//! npt-runtime
//!
//! Hosts a [`TokenLedger`](npt_ledger::TokenLedger) for concurrent callers.
//! Mutations are serialized behind one write lock, journaled in apply order
//! and broadcast to subscribers; reads share the lock.

pub mod events;
pub mod host;
pub mod replay;

pub use events::{LedgerEvent, OpRecord, JOURNAL_TOPIC};
pub use host::{LedgerHost, SubmitError};
pub use replay::{ledger_id_for, replay, replay_journal, ReplayReport};
