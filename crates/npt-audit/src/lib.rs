//! npt-audit
//!
//! Append-only ledger journal. JSON Lines, one event per line, canonical key
//! order. With the hash chain enabled each event carries `hash_prev` (the
//! previous event's `hash_self`) and `hash_self` (SHA-256 over the event's
//! canonical JSON with `hash_self` cleared).

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Namespace for deterministic event ids.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6e, 0x70, 0x74, 0x2d, 0x6a, 0x6f, 0x75, 0x72, 0x6e, 0x61, 0x6c, 0x2d, 0x65, 0x76, 0x65, 0x6e,
]);

pub struct JournalWriter {
    path: PathBuf,
    ledger_id: Uuid,
    hash_chain: bool,
    last_hash: Option<String>,
    /// Number of events written so far; the next event's `seq`.
    seq: u64,
}

impl JournalWriter {
    /// Creates the writer and ensures parent dirs exist. Does not touch an
    /// existing file; use [`JournalWriter::resume`] to continue one.
    pub fn new(path: impl AsRef<Path>, ledger_id: Uuid, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        Ok(Self {
            path,
            ledger_id,
            hash_chain,
            last_hash: None,
            seq: 0,
        })
    }

    /// Reopen an existing journal, restoring `seq` and the chain tip from its
    /// last event. A missing or empty file starts fresh.
    ///
    /// The journal must be intact: a broken chain is refused so new events
    /// never extend a tampered log.
    pub fn resume(path: impl AsRef<Path>, ledger_id: Uuid, hash_chain: bool) -> Result<Self> {
        let mut writer = Self::new(path.as_ref(), ledger_id, hash_chain)?;
        if !writer.path.exists() {
            return Ok(writer);
        }

        let content = fs::read_to_string(&writer.path)
            .with_context(|| format!("read journal {:?}", writer.path))?;
        if let VerifyResult::Broken { line, reason } = verify_hash_chain_str(&content)? {
            bail!("JOURNAL_CHAIN_BROKEN line={line}: {reason}");
        }

        let events = parse_events(&content)?;
        if let Some(last) = events.last() {
            if last.ledger_id != ledger_id {
                bail!(
                    "JOURNAL_LEDGER_MISMATCH: journal belongs to {}, not {}",
                    last.ledger_id,
                    ledger_id
                );
            }
            writer.seq = last.seq + 1;
            writer.last_hash = last.hash_self.clone();
        }
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ledger_id(&self) -> Uuid {
        self.ledger_id
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one event.
    pub fn append(&mut self, topic: &str, event_type: &str, payload: Value) -> Result<JournalEvent> {
        let event_id = derive_event_id(self.last_hash.as_deref(), &payload, self.seq)?;

        let mut ev = JournalEvent {
            event_id,
            ledger_id: self.ledger_id,
            seq: self.seq,
            ts_utc: Utc::now(),
            topic: topic.to_string(),
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            ev.hash_prev = self.last_hash.clone();
            ev.hash_self = Some(compute_event_hash(&ev)?);
        }

        let line = canonical_json_line(&ev)?;
        append_line(&self.path, &line)?;

        // Only advance once the line is on disk.
        self.seq += 1;
        if self.hash_chain {
            self.last_hash = ev.hash_self.clone();
        }
        Ok(ev)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEvent {
    pub event_id: Uuid,
    pub ledger_id: Uuid,
    pub seq: u64,
    pub ts_utc: DateTime<Utc>,
    pub topic: String,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// `event_id = uuid_v5(ns, last_hash | canonical(payload) | seq)`.
///
/// Same chain position and payload always yield the same id; no RNG.
pub fn derive_event_id(last_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let canonical = serde_json::to_string(&sort_keys(payload)).context("serialize payload failed")?;
    let material = format!("{}|{}|{}", last_hash.unwrap_or(""), canonical, seq);
    Ok(Uuid::new_v5(&EVENT_ID_NAMESPACE, material.as_bytes()))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open journal {:?}", path))?;
    // Single write per event.
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    f.write_all(buf.as_bytes())
        .context("write journal line failed")?;
    Ok(())
}

fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize journal event failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// SHA-256 of the event's canonical JSON with `hash_self` cleared.
pub fn compute_event_hash(ev: &JournalEvent) -> Result<String> {
    let mut clone = ev.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Parse every non-blank line of a journal file.
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<JournalEvent>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    parse_events(&content)
}

pub fn parse_events(content: &str) -> Result<Vec<JournalEvent>> {
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let ev: JournalEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse journal event at line {}", i + 1))?;
        out.push(ev);
    }
    Ok(out)
}

pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Walks the lines in order. Besides the hash links, `seq` must count up
/// from 0 with no gaps, which catches deleted or reordered lines in journals
/// written without the chain.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let ev: JournalEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse journal event at line {}", i + 1))?;

        if ev.seq != line_count as u64 {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!("seq gap: expected {}, got {}", line_count, ev.seq),
            });
        }
        line_count += 1;

        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, ev.hash_prev
                ),
            });
        }

        if let Some(ref claimed_hash) = ev.hash_self {
            let recomputed = compute_event_hash(&ev)?;
            if *claimed_hash != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed_hash, recomputed
                    ),
                });
            }
        }

        prev_hash = ev.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_id_is_deterministic_and_position_sensitive() {
        let p = json!({"b": 1, "a": 2});
        let reordered = json!({"a": 2, "b": 1});

        let a = derive_event_id(Some("abc"), &p, 3).unwrap();
        assert_eq!(a, derive_event_id(Some("abc"), &reordered, 3).unwrap());
        assert_ne!(a, derive_event_id(Some("abc"), &p, 4).unwrap());
        assert_ne!(a, derive_event_id(None, &p, 3).unwrap());
    }

    #[test]
    fn canonical_line_sorts_nested_keys() {
        let line = canonical_json_line(&json!({"z": {"y": 1, "x": 2}, "a": []})).unwrap();
        assert_eq!(line, r#"{"a":[],"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn empty_journal_is_valid() {
        assert_eq!(
            verify_hash_chain_str("\n\n").unwrap(),
            VerifyResult::Valid { lines: 0 }
        );
    }
}
