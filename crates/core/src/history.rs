//! Bounded, deduplicating, file-backed store of past rosters.
//!
//! Entries are ordered oldest first, most-recent-last. The store is
//! rewritten wholesale on each run through a temp file and an atomic
//! rename, so a crash mid-write cannot corrupt the previous state.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::error::{StoreLoadError, StorePersistError};
use crate::model::{format_timestamp, parse_timestamp, Roster};

/// Default history bound. Early deployments ran with 5; 200 keeps a
/// few months of daily snapshots at typical change rates.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// One distinct stored roster.
///
/// `last_seen_at` advances past `captured_at` when later fetches were
/// content-identical and got collapsed into this entry instead of
/// being appended.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub captured_at: OffsetDateTime,
    pub last_seen_at: OffsetDateTime,
    pub roster: Roster,
}

/// The rolling history of rosters, bounded at `max_entries`.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Snapshot>,
    max_entries: usize,
}

impl History {
    pub fn new(max_entries: usize) -> History {
        History {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Read the persisted store. A missing file is a cold start and
    /// yields an empty history; an unreadable or unparseable file is
    /// an error the caller is expected to recover from by starting
    /// empty (after warning the operator).
    pub fn load(path: &Path, max_entries: usize) -> Result<History, StoreLoadError> {
        if !path.exists() {
            return Ok(History::new(max_entries));
        }

        let text = fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&text)
            .map_err(|e| StoreLoadError::Malformed(e.to_string()))?;

        let raw_entries = doc
            .get("entries")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreLoadError::Malformed("missing 'entries' array".to_string()))?;

        let mut entries = Vec::with_capacity(raw_entries.len());
        for raw in raw_entries {
            entries.push(parse_snapshot(raw).map_err(StoreLoadError::Malformed)?);
        }

        // A store written under a larger bound is trimmed to the
        // requested one on load, keeping the newest entries.
        if entries.len() > max_entries {
            entries.drain(..entries.len() - max_entries);
        }

        Ok(History {
            entries,
            max_entries,
        })
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The latest distinct stored roster, if any. `None` means this is
    /// the first ever run and there is no baseline to diff against.
    pub fn most_recent(&self) -> Option<&Snapshot> {
        self.entries.last()
    }

    /// Insert a newly fetched roster. Returns `true` when the roster
    /// was a content-duplicate of the most recent entry; in that case
    /// only that entry's `last_seen_at` is updated and nothing is
    /// appended, so repeated unchanged fetches cannot grow the store.
    /// Otherwise the roster is appended and, if the bound is exceeded,
    /// the oldest entry is evicted.
    pub fn record(&mut self, roster: Roster) -> bool {
        if let Some(last) = self.entries.last_mut() {
            if last.roster.same_content(&roster) {
                last.last_seen_at = roster.captured_at;
                return true;
            }
        }

        self.entries.push(Snapshot {
            captured_at: roster.captured_at,
            last_seen_at: roster.captured_at,
            roster,
        });
        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
        false
    }

    /// Write the full store back to disk, atomically: the document is
    /// written to a temp file in the target directory and renamed over
    /// the old store, so readers never observe a partial write.
    pub fn persist(&self, path: &Path) -> Result<(), StorePersistError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let text = serde_json::to_string_pretty(&self.to_json())?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(text.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(path).map_err(|e| StorePersistError::Io(e.error))?;
        Ok(())
    }

    fn to_json(&self) -> Value {
        json!({
            "max_entries": self.max_entries,
            "entries": self.entries.iter().map(snapshot_to_json).collect::<Vec<_>>(),
        })
    }
}

fn snapshot_to_json(snapshot: &Snapshot) -> Value {
    json!({
        "captured_at": format_timestamp(snapshot.captured_at),
        "last_seen_at": format_timestamp(snapshot.last_seen_at),
        "count": snapshot.roster.len(),
        "employees": snapshot.roster.employees.iter().map(|e| e.raw.clone()).collect::<Vec<_>>(),
    })
}

fn parse_snapshot(raw: &Value) -> Result<Snapshot, String> {
    let captured = raw
        .get("captured_at")
        .and_then(Value::as_str)
        .ok_or("entry missing 'captured_at'")?;
    let captured_at = parse_timestamp(captured)?;

    // Stores written before dedup tracked last-seen lack the field.
    let last_seen_at = match raw.get("last_seen_at").and_then(Value::as_str) {
        Some(s) => parse_timestamp(s)?,
        None => captured_at,
    };

    let employees = raw
        .get("employees")
        .and_then(Value::as_array)
        .ok_or("entry missing 'employees' array")?;

    Ok(Snapshot {
        captured_at,
        last_seen_at,
        roster: Roster {
            captured_at,
            employees: employees
                .iter()
                .cloned()
                .map(crate::model::Employee::from_raw)
                .collect(),
        },
    })
}
