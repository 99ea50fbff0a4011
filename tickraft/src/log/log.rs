use std::collections::VecDeque;
use std::error::Error;

use validit::Validate;

use crate::entry::LogEntry;
use crate::error::RaftError;
use crate::storage::RaftStorage;
use crate::LogIndex;
use crate::Term;

/// The ordered, append-mostly store of log entries, indexed from 1.
///
/// The log mediates the durable-storage callbacks: an entry becomes visible
/// only after storage has acknowledged it, and truncation from either end is
/// pushed to storage before the in-memory state changes. Index 0 denotes
/// "before the log".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaftLog {
    /// Retained entries; `entries[0]` sits at index `base + 1`.
    entries: VecDeque<LogEntry>,

    /// Number of entries removed from the front over the log's lifetime.
    base: LogIndex,
}

impl RaftLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first retained entry.
    pub fn first_idx(&self) -> LogIndex {
        self.base + 1
    }

    /// Index of the last entry, or 0 if the log holds nothing.
    pub fn last_idx(&self) -> LogIndex {
        self.base + self.entries.len() as LogIndex
    }

    /// Term of the last entry, or 0 for an empty log.
    pub fn last_term(&self) -> Term {
        self.entries.back().map(|e| e.term).unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `idx`, if it is retained.
    pub fn get(&self, idx: LogIndex) -> Option<&LogEntry> {
        if idx <= self.base {
            return None;
        }
        self.entries.get((idx - self.base - 1) as usize)
    }

    /// Term of the entry at `idx`.
    ///
    /// Index 0 has term 0 by convention. `None` means the index is not
    /// retained (compacted away or beyond the last entry).
    pub fn term_at(&self, idx: LogIndex) -> Option<Term> {
        if idx == 0 {
            return Some(0);
        }
        self.get(idx).map(|e| e.term)
    }

    /// Up to `count` entries starting at `from`, cloned for transmission.
    pub fn slice(&self, from: LogIndex, count: u64) -> Vec<LogEntry> {
        let mut out = Vec::new();
        let mut idx = from;
        while (out.len() as u64) < count {
            match self.get(idx) {
                Some(e) => out.push(e.clone()),
                None => break,
            }
            idx += 1;
        }
        out
    }

    /// Append `entry`, making it visible only once storage acknowledges it.
    pub fn append<S: RaftStorage>(
        &mut self,
        entry: LogEntry,
        storage: &mut S,
    ) -> Result<LogIndex, RaftError> {
        let idx = self.last_idx() + 1;
        storage.append_entry(&entry, idx)?;
        self.entries.push_back(entry);
        Ok(idx)
    }

    /// Remove the youngest entry, for reconciling a conflicting suffix.
    ///
    /// Refuses to remove an entry at or below `commit_idx`: committed
    /// entries are never invalidated, and a request to do so means the
    /// cluster state is corrupt.
    pub fn pop_back<S: RaftStorage>(
        &mut self,
        commit_idx: LogIndex,
        storage: &mut S,
    ) -> Result<Option<LogEntry>, RaftError> {
        let idx = self.last_idx();
        let entry = match self.entries.back() {
            Some(e) => e,
            None => return Ok(None),
        };
        if idx <= commit_idx {
            return Err(RaftError::Shutdown);
        }
        storage.pop_back(entry, idx)?;
        Ok(self.entries.pop_back())
    }

    /// Remove the oldest entry, for prospective compaction.
    pub fn pop_front<S: RaftStorage>(
        &mut self,
        storage: &mut S,
    ) -> Result<Option<LogEntry>, RaftError> {
        let entry = match self.entries.front() {
            Some(e) => e,
            None => return Ok(None),
        };
        storage.pop_front(entry, self.base + 1)?;
        self.base += 1;
        Ok(self.entries.pop_front())
    }
}

impl Validate for RaftLog {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        if let (Some(front), Some(back)) = (self.entries.front(), self.entries.back()) {
            // Terms never decrease along the log.
            validit::less_equal!(front.term, back.term);
        }
        validit::less_equal!(self.base, self.last_idx());
        Ok(())
    }
}
