//! An in-memory implementation of the tickraft storage interface.
//!
//! `MemStore` keeps the durable log, the applied state machine and the hard
//! state (term and vote) in plain vectors, so tests and demos can inspect
//! exactly what the engine persisted and applied, and in which order. A
//! failure can be injected ahead of the next callback to exercise the
//! engine's error propagation.


use tickraft::LogEntry;
use tickraft::LogIndex;
use tickraft::NodeId;
use tickraft::RaftError;
use tickraft::RaftStorage;
use tickraft::Term;

/// In-memory storage for demo and testing purposes.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    log: Vec<(LogIndex, LogEntry)>,
    applied: Vec<(LogIndex, LogEntry)>,
    term: Term,
    vote: Option<NodeId>,
    fail_next: Option<RaftError>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The durable log, in append order.
    pub fn log(&self) -> &[(LogIndex, LogEntry)] {
        &self.log
    }

    /// Every applied entry, in application order.
    pub fn applied(&self) -> &[(LogIndex, LogEntry)] {
        &self.applied
    }

    /// The ids of applied entries, in application order.
    pub fn applied_ids(&self) -> Vec<u64> {
        self.applied.iter().map(|(_, e)| e.id).collect()
    }

    /// The last persisted term.
    pub fn term(&self) -> Term {
        self.term
    }

    /// The persisted vote of the current term, if any.
    pub fn vote(&self) -> Option<NodeId> {
        self.vote
    }

    /// Fail the next storage callback with `err`.
    pub fn set_fail_next(&mut self, err: RaftError) {
        self.fail_next = Some(err);
    }

    fn check_fail(&mut self) -> Result<(), RaftError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl RaftStorage for MemStore {
    fn apply_entry(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        tracing::trace!(idx, entry = %entry, "apply");
        self.applied.push((idx, entry.clone()));
        Ok(())
    }

    fn save_vote(&mut self, node: NodeId) -> Result<(), RaftError> {
        self.check_fail()?;
        self.vote = Some(node);
        Ok(())
    }

    fn save_term(&mut self, term: Term) -> Result<(), RaftError> {
        self.check_fail()?;
        self.term = term;
        // A new term voids the old term's vote.
        self.vote = None;
        Ok(())
    }

    fn append_entry(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        tracing::trace!(idx, entry = %entry, "append");
        self.log.push((idx, entry.clone()));
        Ok(())
    }

    fn pop_front(&mut self, _entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        self.log.retain(|(i, _)| *i != idx);
        Ok(())
    }

    fn pop_back(&mut self, _entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        tracing::trace!(idx, "pop_back");
        self.log.retain(|(i, _)| *i != idx);
        Ok(())
    }
}
