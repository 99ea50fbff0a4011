//! The storage interface: durable log, hard state and the state machine.

use crate::entry::LogEntry;
use crate::error::RaftError;
use crate::LogIndex;
use crate::NodeId;
use crate::Term;

/// Interface to the durable log and the application state machine.
///
/// Every method must flush before returning: when a call returns `Ok` the
/// engine considers the side effect durable and proceeds on that assumption.
///
/// A [`RaftError::Shutdown`] return is fatal and moves the engine to its
/// terminal state. Any other error leaves the engine in its pre-call state;
/// the caller may retry the driving stimulus.
pub trait RaftStorage {
    /// Apply a committed entry to the state machine.
    ///
    /// Entries arrive exactly once and in index order.
    fn apply_entry(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError>;

    /// Record the vote granted in the current term.
    fn save_vote(&mut self, node: NodeId) -> Result<(), RaftError>;

    /// Record a term advance. Called before any action that depends on the
    /// new term.
    fn save_term(&mut self, term: Term) -> Result<(), RaftError>;

    /// Append an entry to the durable log at `idx`.
    fn append_entry(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError>;

    /// Remove the oldest retained entry. This is also the right time to
    /// release any buffers owned by the entry.
    fn pop_front(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError>;

    /// Remove the youngest entry, which a leader's log has overridden.
    fn pop_back(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError>;
}
