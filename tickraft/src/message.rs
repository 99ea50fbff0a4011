//! The messages exchanged between cluster members.
//!
//! These are logical shapes; the byte encoding is the transport's concern.
//! Responses are produced as return values of the corresponding
//! [`Server`](crate::Server) handlers and routed back by the transport.

use std::fmt;

use crate::entry::LogEntry;
use crate::LogIndex;
use crate::Term;

/// The receiver's verdict on a vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VoteStatus {
    /// The receiver votes for the candidate in this term.
    Granted,

    /// The receiver refuses the vote (already voted, or the candidate's log
    /// is behind).
    NotGranted,

    /// The candidate is not in the receiver's membership view.
    UnknownNode,
}

/// Sent by a candidate to every other member when it starts an election.
///
/// Receiving this can force a leader or candidate with a smaller term to
/// step down.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VoteRequest {
    pub term: Term,

    /// Index of the candidate's last log entry.
    pub last_log_idx: LogIndex,

    /// Term of the candidate's last log entry.
    pub last_log_term: Term,
}

impl fmt::Display for VoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{term={}, last_log={}-{}}}",
            self.term, self.last_log_term, self.last_log_idx
        )
    }
}

/// The answer to a [`VoteRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VoteResponse {
    /// The receiver's current term, for the candidate to update itself.
    pub term: Term,

    pub vote: VoteStatus,
}

impl VoteResponse {
    pub fn is_granted(&self) -> bool {
        self.vote == VoteStatus::Granted
    }
}

/// Replication request; with no entries it doubles as the leader heartbeat.
///
/// Receiving this can force a leader or candidate with a smaller term to
/// step down.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AppendEntriesRequest {
    pub term: Term,

    /// Index of the log entry immediately preceding `entries`.
    pub prev_log_idx: LogIndex,

    /// Term of the entry at `prev_log_idx`; 0 when `prev_log_idx` is 0.
    pub prev_log_term: Term,

    /// The leader's commit index: everything up to it is safe to apply.
    pub leader_commit: LogIndex,

    pub entries: Vec<LogEntry>,
}

impl AppendEntriesRequest {
    pub fn is_heartbeat(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AppendEntriesRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{term={}, prev={}-{}, commit={}, n_entries={}}}",
            self.term,
            self.prev_log_term,
            self.prev_log_idx,
            self.leader_commit,
            self.entries.len()
        )
    }
}

/// The answer to an [`AppendEntriesRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AppendEntriesResponse {
    /// The receiver's current term, for the leader to update itself.
    pub term: Term,

    /// Whether the receiver's log matched at `prev_log_idx`/`prev_log_term`.
    pub success: bool,

    /// The highest index in the receiver's log after handling the request.
    ///
    /// On failure the leader uses it as a hint to jump its `next_idx` back.
    pub current_idx: LogIndex,

    /// Index of the first entry this request newly appended; 0 if none.
    pub first_idx: LogIndex,
}

/// Returned to the submitting client when the local leader accepts an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AddEntryResponse {
    /// The term the entry was appended in.
    pub term: Term,

    /// The client-chosen entry id, echoed back.
    pub id: u64,

    /// The index the entry was appended at. The entry is not yet committed.
    pub idx: LogIndex,
}
