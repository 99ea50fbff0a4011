//! Log entries and their kinds.

use std::fmt;

use crate::NodeId;
use crate::Term;

/// What a log entry does when it commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum EntryKind {
    /// A regular application command.
    Normal,

    /// Add a node as a non-voting member, so it can catch up on the log
    /// before being given a voting seat.
    AddNonVotingNode,

    /// Add a node as a voting member (or promote a caught-up non-voter).
    AddNode,

    /// Demote a voting member to non-voting.
    DemoteNode,

    /// Remove a node from the cluster.
    RemoveNode,
}

/// An entry stored in the server's log.
///
/// Once an entry occupies an index it is immutable; it may only be truncated
/// away, never overwritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LogEntry {
    /// The term in which the entry was first appended by a leader.
    pub term: Term,

    /// Client-chosen identifier, echoed back to the submitter.
    pub id: u64,

    pub kind: EntryKind,

    /// The target node, if this is a configuration-change entry.
    pub node: Option<NodeId>,

    /// Opaque application payload.
    pub data: Vec<u8>,
}

impl LogEntry {
    /// A regular application command.
    pub fn new_normal(term: Term, id: u64, data: Vec<u8>) -> Self {
        Self {
            term,
            id,
            kind: EntryKind::Normal,
            node: None,
            data,
        }
    }

    /// A configuration-change entry targeting `node`.
    pub fn new_cfg_change(term: Term, id: u64, kind: EntryKind, node: NodeId) -> Self {
        Self {
            term,
            id,
            kind,
            node: Some(node),
            data: Vec::new(),
        }
    }

    /// Whether committing this entry toggles a voting seat.
    pub fn is_voting_cfg_change(&self) -> bool {
        matches!(self.kind, EntryKind::AddNode | EntryKind::DemoteNode)
    }

    /// Whether this entry changes the cluster configuration at all.
    pub fn is_cfg_change(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::AddNode
                | EntryKind::AddNonVotingNode
                | EntryKind::DemoteNode
                | EntryKind::RemoveNode
        )
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}-{}:{:?}", self.term, self.id, self.kind)?;
        if let Some(n) = self.node {
            write!(f, "({})", n)?;
        }
        Ok(())
    }
}
