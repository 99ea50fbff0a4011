//! A single-threaded, tick-driven Raft consensus engine.
//!
//! A cluster of engines, connected by an unreliable asynchronous network,
//! maintains an ordered log of commands; each node applies committed
//! commands in the same order to its own state machine.
//!
//! The engine is deliberately inert: it owns no threads, reads no clock and
//! performs no I/O of its own. The caller drives it with three kinds of
//! stimuli —
//!
//! - [`Server::periodic`] advances a virtual clock by a chosen delta,
//! - the `Server::handle_*` methods feed in messages from peers,
//! - [`Server::client_write`] submits new entries on the leader —
//!
//! and the engine calls back into two collaborator traits it is constructed
//! with: a [`RaftNetwork`] that carries messages to peers, and a
//! [`RaftStorage`] that persists the log and hard state and applies
//! committed entries. Handler return values are the responses; the
//! transport routes them back to the requester.
//!
//! Because time only enters through tick deltas, a whole cluster can be run
//! deterministically inside a test, message by message.

#![allow(clippy::uninlined_format_args)]
#![deny(unused_qualifications)]

mod entry;
mod error;
mod log;
mod message;
mod network;
mod node;
mod server;
mod storage;

pub mod config;

#[cfg(test)]
mod testing;

use std::fmt;

pub use crate::config::Config;
pub use crate::config::ConfigError;
pub use crate::entry::EntryKind;
pub use crate::entry::LogEntry;
pub use crate::error::RaftError;
pub use crate::log::RaftLog;
pub use crate::message::AddEntryResponse;
pub use crate::message::AppendEntriesRequest;
pub use crate::message::AppendEntriesResponse;
pub use crate::message::VoteRequest;
pub use crate::message::VoteResponse;
pub use crate::message::VoteStatus;
pub use crate::network::RaftNetwork;
pub use crate::node::Node;
pub use crate::node::NodeSet;
pub use crate::node::NodeStatus;
pub use crate::server::Server;
pub use crate::server::ServerState;
pub use crate::storage::RaftStorage;

/// A logical epoch. Monotonically non-decreasing on every node.
pub type Term = u64;

/// A position in the log. Indices start at 1; 0 means "before the log".
pub type LogIndex = u64;

/// Opaque identifier of a cluster member. Only equality (and, for
/// deterministic iteration, ordering) is ever consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
