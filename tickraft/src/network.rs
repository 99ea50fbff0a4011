//! The network interface: the engine's outbound half.

use crate::error::RaftError;
use crate::message::AppendEntriesRequest;
use crate::message::VoteRequest;
use crate::NodeId;

/// Interface to the transport that carries messages to other cluster members.
///
/// Calls are synchronous: when a method returns `Ok` the engine considers
/// the message enqueued, not delivered. Responses to these requests come
/// back through the corresponding `Server::handle_*` methods.
///
/// A [`RaftError::Shutdown`] return is fatal and moves the engine to its
/// terminal state. Any other error is advisory: the engine drops it and
/// retries on the next tick.
pub trait RaftNetwork {
    /// Broadcast a vote request to every other node known to the transport.
    fn vote(&mut self, req: &VoteRequest) -> Result<(), RaftError>;

    /// Send an append-entries request to a single peer.
    fn append_entries(&mut self, target: NodeId, req: &AppendEntriesRequest)
        -> Result<(), RaftError>;
}
