//! Error types exposed by this crate.

/// Errors surfaced by the consensus engine.
///
/// Every failure is a return value; the engine never panics on protocol
/// input. `Shutdown` is the only fatal kind: once it is returned the engine
/// is in its terminal state and every further stimulus fails the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RaftError {
    /// The engine is in its terminal state and must no longer be driven.
    ///
    /// Entered when a self-removal commits, when a collaborator callback
    /// reports `Shutdown`, or when an internal invariant is violated.
    #[error("the raft engine is shut down")]
    Shutdown,

    /// A submission was sent to a node that is not the leader.
    ///
    /// The caller should redirect to [`current_leader`](crate::Server::current_leader).
    #[error("this node is not the leader")]
    NotLeader,

    /// A voting configuration change is already in flight.
    ///
    /// Only one entry that toggles a voting seat may be uncommitted at a time.
    #[error("a voting configuration change is already in progress")]
    OneVotingChangeOnly,

    /// A message referenced a node that is not in the membership view.
    #[error("the referenced node is not a cluster member")]
    NodeUnknown,

    /// An apply was requested but every committed entry is already applied.
    #[error("nothing to apply: the applied index has reached the commit index")]
    NothingToApply,
}
