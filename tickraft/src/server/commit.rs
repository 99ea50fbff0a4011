//! Commit-index advancement and the apply loop.

use crate::entry::EntryKind;
use crate::entry::LogEntry;
use crate::error::RaftError;
use crate::network::RaftNetwork;
use crate::node::NodeStatus;
use crate::server::Server;
use crate::server::ServerState;
use crate::storage::RaftStorage;
use crate::LogIndex;

impl<N, S> Server<N, S>
where
    N: RaftNetwork,
    S: RaftStorage,
{
    /// Record a new commit index. The commit index never regresses.
    pub(crate) fn set_commit_idx(&mut self, idx: LogIndex) {
        debug_assert!(idx >= self.commit_idx);
        if idx > self.commit_idx {
            tracing::debug!(id = %self.id, commit_idx = idx, "commit index advanced");
            self.commit_idx = idx;
        }
        self.check_invariants();
    }

    /// Leader side: commit the highest index that a quorum of voters has
    /// replicated — counting only entries of the current term, so that a
    /// new leader never commits a prior-term entry directly. Then apply.
    pub(crate) fn advance_commit(&mut self) -> Result<(), RaftError> {
        if self.state == ServerState::Leader {
            let quorum = self.nodes.quorum_size();
            let mut n = self.log.last_idx();
            while n > self.commit_idx {
                if self.log.term_at(n) == Some(self.current_term)
                    && self.nodes.count_voting_matches(n) >= quorum
                {
                    self.set_commit_idx(n);
                    break;
                }
                n -= 1;
            }
        }
        self.apply_committed()
    }

    /// Apply every committed-but-unapplied entry, in index order.
    ///
    /// A `Shutdown` error is terminal; any other apply error halts the loop
    /// but leaves the engine running, to be retried on a later stimulus.
    pub(crate) fn apply_committed(&mut self) -> Result<(), RaftError> {
        while self.last_applied_idx < self.commit_idx {
            self.apply_one()?;
        }
        Ok(())
    }

    /// Apply the entry right after `last_applied_idx`.
    pub(crate) fn apply_one(&mut self) -> Result<(), RaftError> {
        let idx = self.last_applied_idx + 1;
        let entry = match self.log.get(idx) {
            Some(e) => e.clone(),
            // A committed entry is always retained.
            None => return Err(self.fatal(RaftError::Shutdown)),
        };

        let removes_self =
            entry.kind == EntryKind::RemoveNode && entry.node == Some(self.id);

        if entry.is_cfg_change() {
            self.commit_cfg_change(&entry);
        }

        self.storage
            .apply_entry(&entry, idx)
            .map_err(|e| self.fatal(e))?;
        self.last_applied_idx = idx;

        if self.voting_cfg_change_idx == Some(idx) {
            self.voting_cfg_change_idx = None;
        }

        if removes_self {
            tracing::info!(id = %self.id, "removed from the cluster; shutting down");
            self.state = ServerState::Shutdown;
        }

        self.check_invariants();
        Ok(())
    }

    /// The definitive membership effect of a configuration-change entry,
    /// performed when it commits.
    fn commit_cfg_change(&mut self, entry: &LogEntry) {
        let node_id = match entry.node {
            Some(n) => n,
            None => return,
        };

        match entry.kind {
            EntryKind::AddNonVotingNode => {
                if let Some(node) = self.nodes.get_mut(node_id) {
                    node.set_status(NodeStatus::Connected);
                }
            }
            EntryKind::AddNode => {
                if let Some(node) = self.nodes.get_mut(node_id) {
                    node.set_voting(true);
                    node.set_status(NodeStatus::Connected);
                }
                tracing::info!(id = %self.id, node = %node_id, "node promoted to voter");
            }
            EntryKind::DemoteNode => {
                let _ = self.nodes.set_voting(node_id, false);
            }
            EntryKind::RemoveNode => {
                let _ = self.nodes.remove_node(node_id);
                tracing::info!(id = %self.id, node = %node_id, "node removed from the cluster");
            }
            EntryKind::Normal => {}
        }
    }
}
