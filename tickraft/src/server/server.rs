use std::error::Error;
use std::time::Duration;

use validit::Valid;
use validit::Validate;

use crate::config::Config;
use crate::entry::EntryKind;
use crate::entry::LogEntry;
use crate::error::RaftError;
use crate::log::RaftLog;
use crate::message::AddEntryResponse;
use crate::network::RaftNetwork;
use crate::node::NodeSet;
use crate::node::NodeStatus;
use crate::storage::RaftStorage;
use crate::LogIndex;
use crate::NodeId;
use crate::Term;

/// The role a server currently plays, plus the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Follower,
    Candidate,
    Leader,

    /// Terminal: entered when a self-removal commits or a collaborator
    /// reports a fatal error. Every further stimulus is refused.
    Shutdown,
}

/// A single consensus engine instance.
///
/// The engine is single-threaded and cooperative: the caller serializes all
/// stimuli — [`periodic`](Server::periodic) ticks, the `handle_*` message
/// handlers and [`client_write`](Server::client_write) — and the engine
/// completes each one without blocking or spawning. Time enters only through
/// tick deltas, which makes deterministic simulation trivial.
///
/// Outbound traffic goes through the owned [`RaftNetwork`]; durable state
/// through the owned [`RaftStorage`]. Handler return values are the
/// responses; the transport routes them back to the requester.
pub struct Server<N, S> {
    pub(crate) id: NodeId,
    pub(crate) config: Config,

    pub(crate) state: ServerState,
    pub(crate) current_term: Term,
    pub(crate) voted_for: Option<NodeId>,
    pub(crate) current_leader: Option<NodeId>,

    pub(crate) commit_idx: LogIndex,
    pub(crate) last_applied_idx: LogIndex,

    /// Time since the last timer reset (or, on a leader, the last heartbeat
    /// broadcast).
    pub(crate) timeout_elapsed: Duration,

    /// The current randomized election timeout.
    pub(crate) election_timeout: Duration,

    /// Index of the uncommitted voting-configuration-change entry, if any.
    pub(crate) voting_cfg_change_idx: Option<LogIndex>,

    pub(crate) log: Valid<RaftLog>,
    pub(crate) nodes: NodeSet,

    pub(crate) network: N,
    pub(crate) storage: S,
}

impl<N, S> Server<N, S>
where
    N: RaftNetwork,
    S: RaftStorage,
{
    /// Create a server with the given collaborators.
    ///
    /// The local node is entered into the membership view according to
    /// `config.self_is_voting`; peers are added with [`Server::add_node`].
    pub fn new(id: NodeId, config: Config, network: N, storage: S) -> Self {
        let election_timeout = config.new_rand_election_timeout();
        let mut nodes = NodeSet::new();
        nodes.add_node(id, config.self_is_voting);

        Self {
            id,
            config,
            state: ServerState::Follower,
            current_term: 0,
            voted_for: None,
            current_leader: None,
            commit_idx: 0,
            last_applied_idx: 0,
            timeout_elapsed: Duration::ZERO,
            election_timeout,
            voting_cfg_change_idx: None,
            log: Valid::new(RaftLog::new()),
            nodes,
            network,
            storage,
        }
    }

    /// Add a member to the bootstrap configuration.
    ///
    /// At runtime membership changes go through configuration-change
    /// entries instead.
    pub fn add_node(&mut self, id: NodeId, voting: bool) {
        self.nodes.add_node(id, voting);
    }

    /// Advance the virtual clock by `delta`.
    ///
    /// A leader re-broadcasts append-entries every `request_timeout`; any
    /// other node with a voting seat starts an election once its randomized
    /// election timeout elapses. A zero delta is a valid no-op.
    #[tracing::instrument(level = "debug", skip(self), fields(id = %self.id))]
    pub fn periodic(&mut self, delta: Duration) -> Result<(), RaftError> {
        self.ensure_running()?;
        self.timeout_elapsed += delta;

        match self.state {
            ServerState::Leader => {
                if self.timeout_elapsed >= self.config.request_timeout() {
                    self.timeout_elapsed = Duration::ZERO;
                    self.send_append_entries_all()?;
                }
            }
            _ => {
                let has_voting_seat =
                    self.nodes.get(self.id).map(|n| n.is_voting()).unwrap_or(false);
                if has_voting_seat && self.timeout_elapsed >= self.election_timeout {
                    self.start_election()?;
                }
            }
        }
        Ok(())
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn is_leader(&self) -> bool {
        self.state == ServerState::Leader
    }

    pub fn current_term(&self) -> Term {
        self.current_term
    }

    pub fn voted_for(&self) -> Option<NodeId> {
        self.voted_for
    }

    /// The leader this node currently follows, if it knows one.
    pub fn current_leader(&self) -> Option<NodeId> {
        self.current_leader
    }

    pub fn commit_idx(&self) -> LogIndex {
        self.commit_idx
    }

    pub fn last_applied_idx(&self) -> LogIndex {
        self.last_applied_idx
    }

    /// Whether a voting-configuration change is waiting to commit.
    pub fn voting_change_in_progress(&self) -> bool {
        self.voting_cfg_change_idx.is_some()
    }

    pub fn log(&self) -> &RaftLog {
        &self.log
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Submit an entry to be replicated; leaders only.
    ///
    /// The entry is stamped with the current term, persisted, provisionally
    /// applied to the membership view if it is a configuration change, and
    /// pushed to every peer. The response tells the submitter where the
    /// entry landed; it is not committed yet.
    #[tracing::instrument(level = "debug", skip(self, entry), fields(id = %self.id, entry_id = entry.id))]
    pub fn client_write(&mut self, mut entry: LogEntry) -> Result<AddEntryResponse, RaftError> {
        self.ensure_running()?;
        if self.state != ServerState::Leader {
            return Err(RaftError::NotLeader);
        }
        if entry.is_voting_cfg_change() && self.voting_cfg_change_idx.is_some() {
            return Err(RaftError::OneVotingChangeOnly);
        }

        entry.term = self.current_term;
        let id = entry.id;
        let idx = self.append_entry_to_log(entry)?;

        // The leader's own replica counts toward the quorum.
        if let Some(me) = self.nodes.get_mut(self.id) {
            me.set_match_idx(idx);
        }

        self.send_append_entries_all()?;
        // A single-node cluster commits immediately.
        self.advance_commit()?;

        Ok(AddEntryResponse {
            term: self.current_term,
            id,
            idx,
        })
    }

    /// Apply exactly one committed entry to the state machine.
    ///
    /// The engine applies committed entries on its own as commits advance;
    /// this is for callers that drive application explicitly.
    pub fn apply_next(&mut self) -> Result<(), RaftError> {
        self.ensure_running()?;
        if self.last_applied_idx >= self.commit_idx {
            return Err(RaftError::NothingToApply);
        }
        self.apply_one()
    }

    pub(crate) fn ensure_running(&self) -> Result<(), RaftError> {
        if self.state == ServerState::Shutdown {
            Err(RaftError::Shutdown)
        } else {
            Ok(())
        }
    }

    /// Route an error from a collaborator: `Shutdown` is terminal.
    pub(crate) fn fatal(&mut self, err: RaftError) -> RaftError {
        if err == RaftError::Shutdown {
            tracing::error!(id = %self.id, "fatal error; entering shutdown");
            self.state = ServerState::Shutdown;
        }
        err
    }

    /// Adopt a higher term observed in a message. Persists before anything
    /// depends on the new term; the vote and known leader reset with it.
    pub(crate) fn update_term(&mut self, term: Term) -> Result<(), RaftError> {
        debug_assert!(term > self.current_term);
        self.storage.save_term(term).map_err(|e| self.fatal(e))?;
        tracing::debug!(id = %self.id, term, "term advanced");
        self.current_term = term;
        self.voted_for = None;
        self.current_leader = None;
        Ok(())
    }

    pub(crate) fn become_follower(&mut self) {
        if self.state != ServerState::Follower {
            tracing::debug!(id = %self.id, term = self.current_term, "becoming follower");
        }
        self.state = ServerState::Follower;
        self.reset_election_timer();
    }

    /// Restart the election clock with a fresh randomized timeout.
    pub(crate) fn reset_election_timer(&mut self) {
        self.timeout_elapsed = Duration::ZERO;
        self.election_timeout = self.config.new_rand_election_timeout();
    }

    /// Append an entry to the log, applying its append-time configuration
    /// effect. Shared by the leader submission path and the follower
    /// replication path.
    pub(crate) fn append_entry_to_log(&mut self, entry: LogEntry) -> Result<LogIndex, RaftError> {
        let kind = entry.kind;
        let target = entry.node;

        let idx = self
            .log
            .append(entry, &mut self.storage)
            .map_err(|e| self.fatal(e))?;

        if kind != EntryKind::Normal {
            self.apply_cfg_change_at_append(kind, target, idx);
        }
        self.check_invariants();
        Ok(idx)
    }

    /// The provisional membership effect of appending a configuration-change
    /// entry. The definitive effect happens at commit; invalidation rolls
    /// this back.
    fn apply_cfg_change_at_append(
        &mut self,
        kind: EntryKind,
        target: Option<NodeId>,
        idx: LogIndex,
    ) {
        let node_id = match target {
            Some(n) => n,
            None => return,
        };

        match kind {
            EntryKind::AddNonVotingNode | EntryKind::AddNode => {
                if !self.nodes.contains(node_id) {
                    let node = self.nodes.add_node(node_id, false);
                    node.set_status(NodeStatus::Connecting);
                    tracing::debug!(node = %node_id, ?kind, "provisionally added node");
                }
            }
            EntryKind::DemoteNode => {
                let _ = self.nodes.set_voting(node_id, false);
            }
            // Removal takes effect only at commit.
            EntryKind::RemoveNode => {}
            EntryKind::Normal => {}
        }

        if matches!(kind, EntryKind::AddNode | EntryKind::DemoteNode) {
            self.voting_cfg_change_idx = Some(idx);
        }
    }

    /// Remove the youngest entry, rolling back any provisional membership
    /// effect it carried.
    pub(crate) fn pop_entry_from_log(&mut self) -> Result<Option<LogEntry>, RaftError> {
        let commit_idx = self.commit_idx;
        let popped = self
            .log
            .pop_back(commit_idx, &mut self.storage)
            .map_err(|e| self.fatal(e))?;

        let entry = match popped {
            Some(e) => e,
            None => return Ok(None),
        };
        let idx = self.log.last_idx() + 1;

        if self.voting_cfg_change_idx == Some(idx) {
            self.voting_cfg_change_idx = None;
        }

        if let Some(node_id) = entry.node {
            match entry.kind {
                EntryKind::AddNonVotingNode | EntryKind::AddNode => {
                    // Only a node this entry provisionally created is still
                    // `Connecting`; a pre-existing member stays.
                    let created_here = self.nodes.get(node_id).map(|n| n.status())
                        == Some(NodeStatus::Connecting);
                    if created_here {
                        let _ = self.nodes.remove_node(node_id);
                        tracing::debug!(node = %node_id, "rolled back provisional node add");
                    }
                }
                EntryKind::DemoteNode => {
                    let _ = self.nodes.set_voting(node_id, true);
                }
                EntryKind::RemoveNode => {}
                EntryKind::Normal => {}
            }
        }

        Ok(Some(entry))
    }

    pub(crate) fn check_invariants(&self) {
        debug_assert!(
            Validate::validate(self).is_ok(),
            "state invariant violated: {:?}",
            Validate::validate(self).err()
        );
    }
}

impl<N, S> Validate for Server<N, S> {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        validit::less_equal!(self.last_applied_idx, self.commit_idx);
        validit::less_equal!(self.commit_idx, self.log.last_idx());
        Ok(())
    }
}
