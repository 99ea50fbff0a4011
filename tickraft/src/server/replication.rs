//! Log replication: the append-entries exchange and the leader lifecycle.

use std::time::Duration;

use crate::entry::LogEntry;
use crate::error::RaftError;
use crate::message::AppendEntriesRequest;
use crate::message::AppendEntriesResponse;
use crate::network::RaftNetwork;
use crate::server::Server;
use crate::server::ServerState;
use crate::storage::RaftStorage;
use crate::NodeId;

impl<N, S> Server<N, S>
where
    N: RaftNetwork,
    S: RaftStorage,
{
    /// Establish leadership after winning an election.
    ///
    /// Every peer's replication state restarts from the leader's log end,
    /// and a no-op entry in the new term is appended at once: committing it
    /// is what lets entries from earlier terms commit too.
    pub(crate) fn become_leader(&mut self) -> Result<(), RaftError> {
        tracing::info!(id = %self.id, term = self.current_term, "becoming leader");
        self.state = ServerState::Leader;
        self.current_leader = Some(self.id);
        self.timeout_elapsed = Duration::ZERO;

        let next_idx = self.log.last_idx() + 1;
        let my_id = self.id;
        for node in self.nodes.iter_mut() {
            if node.id() == my_id {
                continue;
            }
            node.set_next_idx(next_idx);
            node.set_match_idx(0);
            node.set_has_sufficient_logs(false);
        }

        let noop = LogEntry::new_normal(self.current_term, 0, Vec::new());
        let idx = self.append_entry_to_log(noop)?;
        if let Some(me) = self.nodes.get_mut(my_id) {
            me.set_match_idx(idx);
        }

        self.send_append_entries_all()?;
        // A single-node cluster commits by itself.
        self.advance_commit()
    }

    /// Send append-entries (an empty one is the heartbeat) to every peer.
    pub(crate) fn send_append_entries_all(&mut self) -> Result<(), RaftError> {
        let my_id = self.id;
        let peers: Vec<NodeId> = self
            .nodes
            .iter()
            .map(|n| n.id())
            .filter(|id| *id != my_id)
            .collect();
        for peer in peers {
            self.send_append_entries(peer)?;
        }
        Ok(())
    }

    /// Send one append-entries request to `target`, starting at its
    /// `next_idx`.
    pub(crate) fn send_append_entries(&mut self, target: NodeId) -> Result<(), RaftError> {
        let next_idx = match self.nodes.get(target) {
            Some(n) => n.next_idx(),
            None => return Err(RaftError::NodeUnknown),
        };
        // A follower may acknowledge a longer (stale-term) log than ours;
        // never ask for entries we do not have.
        let next_idx = next_idx.min(self.log.last_idx() + 1);

        let prev_log_idx = next_idx - 1;
        let prev_log_term = match self.log.term_at(prev_log_idx) {
            Some(t) => t,
            // The entry before `next_idx` is compacted away: only a
            // snapshot transfer could catch this follower up.
            None => return Err(self.fatal(RaftError::Shutdown)),
        };

        let req = AppendEntriesRequest {
            term: self.current_term,
            prev_log_idx,
            prev_log_term,
            leader_commit: self.commit_idx,
            entries: self.log.slice(next_idx, self.config.max_payload_entries),
        };
        tracing::debug!(id = %self.id, target = %target, req = %req, "sending append-entries");

        match self.network.append_entries(target, &req) {
            Err(RaftError::Shutdown) => Err(self.fatal(RaftError::Shutdown)),
            // Transient failures are retried on the next heartbeat.
            _ => Ok(()),
        }
    }

    /// Handle a replication request from `leader`.
    ///
    /// The response is the return value; the transport relays it back.
    #[tracing::instrument(level = "debug", skip(self, req), fields(id = %self.id, leader = %leader))]
    pub fn handle_append_entries_request(
        &mut self,
        leader: NodeId,
        req: &AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RaftError> {
        self.ensure_running()?;

        if req.term < self.current_term {
            tracing::debug!(req = %req, term = self.current_term, "rejecting stale append-entries");
            return Ok(self.append_reject());
        }

        if req.term > self.current_term {
            self.update_term(req.term)?;
        }
        // An equal-term candidate concedes to the established leader.
        if self.state != ServerState::Follower {
            self.become_follower();
        } else {
            self.reset_election_timer();
        }
        self.current_leader = Some(leader);

        // Consistency check: our entry at `prev_log_idx` must match.
        if req.prev_log_idx > 0 {
            match self.log.term_at(req.prev_log_idx) {
                Some(t) if t == req.prev_log_term => {}
                Some(_) => {
                    // A term clash at `prev_log_idx` condemns everything
                    // after it as well; shed that suffix before rejecting.
                    tracing::debug!(req = %req, "log mismatch at prev index");
                    while self.log.last_idx() > req.prev_log_idx {
                        self.pop_entry_from_log()?;
                    }
                    return Ok(self.append_reject());
                }
                None => {
                    tracing::debug!(req = %req, "no entry at prev index");
                    return Ok(self.append_reject());
                }
            }
        }

        // Walk the entries: skip what we already hold (idempotent
        // re-delivery), truncate a conflicting suffix, append the rest.
        let mut first_new = req.entries.len();
        for (i, entry) in req.entries.iter().enumerate() {
            let at = req.prev_log_idx + 1 + i as u64;
            match self.log.get(at) {
                Some(existing) if existing.term == entry.term => continue,
                Some(_) => {
                    tracing::debug!(idx = at, "truncating conflicting suffix");
                    while self.log.last_idx() >= at {
                        self.pop_entry_from_log()?;
                    }
                    first_new = i;
                    break;
                }
                None => {
                    first_new = i;
                    break;
                }
            }
        }

        let mut first_idx = 0;
        for entry in &req.entries[first_new..] {
            let at = self.append_entry_to_log(entry.clone())?;
            if first_idx == 0 {
                first_idx = at;
            }
        }

        if req.leader_commit > self.commit_idx {
            let new_commit = req.leader_commit.min(self.log.last_idx());
            self.set_commit_idx(new_commit);
        }
        self.apply_committed()?;

        Ok(AppendEntriesResponse {
            term: self.current_term,
            success: true,
            current_idx: self.log.last_idx(),
            first_idx,
        })
    }

    fn append_reject(&self) -> AppendEntriesResponse {
        AppendEntriesResponse {
            term: self.current_term,
            success: false,
            current_idx: self.log.last_idx(),
            first_idx: 0,
        }
    }

    /// Handle a follower's response, advancing its replication state and the
    /// commit index, or backing up `next_idx` after a mismatch.
    #[tracing::instrument(level = "debug", skip(self, resp), fields(id = %self.id, from = %from))]
    pub fn handle_append_entries_response(
        &mut self,
        from: NodeId,
        resp: &AppendEntriesResponse,
    ) -> Result<(), RaftError> {
        self.ensure_running()?;

        if resp.term > self.current_term {
            self.update_term(resp.term)?;
            self.become_follower();
            return Ok(());
        }

        if self.state != ServerState::Leader || resp.term != self.current_term {
            // A reply from an earlier leadership; nothing to track.
            return Ok(());
        }

        let last_idx = self.log.last_idx();
        let node = match self.nodes.get_mut(from) {
            Some(n) => n,
            None => return Err(RaftError::NodeUnknown),
        };

        if resp.success {
            let match_idx = node.match_idx().max(resp.current_idx);
            node.set_match_idx(match_idx);
            node.set_next_idx(match_idx + 1);

            // A caught-up non-voter is ready for promotion.
            if !node.is_voting() && !node.has_sufficient_logs() && match_idx >= last_idx {
                node.set_has_sufficient_logs(true);
                tracing::info!(id = %self.id, node = %from, "non-voting node has sufficient logs");
            }

            let next_idx = match_idx + 1;
            self.advance_commit()?;

            // Keep streaming while the follower is behind.
            if next_idx <= self.log.last_idx() {
                self.send_append_entries(from)?;
            }
        } else {
            // Back up, jumping with the follower's hint, and retry at once.
            let next_idx = node
                .next_idx()
                .saturating_sub(1)
                .min(resp.current_idx + 1)
                .max(1);
            node.set_next_idx(next_idx);
            tracing::debug!(id = %self.id, node = %from, next_idx, "append-entries rejected; backing up");
            self.send_append_entries(from)?;
        }
        Ok(())
    }
}
