//! Leader election: the candidate side and the voter side.

use crate::error::RaftError;
use crate::message::VoteRequest;
use crate::message::VoteResponse;
use crate::message::VoteStatus;
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
    /// Start a new election: become candidate in the next term and solicit
    /// votes from every other member.
    #[tracing::instrument(level = "debug", skip(self), fields(id = %self.id))]
    pub(crate) fn start_election(&mut self) -> Result<(), RaftError> {
        let term = self.current_term + 1;
        self.storage.save_term(term).map_err(|e| self.fatal(e))?;
        self.current_term = term;
        self.voted_for = None;
        self.current_leader = None;

        self.storage.save_vote(self.id).map_err(|e| self.fatal(e))?;
        self.voted_for = Some(self.id);

        self.state = ServerState::Candidate;
        self.reset_election_timer();

        self.nodes.clear_votes();
        if let Some(me) = self.nodes.get_mut(self.id) {
            me.set_voted_for_me(true);
        }

        tracing::info!(id = %self.id, term, "starting election");

        let req = VoteRequest {
            term,
            last_log_idx: self.log.last_idx(),
            last_log_term: self.log.last_term(),
        };
        match self.network.vote(&req) {
            Err(RaftError::Shutdown) => return Err(self.fatal(RaftError::Shutdown)),
            // Transient send failures are retried at the next timeout.
            _ => {}
        }

        // A single-node cluster already holds its own quorum.
        if self.nodes.count_votes() >= self.nodes.quorum_size() {
            self.become_leader()?;
        }
        Ok(())
    }

    /// Decide a vote request from `candidate`.
    ///
    /// The response is the return value; the transport relays it back.
    #[tracing::instrument(level = "debug", skip(self, req), fields(id = %self.id, candidate = %candidate))]
    pub fn handle_vote_request(
        &mut self,
        candidate: NodeId,
        req: &VoteRequest,
    ) -> Result<VoteResponse, RaftError> {
        self.ensure_running()?;

        if req.term < self.current_term {
            tracing::debug!(req = %req, term = self.current_term, "rejecting stale vote request");
            return Ok(VoteResponse {
                term: self.current_term,
                vote: VoteStatus::NotGranted,
            });
        }

        if req.term > self.current_term {
            self.update_term(req.term)?;
            self.become_follower();
        }

        let vote = self.vote_decision(candidate, req);
        if vote == VoteStatus::Granted {
            self.storage.save_vote(candidate).map_err(|e| self.fatal(e))?;
            self.voted_for = Some(candidate);
            // Granting a vote concedes the election round: hold off on
            // starting a competing one.
            self.reset_election_timer();
        }

        tracing::debug!(req = %req, ?vote, "vote request decided");
        Ok(VoteResponse {
            term: self.current_term,
            vote,
        })
    }

    /// The §5.2/§5.4 voting rules, in order: known voting member, one vote
    /// per term, and the candidate's log must be at least as up-to-date.
    fn vote_decision(&self, candidate: NodeId, req: &VoteRequest) -> VoteStatus {
        match self.nodes.get(candidate) {
            None => return VoteStatus::UnknownNode,
            Some(n) if !n.is_voting() => return VoteStatus::NotGranted,
            Some(_) => {}
        }

        if let Some(v) = self.voted_for {
            if v != candidate {
                return VoteStatus::NotGranted;
            }
        }

        let our_last_idx = self.log.last_idx();
        let our_last_term = self.log.last_term();
        let up_to_date = req.last_log_term > our_last_term
            || (req.last_log_term == our_last_term && req.last_log_idx >= our_last_idx);

        if up_to_date {
            VoteStatus::Granted
        } else {
            VoteStatus::NotGranted
        }
    }

    /// Count a vote response; on quorum, take leadership.
    #[tracing::instrument(level = "debug", skip(self, resp), fields(id = %self.id, from = %from))]
    pub fn handle_vote_response(
        &mut self,
        from: NodeId,
        resp: &VoteResponse,
    ) -> Result<(), RaftError> {
        self.ensure_running()?;

        if resp.term > self.current_term {
            self.update_term(resp.term)?;
            self.become_follower();
            return Ok(());
        }

        if self.state != ServerState::Candidate || resp.term != self.current_term {
            // A reply from a finished election; nothing to count.
            return Ok(());
        }

        if resp.is_granted() {
            match self.nodes.get_mut(from) {
                Some(n) => n.set_voted_for_me(true),
                None => return Err(RaftError::NodeUnknown),
            }
            if self.nodes.count_votes() >= self.nodes.quorum_size() {
                tracing::debug!(id = %self.id, term = self.current_term, "vote quorum reached");
                self.become_leader()?;
            }
        }
        Ok(())
    }
}
