//! Test doubles shared by the unit tests.

#![allow(dead_code)]

use std::time::Duration;

use crate::entry::LogEntry;
use crate::error::RaftError;
use crate::message::AppendEntriesRequest;
use crate::message::VoteRequest;
use crate::message::VoteResponse;
use crate::message::VoteStatus;
use crate::network::RaftNetwork;
use crate::storage::RaftStorage;
use crate::Config;
use crate::LogIndex;
use crate::NodeId;
use crate::Server;
use crate::Term;

/// Records every outbound message; optionally fails the next send.
#[derive(Debug, Default)]
pub(crate) struct MockNetwork {
    pub votes: Vec<VoteRequest>,
    pub appends: Vec<(NodeId, AppendEntriesRequest)>,
    pub fail_next: Option<RaftError>,
}

impl RaftNetwork for MockNetwork {
    fn vote(&mut self, req: &VoteRequest) -> Result<(), RaftError> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        self.votes.push(req.clone());
        Ok(())
    }

    fn append_entries(
        &mut self,
        target: NodeId,
        req: &AppendEntriesRequest,
    ) -> Result<(), RaftError> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        self.appends.push((target, req.clone()));
        Ok(())
    }
}

/// In-memory storage recording every callback; optionally fails the next one.
#[derive(Debug, Default)]
pub(crate) struct MockStorage {
    pub log: Vec<(LogIndex, LogEntry)>,
    pub applied: Vec<(LogIndex, LogEntry)>,
    pub term: Term,
    pub vote: Option<NodeId>,
    pub fail_next: Option<RaftError>,
}

impl MockStorage {
    fn check_fail(&mut self) -> Result<(), RaftError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The ids of applied entries, in application order.
    pub fn applied_ids(&self) -> Vec<u64> {
        self.applied.iter().map(|(_, e)| e.id).collect()
    }
}

impl RaftStorage for MockStorage {
    fn apply_entry(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        self.applied.push((idx, entry.clone()));
        Ok(())
    }

    fn save_vote(&mut self, node: NodeId) -> Result<(), RaftError> {
        self.check_fail()?;
        self.vote = Some(node);
        Ok(())
    }

    fn save_term(&mut self, term: Term) -> Result<(), RaftError> {
        self.check_fail()?;
        self.term = term;
        self.vote = None;
        Ok(())
    }

    fn append_entry(&mut self, entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        self.log.push((idx, entry.clone()));
        Ok(())
    }

    fn pop_front(&mut self, _entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        self.log.retain(|(i, _)| *i != idx);
        Ok(())
    }

    fn pop_back(&mut self, _entry: &LogEntry, idx: LogIndex) -> Result<(), RaftError> {
        self.check_fail()?;
        self.log.retain(|(i, _)| *i != idx);
        Ok(())
    }
}

pub(crate) fn test_config() -> Config {
    Config {
        election_timeout: 500,
        request_timeout: 100,
        ..Default::default()
    }
}

/// A server with voting peers, driven by mock collaborators.
pub(crate) fn server(id: u64, peers: &[u64]) -> Server<MockNetwork, MockStorage> {
    let mut srv = Server::new(
        NodeId(id),
        test_config(),
        MockNetwork::default(),
        MockStorage::default(),
    );
    for p in peers {
        srv.add_node(NodeId(*p), true);
    }
    srv
}

/// Elect `srv` leader by timing it out and granting every peer's vote.
pub(crate) fn make_leader(srv: &mut Server<MockNetwork, MockStorage>) {
    let peers: Vec<NodeId> = srv
        .nodes()
        .iter()
        .map(|n| n.id())
        .filter(|id| *id != srv.id())
        .collect();
    // A full base timeout always crosses the randomized threshold.
    srv.periodic(Duration::from_millis(srv.config().election_timeout * 2))
        .expect("election start");
    let term = srv.current_term();
    for p in peers {
        if srv.is_leader() {
            break;
        }
        srv.handle_vote_response(p, &VoteResponse {
            term,
            vote: VoteStatus::Granted,
        })
        .expect("vote response");
    }
    assert!(srv.is_leader());
    // Discard the traffic generated by the election itself.
    srv.network_mut().votes.clear();
    srv.network_mut().appends.clear();
}
