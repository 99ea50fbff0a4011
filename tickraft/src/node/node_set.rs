use std::collections::BTreeMap;

use crate::error::RaftError;
use crate::node::Node;
use crate::LogIndex;
use crate::NodeId;

/// The cluster membership view: every known member, self included.
///
/// The set is mutated only when a configuration-change entry is appended
/// (provisionally) and when it commits or is invalidated; the server drives
/// those transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: BTreeMap<NodeId, Node>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Adding an existing id is a no-op that returns the
    /// existing record.
    pub(crate) fn add_node(&mut self, id: NodeId, voting: bool) -> &mut Node {
        self.nodes.entry(id).or_insert_with(|| Node::new(id, voting))
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> Result<Node, RaftError> {
        self.nodes.remove(&id).ok_or(RaftError::NodeUnknown)
    }

    pub(crate) fn set_voting(&mut self, id: NodeId, voting: bool) -> Result<(), RaftError> {
        let node = self.nodes.get_mut(&id).ok_or(RaftError::NodeUnknown)?;
        node.set_voting(voting);
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Every member, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// The members holding a voting seat.
    pub fn voters(&self) -> impl Iterator<Item = &Node> {
        self.iter().filter(|n| n.is_voting())
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn voting_count(&self) -> usize {
        self.voters().count()
    }

    /// `⌊V/2⌋ + 1` over the current voting members.
    pub fn quorum_size(&self) -> usize {
        self.voting_count() / 2 + 1
    }

    /// Number of voting members that granted their vote this election.
    pub fn count_votes(&self) -> usize {
        self.voters().filter(|n| n.voted_for_me()).count()
    }

    /// Number of voting members whose match index has reached `idx`.
    pub fn count_voting_matches(&self, idx: LogIndex) -> usize {
        self.voters().filter(|n| n.match_idx() >= idx).count()
    }

    pub(crate) fn clear_votes(&mut self) {
        for node in self.iter_mut() {
            node.set_voted_for_me(false);
        }
    }
}
