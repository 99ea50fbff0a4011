use std::time::Duration;

use pretty_assertions::assert_eq;
use tickraft::EntryKind;
use tickraft::LogEntry;
use tickraft::NodeId;
use tickraft::RaftError;

use crate::fixtures::init_ut_tracing;
use crate::fixtures::scenario_config;
use crate::fixtures::Cluster;

/// Only one voting-configuration change may be in flight; the next one has
/// to wait for the first to commit.
#[test]
fn one_voting_change_at_a_time() -> anyhow::Result<()> {
    init_ut_tracing();

    let mut cluster = Cluster::new(3, &scenario_config());
    let leader = cluster.run_until_leader(50, Duration::from_millis(100))?;

    tracing::info!("--- the first voting change is accepted");
    let srv = cluster.server_mut(leader.0);
    srv.client_write(LogEntry::new_cfg_change(0, 50, EntryKind::AddNode, NodeId(3)))?;
    assert!(srv.voting_change_in_progress());

    tracing::info!("--- the second is refused while the first is uncommitted");
    let res = srv.client_write(LogEntry::new_cfg_change(0, 51, EntryKind::AddNode, NodeId(4)));
    assert_eq!(Some(RaftError::OneVotingChangeOnly), res.err());

    tracing::info!("--- committing the first reopens the gate");
    cluster.deliver_all();

    let srv = cluster.server_mut(leader.0);
    assert!(!srv.voting_change_in_progress());
    assert!(srv.nodes().get(NodeId(3)).map(|n| n.is_voting()).unwrap_or(false));

    let res = srv.client_write(LogEntry::new_cfg_change(0, 51, EntryKind::AddNode, NodeId(4)));
    assert!(res.is_ok());

    tracing::info!("--- the followers adopted the same membership");
    cluster.deliver_all();
    cluster.step(Duration::from_millis(100));
    cluster.deliver_all();
    for node in [0, 1, 2] {
        let srv = cluster.server(node);
        assert!(srv.nodes().contains(NodeId(3)), "node {}", node);
        assert!(srv.nodes().contains(NodeId(4)), "node {}", node);
    }

    Ok(())
}
