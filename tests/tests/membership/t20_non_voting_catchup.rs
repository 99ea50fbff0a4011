use std::time::Duration;

use pretty_assertions::assert_eq;
use tickraft::Config;
use tickraft::EntryKind;
use tickraft::NodeId;
use tickraft::NodeStatus;

use crate::fixtures::init_ut_tracing;
use crate::fixtures::scenario_config;
use crate::fixtures::Cluster;

/// A fresh node joins without a voting seat, streams the whole log, and is
/// promoted once the leader sees it caught up.
#[test]
fn non_voting_node_catches_up_then_votes() -> anyhow::Result<()> {
    init_ut_tracing();

    let mut cluster = Cluster::new(3, &scenario_config());
    let leader = cluster.run_until_leader(50, Duration::from_millis(100))?;

    for id in [1, 2] {
        cluster.write_normal(leader.0, id, b"payload")?;
    }

    tracing::info!("--- node 3 starts outside the voting configuration");
    cluster.add_server(NodeId(3), Config {
        self_is_voting: false,
        ..scenario_config()
    });
    cluster.write_cfg_change(leader.0, 50, EntryKind::AddNonVotingNode, 3)?;

    tracing::info!("--- the whole log streamed over and the leader noticed");
    {
        let srv = cluster.server(leader.0);
        let node = srv.nodes().get(NodeId(3)).expect("node 3 on the leader");
        assert!(!node.is_voting());
        assert_eq!(srv.log().last_idx(), node.match_idx());
        assert!(node.has_sufficient_logs());
        assert_eq!(2, srv.nodes().quorum_size());
    }
    assert_eq!(
        cluster.server(leader.0).log().last_idx(),
        cluster.server(3).log().last_idx()
    );

    tracing::info!("--- the promotion commits and every voter agrees");
    cluster.write_cfg_change(leader.0, 51, EntryKind::AddNode, 3)?;
    cluster.step(Duration::from_millis(100));
    cluster.deliver_all();

    let srv = cluster.server(leader.0);
    let node = srv.nodes().get(NodeId(3)).expect("node 3 on the leader");
    assert!(node.is_voting());
    assert_eq!(NodeStatus::Connected, node.status());
    assert_eq!(3, srv.nodes().quorum_size());

    tracing::info!("--- node 3 learned of its own seat from the log");
    assert!(cluster.server(3).nodes().get(NodeId(3)).map(|n| n.is_voting()).unwrap_or(false));

    Ok(())
}
