use std::time::Duration;

use pretty_assertions::assert_eq;
use tickraft::AppendEntriesRequest;
use tickraft::LogEntry;
use tickraft::NodeId;
use tickraft::ServerState;

use crate::fixtures::init_ut_tracing;
use crate::fixtures::scenario_config;
use crate::fixtures::Cluster;

/// Five nodes: the candidate gets two grants, one refusal for a stale log
/// and silence from a partitioned node. Three votes (its own included) are
/// still a quorum of five.
#[test]
fn quorum_despite_refusal_and_partition() -> anyhow::Result<()> {
    init_ut_tracing();

    let mut cluster = Cluster::new(5, &scenario_config());

    tracing::info!("--- node 3 holds an entry node 0 does not have");
    cluster.server_mut(3).handle_append_entries_request(NodeId(4), &AppendEntriesRequest {
        term: 0,
        prev_log_idx: 0,
        prev_log_term: 0,
        leader_commit: 0,
        entries: vec![LogEntry::new_normal(0, 99, Vec::new())],
    })?;
    assert_eq!(1, cluster.server(3).log().last_idx());

    tracing::info!("--- node 4 drops off the network");
    cluster.isolate(4);

    tracing::info!("--- only node 0's clock runs, so only node 0 campaigns");
    cluster
        .server_mut(0)
        .periodic(Duration::from_millis(1000))?;
    assert_eq!(ServerState::Candidate, cluster.server(0).state());
    cluster.deliver_all();

    let candidate = cluster.server(0);
    assert!(candidate.is_leader());
    assert_eq!(1, candidate.current_term());

    tracing::info!("--- nodes 1 and 2 granted; node 3's log kept its vote");
    assert_eq!(None, cluster.server(3).voted_for());
    assert_eq!(Some(NodeId(0)), cluster.server(1).voted_for());
    assert_eq!(Some(NodeId(0)), cluster.server(2).voted_for());

    tracing::info!("--- the partitioned node never heard of the election");
    assert_eq!(0, cluster.server(4).current_term());

    Ok(())
}
