use std::time::Duration;

use pretty_assertions::assert_eq;

use crate::fixtures::init_ut_tracing;
use crate::fixtures::scenario_config;
use crate::fixtures::Cluster;

/// Three client entries end up identical, committed and applied in order on
/// every node.
#[test]
fn client_writes_replicate_in_order() -> anyhow::Result<()> {
    init_ut_tracing();

    let mut cluster = Cluster::new(3, &scenario_config());
    let leader = cluster.run_until_leader(50, Duration::from_millis(100))?;

    for (id, payload) in [(1, "a"), (2, "b"), (3, "c")] {
        cluster.write_normal(leader.0, id, payload.as_bytes())?;
    }

    tracing::info!("--- one heartbeat carries the final commit index to the followers");
    cluster.step(Duration::from_millis(100));
    cluster.deliver_all();

    tracing::info!("--- every log carries the client entries in order");
    for node in 0..3 {
        assert_eq!(vec![1, 2, 3], cluster.client_log_ids(node), "node {}", node);
    }

    tracing::info!("--- the commit index covers the leader's no-op plus three entries");
    for srv in cluster.servers.values() {
        assert_eq!(4, srv.commit_idx(), "node {}", srv.id());
        assert_eq!(4, srv.last_applied_idx(), "node {}", srv.id());
    }

    tracing::info!("--- the state machines applied the same sequence");
    for node in 0..3 {
        let applied: Vec<u64> = cluster
            .server(node)
            .storage()
            .applied_ids()
            .into_iter()
            .filter(|id| *id != 0)
            .collect();
        assert_eq!(vec![1, 2, 3], applied, "node {}", node);
    }

    Ok(())
}
