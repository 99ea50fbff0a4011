use std::time::Duration;

use maplit::btreeset;
use pretty_assertions::assert_eq;

use crate::fixtures::init_ut_tracing;
use crate::fixtures::scenario_config;
use crate::fixtures::Cluster;

/// Three idle nodes; one of them must time out first, win the votes of the
/// others and settle as the only leader.
#[test]
fn leader_appears() -> anyhow::Result<()> {
    init_ut_tracing();

    let mut cluster = Cluster::new(3, &scenario_config());

    let leader = cluster.run_until_leader(50, Duration::from_millis(100))?;
    tracing::info!(leader = %leader, "--- elected");

    assert_eq!(vec![leader], cluster.leaders());

    tracing::info!("--- every node agrees on the term and the leader");
    let term = cluster.server(0).current_term();
    assert!(term >= 1);
    for srv in cluster.servers.values() {
        assert_eq!(term, srv.current_term());
        assert_eq!(Some(leader), srv.current_leader());
    }

    tracing::info!("--- leadership is stable under further ticks");
    for _ in 0..10 {
        cluster.step(Duration::from_millis(100));
    }
    cluster.deliver_all();
    assert_eq!(vec![leader], cluster.leaders());
    assert_eq!(
        btreeset! {term},
        cluster.servers.values().map(|s| s.current_term()).collect()
    );

    Ok(())
}
