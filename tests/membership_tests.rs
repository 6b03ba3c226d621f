//! Integration tests for shard membership: registration convergence,
//! last-in-first-out removal, name monotonicity, and the data-plane
//! admin commands.

use std::sync::Arc;
use std::time::Duration;

use shardonnay::cluster::{
    ClusterSpec, MockAdmin, MockRuntime, PollPolicy, ShardedCluster, ShardedCollection,
};

/// Spec with a millisecond-scale poll budget so convergence and
/// timeout paths both finish quickly.
fn spec(name: &str, shards: u32) -> ClusterSpec {
    ClusterSpec {
        name: name.to_string(),
        shard_count: shards,
        poll: PollPolicy::new(Duration::from_millis(2), Duration::from_millis(100)),
        ..ClusterSpec::default()
    }
}

fn harness(spec: ClusterSpec) -> (ShardedCluster, Arc<MockRuntime>, Arc<MockAdmin>) {
    let runtime = Arc::new(MockRuntime::new());
    let admin = Arc::new(MockAdmin::new());
    let cluster =
        ShardedCluster::new(spec, runtime.clone(), admin.clone()).expect("spec should be valid");
    (cluster, runtime, admin)
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_seed_registration_uses_client_addresses() {
    let (mut cluster, _runtime, admin) = harness(spec("memb", 1));

    cluster.start().await.unwrap();

    // The catalog is handed the addresses a driver can dial, not the
    // internal per-node names.
    assert_eq!(
        admin.shard_address("shard1").await.as_deref(),
        Some("shard1/127.0.0.1:27018")
    );
}

#[tokio::test]
async fn test_add_shard_converges_with_lagging_catalog() {
    let (mut cluster, runtime, admin) = harness(spec("lag", 1));
    cluster.start().await.unwrap();
    admin.set_registration_lag(3).await;

    let added = cluster.add_shard().await.unwrap();

    assert_eq!(added, "shard2");
    assert_eq!(cluster.shard_names(), vec!["shard1", "shard2"]);
    assert_eq!(admin.active_shard_count().await, 2);
    assert!(runtime.is_running("lag-shard2-replica-0").await);
}

#[tokio::test]
async fn test_registration_timeout_fails_start_closed() {
    let (mut cluster, runtime, admin) = harness(spec("slowreg", 1));
    admin.set_registration_lag(10_000).await;

    let err = cluster.start().await.unwrap_err();

    assert!(err.is_membership_timeout());
    assert!(err.to_string().contains("registration"));
    assert!(cluster.state().is_not_started());
    // The group kept running for inspection; stop still cleans up.
    assert!(runtime.is_running("slowreg-shard1-replica-0").await);
    cluster.stop().await.unwrap();
    assert_eq!(runtime.running_count().await, 0);
}

// ============================================================================
// Removal
// ============================================================================

#[tokio::test]
async fn test_remove_shard_is_lifo() {
    let (mut cluster, runtime, admin) = harness(spec("lifo", 3));
    cluster.start().await.unwrap();

    let removed = cluster.remove_shard().await.unwrap();

    assert_eq!(removed, "shard3");
    assert_eq!(cluster.shard_names(), vec!["shard1", "shard2"]);
    assert_eq!(admin.shard_names().await, vec!["shard1", "shard2"]);
    assert!(!runtime.is_running("lifo-shard3-replica-0").await);
    assert!(runtime.is_running("lifo-shard2-replica-0").await);
}

#[tokio::test]
async fn test_removal_polls_until_the_drain_completes() {
    let (mut cluster, _runtime, admin) = harness(spec("drain", 2));
    cluster.start().await.unwrap();
    admin.set_removal_lag(4).await;

    let removed = cluster.remove_shard().await.unwrap();

    assert_eq!(removed, "shard2");
    assert_eq!(admin.shard_names().await, vec!["shard1"]);
    // One removeShard call per poll until the catalog reported the
    // drain complete.
    let removals = admin
        .commands()
        .await
        .iter()
        .filter(|c| *c == "removeShard")
        .count();
    assert_eq!(removals, 5);
}

#[tokio::test]
async fn test_remove_timeout_keeps_the_shard() {
    let (mut cluster, runtime, admin) = harness(spec("stuck", 1));
    cluster.start().await.unwrap();
    admin.freeze_removals().await;

    let err = cluster.remove_shard().await.unwrap_err();

    assert!(err.is_membership_timeout());
    assert!(err.to_string().contains("removal"));
    // Fail closed: the shard stays in the topology, keeps running, and
    // stays registered.
    assert_eq!(cluster.shard_names(), vec!["shard1"]);
    assert!(runtime.is_running("stuck-shard1-replica-0").await);
    assert_eq!(admin.shard_names().await, vec!["shard1"]);
}

#[tokio::test]
async fn test_remove_on_empty_topology_is_a_config_error() {
    let (mut cluster, _runtime, _admin) = harness(spec("empty", 0));
    cluster.start().await.unwrap();

    let err = cluster.remove_shard().await.unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn test_shard_names_are_monotonic_across_removal() {
    let (mut cluster, _runtime, admin) = harness(spec("mono", 1));
    cluster.start().await.unwrap();

    assert_eq!(cluster.add_shard().await.unwrap(), "shard2");
    assert_eq!(cluster.remove_shard().await.unwrap(), "shard2");
    // The freed number is never handed out again.
    assert_eq!(cluster.add_shard().await.unwrap(), "shard3");
    assert_eq!(cluster.shard_names(), vec!["shard1", "shard3"]);
    assert_eq!(admin.shard_names().await, vec!["shard1", "shard3"]);
}

// ============================================================================
// Data Plane
// ============================================================================

#[tokio::test]
async fn test_data_plane_commands_reach_the_catalog() {
    let (mut cluster, _runtime, admin) = harness(spec("data", 1));
    cluster.start().await.unwrap();

    cluster.enable_sharding("app").await.unwrap();
    cluster
        .shard_collection("app", "events", "user_id")
        .await
        .unwrap();

    assert_eq!(admin.enabled_databases().await, vec!["app"]);
    assert_eq!(
        admin.sharded_collections().await,
        vec![ShardedCollection {
            database: "app".to_string(),
            collection: "events".to_string(),
            key: "user_id".to_string(),
            kind: "hashed".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_admin_sessions_dial_only_routers() {
    let (mut cluster, _runtime, admin) = harness(ClusterSpec {
        router_count: 2,
        ..spec("conn", 1)
    });

    cluster.start().await.unwrap();
    cluster.enable_sharding("app").await.unwrap();

    let expected = cluster.connection_string().unwrap();
    assert_eq!(expected, "mongodb://127.0.0.1:27019,127.0.0.1:27020");
    let connections = admin.connections().await;
    assert!(!connections.is_empty());
    assert!(connections.iter().all(|c| c == &expected));
    // One session per operation, not per poll: seed registration plus
    // enableSharding.
    assert_eq!(admin.connect_count(), 2);
}
