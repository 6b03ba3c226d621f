//! Integration tests for deterministic topology construction: process
//! names, port assignment, launch commands, and address formatting as
//! seen through the public cluster API.

use std::sync::Arc;

use shardonnay::cluster::{
    replica_set_address, ClusterSpec, MockAdmin, MockRuntime, ShardedCluster,
};

fn build(spec: ClusterSpec) -> ShardedCluster {
    ShardedCluster::new(spec, Arc::new(MockRuntime::new()), Arc::new(MockAdmin::new()))
        .expect("spec should be valid")
}

fn topo_spec() -> ClusterSpec {
    ClusterSpec {
        name: "topo".to_string(),
        shard_count: 1,
        replica_count: 2,
        router_count: 1,
        ..ClusterSpec::default()
    }
}

#[test]
fn test_same_spec_yields_the_same_topology() {
    let first = build(topo_spec());
    let second = build(topo_spec());

    assert_eq!(first.shard_names(), second.shard_names());
    assert_eq!(
        first.connection_string().unwrap(),
        second.connection_string().unwrap()
    );
    let named = |c: &ShardedCluster| -> Vec<String> {
        c.shards()[0]
            .members()
            .iter()
            .map(|m| m.named_address().to_string())
            .collect()
    };
    assert_eq!(named(&first), named(&second));
}

#[test]
fn test_ports_are_gapless_in_creation_order() {
    let cluster = build(topo_spec());

    // Creation order: config servers, then shards, then routers.
    let mut ports: Vec<u16> = cluster
        .config_group()
        .members()
        .iter()
        .chain(cluster.shards()[0].members())
        .map(|m| m.client_address().port())
        .collect();
    ports.extend(cluster.routers().iter().map(|r| r.client_address().port()));

    assert_eq!(ports, vec![27017, 27018, 27019, 27020, 27021]);
}

#[test]
fn test_port_range_may_end_exactly_at_the_last_port() {
    // A span that ends at 65535 inclusive is valid; the last node
    // really is handed the last port.
    let cluster = build(ClusterSpec {
        name: "top".to_string(),
        shard_count: 0,
        base_port: 65534,
        ..ClusterSpec::default()
    });

    assert_eq!(
        cluster.config_group().members()[0].client_address().port(),
        65534
    );
    assert_eq!(cluster.routers()[0].client_address().port(), 65535);
}

#[test]
fn test_shard_member_launch_command() {
    let cluster = build(topo_spec());

    let member = &cluster.shards()[0].members()[0];
    assert_eq!(member.named_address().host(), "topo-shard1-replica-0");
    assert_eq!(
        member.command(),
        &[
            "--shardsvr",
            "--replSet",
            "shard1",
            "--port",
            "27019",
            "--bind_ip",
            "localhost,topo-shard1-replica-0",
        ]
    );
}

#[test]
fn test_config_member_launch_command() {
    let cluster = build(topo_spec());

    let member = &cluster.config_group().members()[0];
    assert_eq!(
        member.command(),
        &[
            "--configsvr",
            "--replSet",
            "configdb",
            "--port",
            "27017",
            "--bind_ip",
            "localhost,topo-configdb-0",
        ]
    );
}

#[test]
fn test_router_launch_command_references_config_servers_by_name() {
    let cluster = build(topo_spec());

    assert_eq!(
        cluster.routers()[0].command(),
        &[
            "mongos",
            "--configdb",
            "configdb/topo-configdb-0:27017,topo-configdb-1:27018",
            "--port",
            "27021",
            "--bind_ip",
            "localhost,topo-mongos1",
        ]
    );
}

#[test]
fn test_replica_set_addresses_switch_between_views() {
    let cluster = build(topo_spec());
    let shard = &cluster.shards()[0];

    assert_eq!(
        replica_set_address(shard, true),
        "shard1/topo-shard1-replica-0:27019,topo-shard1-replica-1:27020"
    );
    assert_eq!(
        replica_set_address(shard, false),
        "shard1/127.0.0.1:27019,127.0.0.1:27020"
    );
}

#[test]
fn test_connection_string_lists_only_router_client_addresses() {
    let cluster = build(ClusterSpec {
        router_count: 3,
        ..topo_spec()
    });

    // Config servers take 27017-27018, the shard 27019-27020, routers
    // the next three.
    assert_eq!(
        cluster.connection_string().unwrap(),
        "mongodb://127.0.0.1:27021,127.0.0.1:27022,127.0.0.1:27023"
    );
}
