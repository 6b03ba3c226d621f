//! Deterministic address formatting for replica sets and routers.
//!
//! Two audiences read these strings. Cluster processes resolve each
//! other by node name on the shared network, so anything handed to a
//! peer uses named addresses. The test driver sits outside that
//! network and dials client addresses. Formatting is pure and stable:
//! the same topology always yields the same string.

use std::sync::Arc;

use super::node::Node;
use super::replica_group::ReplicaGroup;
use crate::constants::CONNECTION_SCHEME;
use crate::error::{Error, Result};

/// Format a replica-set address: `<group>/<addr1>,<addr2>,...` with
/// members in their fixed group order.
///
/// `use_named_address` selects the audience: `true` for strings handed
/// to other cluster processes, `false` for strings that leave the
/// cluster network.
pub fn replica_set_address(group: &ReplicaGroup, use_named_address: bool) -> String {
    let members = group
        .members()
        .iter()
        .map(|member| {
            if use_named_address {
                member.named_address().to_string()
            } else {
                member.client_address().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("{}/{members}", group.name())
}

/// Format the cluster connection string over the routers' client
/// addresses: `mongodb://<addr1>,<addr2>,...`.
///
/// Only routers appear here; shard and config-server members are never
/// dialed directly by the test driver.
pub fn cluster_connection_string(routers: &[Arc<Node>]) -> Result<String> {
    if routers.is_empty() {
        return Err(Error::Config(
            "cannot format a connection string without routers".to_string(),
        ));
    }
    let addresses = routers
        .iter()
        .map(|router| router.client_address().to_string())
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("{CONNECTION_SCHEME}{addresses}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::mock_backend::MockRuntime;
    use crate::cluster::runtime::ProcessRuntime;
    use crate::types::HostPort;

    fn node(name: &str, client_host: &str, port: u16, runtime: Arc<dyn ProcessRuntime>) -> Arc<Node> {
        Arc::new(Node::new(
            name,
            HostPort::new(name, port),
            HostPort::new(client_host, port),
            "test-mongo-net",
            runtime,
        ))
    }

    fn group(runtime: Arc<MockRuntime>) -> ReplicaGroup {
        let members = vec![
            node("test-mongo-shard1-replica-0", "127.0.0.1", 27020, runtime.clone()),
            node("test-mongo-shard1-replica-1", "127.0.0.1", 27021, runtime.clone()),
        ];
        ReplicaGroup::new("shard1", members, false)
    }

    #[test]
    fn test_named_and_client_addresses_differ_per_member() {
        let runtime = Arc::new(MockRuntime::new());
        let group = group(runtime);

        assert_eq!(
            replica_set_address(&group, true),
            "shard1/test-mongo-shard1-replica-0:27020,test-mongo-shard1-replica-1:27021"
        );
        assert_eq!(
            replica_set_address(&group, false),
            "shard1/127.0.0.1:27020,127.0.0.1:27021"
        );
    }

    #[test]
    fn test_address_forms_coincide_when_hosts_do() {
        let runtime = Arc::new(MockRuntime::new());
        let member = Arc::new(Node::new(
            "configdb-0",
            HostPort::new("shared-host", 27019),
            HostPort::new("shared-host", 27019),
            "test-mongo-net",
            runtime as Arc<dyn ProcessRuntime>,
        ));
        let group = ReplicaGroup::new("configdb", vec![member], true);

        assert_eq!(
            replica_set_address(&group, true),
            replica_set_address(&group, false)
        );
    }

    #[test]
    fn test_replica_set_address_is_stable() {
        let runtime = Arc::new(MockRuntime::new());
        let group = group(runtime);

        let first = replica_set_address(&group, true);
        let second = replica_set_address(&group, true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_connection_string_spans_router_clients_only() {
        let runtime = Arc::new(MockRuntime::new());
        let routers = vec![
            node("test-mongo-mongos1", "127.0.0.1", 27017, runtime.clone()),
            node("test-mongo-mongos2", "127.0.0.1", 27018, runtime.clone()),
        ];

        assert_eq!(
            cluster_connection_string(&routers).unwrap(),
            "mongodb://127.0.0.1:27017,127.0.0.1:27018"
        );
    }

    #[test]
    fn test_connection_string_requires_a_router() {
        let error = cluster_connection_string(&[]).unwrap_err();
        assert!(error.is_config());
    }
}
