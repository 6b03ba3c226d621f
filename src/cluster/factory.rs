//! Construction of shard groups, the config-server group, and routers.
//!
//! All naming and port allocation funnels through one factory so the
//! resulting topology is deterministic: nodes take consecutive ports
//! in creation order, and shard numbers grow monotonically for the
//! lifetime of the factory. A removed shard's number is never handed
//! out again, which keeps membership changes unambiguous in logs and
//! in the cluster catalog.

use std::collections::HashMap;
use std::sync::Arc;

use super::address::replica_set_address;
use super::config::ClusterSpec;
use super::node::Node;
use super::replica_group::ReplicaGroup;
use super::runtime::ProcessRuntime;
use crate::constants::{
    BIND_IP_FLAG, CONFIGDB_FLAG, CONFIG_GROUP_NAME, CONFIG_ROLE_FLAG, LOOPBACK_ALIAS, PORT_FLAG,
    REPL_SET_FLAG, ROUTER_BINARY, SHARD_NAME_PREFIX, SHARD_ROLE_FLAG,
};
use crate::error::{Error, Result};
use crate::types::HostPort;

pub struct GroupFactory {
    cluster_name: String,
    replica_count: u32,
    client_host: String,
    network: String,
    runtime: Arc<dyn ProcessRuntime>,
    shards_created: u32,
    // Tracked wider than u16 so handing out port 65535 is legal and
    // the walk past it fails instead of wrapping.
    next_port: u32,
}

impl GroupFactory {
    pub fn new(spec: &ClusterSpec, runtime: Arc<dyn ProcessRuntime>) -> Self {
        Self {
            cluster_name: spec.name.clone(),
            replica_count: spec.replica_count,
            client_host: spec.client_host.clone(),
            network: spec.network_name(),
            runtime,
            shards_created: 0,
            next_port: u32::from(spec.base_port),
        }
    }

    /// Build the next shard group. Shard numbers start at 1 and only
    /// ever grow; a failed allocation does not consume a number.
    pub fn next_shard(&mut self) -> Result<Arc<ReplicaGroup>> {
        let number = self.shards_created + 1;
        let group_name = format!("{SHARD_NAME_PREFIX}{number}");
        let member_prefix = format!("{}-{group_name}-replica", self.cluster_name);
        let group = self.replica_group(group_name, &member_prefix, false)?;
        self.shards_created = number;
        Ok(group)
    }

    /// Build the config-server group. Its replica-set name is fixed so
    /// routers can reference it without indirection.
    pub fn config_group(&mut self) -> Result<Arc<ReplicaGroup>> {
        let member_prefix = format!("{}-{CONFIG_GROUP_NAME}", self.cluster_name);
        self.replica_group(CONFIG_GROUP_NAME.to_string(), &member_prefix, true)
    }

    /// Build one router. Routers are numbered from 1 and point at the
    /// config-server group by its named addresses.
    pub fn router(&mut self, index: u32, config_group: &ReplicaGroup) -> Result<Arc<Node>> {
        let name = format!("{}-mongos{index}", self.cluster_name);
        let port = self.allocate_port()?;
        let mut node = self.node(&name, port);
        node.set_command(vec![
            ROUTER_BINARY.to_string(),
            CONFIGDB_FLAG.to_string(),
            replica_set_address(config_group, true),
            PORT_FLAG.to_string(),
            port.to_string(),
            BIND_IP_FLAG.to_string(),
            bind_list(&name),
        ]);
        Ok(Arc::new(node))
    }

    fn replica_group(
        &mut self,
        group_name: String,
        member_prefix: &str,
        config_role: bool,
    ) -> Result<Arc<ReplicaGroup>> {
        let role_flag = if config_role {
            CONFIG_ROLE_FLAG
        } else {
            SHARD_ROLE_FLAG
        };
        let members = (0..self.replica_count)
            .map(|i| {
                let name = format!("{member_prefix}-{i}");
                let port = self.allocate_port()?;
                let mut node = self.node(&name, port);
                node.set_command(vec![
                    role_flag.to_string(),
                    REPL_SET_FLAG.to_string(),
                    group_name.clone(),
                    PORT_FLAG.to_string(),
                    port.to_string(),
                    BIND_IP_FLAG.to_string(),
                    bind_list(&name),
                ]);
                Ok(Arc::new(node))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(ReplicaGroup::new(group_name, members, config_role)))
    }

    fn node(&self, name: &str, port: u16) -> Node {
        Node::new(
            name,
            HostPort::new(name, port),
            HostPort::new(self.client_host.clone(), port),
            self.network.clone(),
            self.runtime.clone(),
        )
    }

    fn allocate_port(&mut self) -> Result<u16> {
        let port = u16::try_from(self.next_port).map_err(|_| {
            Error::Config(format!("no ports left for new nodes above {}", u16::MAX))
        })?;
        self.next_port += 1;
        Ok(port)
    }
}

/// Bind to the loopback alias and to the node's own name, so a process
/// answers both its local health checks and its peers.
fn bind_list(node_name: &str) -> String {
    format!("{LOOPBACK_ALIAS},{node_name}")
}

/// The "starts after" relation of a topology: every router waits for
/// every shard group and for the config-server group. Shard groups and
/// the config-server group are mutually independent.
pub fn dependency_relation(
    shards: &[Arc<ReplicaGroup>],
    config_group: &ReplicaGroup,
    routers: &[Arc<Node>],
) -> HashMap<String, Vec<String>> {
    let upstream: Vec<String> = shards
        .iter()
        .map(|shard| shard.name().to_string())
        .chain(std::iter::once(config_group.name().to_string()))
        .collect();
    routers
        .iter()
        .map(|router| (router.name().to_string(), upstream.clone()))
        .collect()
}
