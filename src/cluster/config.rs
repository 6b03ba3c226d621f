//! Cluster topology configuration.

use std::str::FromStr;
use std::time::Duration;

use super::convergence::PollPolicy;
use crate::constants::{
    DEFAULT_BASE_PORT, DEFAULT_CLIENT_HOST, DEFAULT_CLUSTER_NAME, DEFAULT_REPLICA_COUNT,
    DEFAULT_ROUTER_COUNT, DEFAULT_SHARD_COUNT,
};
use crate::error::{Error, Result};

pub const ENV_SHARD_COUNT: &str = "SHARDONNAY_SHARD_COUNT";
pub const ENV_REPLICA_COUNT: &str = "SHARDONNAY_REPLICA_COUNT";
pub const ENV_ROUTER_COUNT: &str = "SHARDONNAY_ROUTER_COUNT";
pub const ENV_BASE_PORT: &str = "SHARDONNAY_BASE_PORT";

/// The shape of a cluster before anything runs: how many shards to
/// seed, how wide each replica group is, how many routers front the
/// cluster, and where client-facing ports start.
///
/// `shard_count` may be zero; shards can always be added later. Every
/// replica group needs at least one member and the cluster needs at
/// least one router, or there is nothing to connect to.
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    /// Prefix for every process name and for the cluster network.
    pub name: String,
    /// Shard groups seeded at startup.
    pub shard_count: u32,
    /// Members per replica group, shards and config servers alike.
    pub replica_count: u32,
    /// Stateless routers fronting the cluster.
    pub router_count: u32,
    /// First client-facing port; every further node takes the next
    /// consecutive port in creation order.
    pub base_port: u16,
    /// Host the test driver dials, as opposed to the per-node names
    /// that cluster processes resolve internally.
    pub client_host: String,
    /// Pacing for membership convergence polls.
    pub poll: PollPolicy,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLUSTER_NAME.to_string(),
            shard_count: DEFAULT_SHARD_COUNT,
            replica_count: DEFAULT_REPLICA_COUNT,
            router_count: DEFAULT_ROUTER_COUNT,
            base_port: DEFAULT_BASE_PORT,
            client_host: DEFAULT_CLIENT_HOST.to_string(),
            poll: PollPolicy::default(),
        }
    }
}

impl ClusterSpec {
    /// Build a spec from the defaults with `SHARDONNAY_*` environment
    /// overrides applied, then validate it.
    pub fn from_env() -> Result<Self> {
        let mut spec = Self::default();
        env_override(ENV_SHARD_COUNT, &mut spec.shard_count)?;
        env_override(ENV_REPLICA_COUNT, &mut spec.replica_count)?;
        env_override(ENV_ROUTER_COUNT, &mut spec.router_count)?;
        env_override(ENV_BASE_PORT, &mut spec.base_port)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check that the configured shape describes a cluster that can exist.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("cluster name must not be empty".to_string()));
        }
        if self.replica_count == 0 {
            return Err(Error::Config(
                "replica groups need at least one member".to_string(),
            ));
        }
        if self.router_count == 0 {
            return Err(Error::Config(
                "the cluster needs at least one router".to_string(),
            ));
        }
        if self.poll.interval == Duration::ZERO {
            return Err(Error::Config(
                "the membership poll interval must not be zero".to_string(),
            ));
        }
        // Shard groups, the config-server group, and the routers each
        // take one consecutive port per node.
        let span = u64::from(self.replica_count) * (u64::from(self.shard_count) + 1)
            + u64::from(self.router_count);
        if u64::from(self.base_port) + span > u64::from(u16::MAX) + 1 {
            return Err(Error::Config(format!(
                "port range starting at {} cannot fit {} nodes",
                self.base_port, span
            )));
        }
        Ok(())
    }

    /// Name of the network every cluster process joins.
    pub fn network_name(&self) -> String {
        format!("{}-net", self.name)
    }
}

fn env_override<T: FromStr>(key: &str, target: &mut T) -> Result<()> {
    if let Ok(raw) = std::env::var(key) {
        *target = raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value '{raw}' for {key}")))?;
    }
    Ok(())
}
