//! The cluster controller: owns the topology and drives it through
//! its lifecycle and membership changes.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::admin::{
    add_shard_command, enable_sharding_command, list_shards_command, remove_shard_command,
    removal_completed, shard_active, shard_collection_command, AdminConnector,
};
use super::address::{cluster_connection_string, replica_set_address};
use super::config::ClusterSpec;
use super::convergence::await_converged;
use super::factory::{dependency_relation, GroupFactory};
use super::graph::ProcessGraph;
use super::lifecycle::{LifecycleCell, LifecycleState, Startable};
use super::node::Node;
use super::replica_group::ReplicaGroup;
use super::runtime::ProcessRuntime;
use crate::error::{Error, MembershipOperation, Result};

/// A sharded database cluster under test: shard replica groups, one
/// config-server group, and a set of stateless routers, all joined to
/// one private network.
///
/// Construction is passive; nothing runs until [`start`] is called.
/// Membership operations take `&mut self`, so the borrow checker
/// guarantees a single writer per cluster. The catalog accepts and
/// drains shards asynchronously, and every membership change here
/// blocks until the catalog has converged, so a returned `Ok` means
/// the cluster agrees with the in-memory topology.
///
/// [`start`]: ShardedCluster::start
pub struct ShardedCluster {
    spec: ClusterSpec,
    network: String,
    runtime: Arc<dyn ProcessRuntime>,
    admin: Arc<dyn AdminConnector>,
    factory: GroupFactory,
    graph: ProcessGraph,
    config_group: Arc<ReplicaGroup>,
    shards: Vec<Arc<ReplicaGroup>>,
    routers: Vec<Arc<Node>>,
    lifecycle: LifecycleCell,
    network_active: bool,
}

impl ShardedCluster {
    /// Build the full topology described by `spec` without starting
    /// anything. Ports and names are assigned here, in creation order:
    /// config servers, then shards, then routers.
    pub fn new(
        spec: ClusterSpec,
        runtime: Arc<dyn ProcessRuntime>,
        admin: Arc<dyn AdminConnector>,
    ) -> Result<Self> {
        spec.validate()?;
        let network = spec.network_name();
        let mut factory = GroupFactory::new(&spec, runtime.clone());

        let config_group = factory.config_group()?;
        let shards = (0..spec.shard_count)
            .map(|_| factory.next_shard())
            .collect::<Result<Vec<_>>>()?;
        let routers = (1..=spec.router_count)
            .map(|i| factory.router(i, &config_group))
            .collect::<Result<Vec<_>>>()?;
        let graph = ProcessGraph::new(dependency_relation(&shards, &config_group, &routers));

        info!(
            cluster = %spec.name,
            shards = spec.shard_count,
            replicas = spec.replica_count,
            routers = spec.router_count,
            "built cluster topology"
        );
        Ok(Self {
            spec,
            network,
            runtime,
            admin,
            factory,
            graph,
            config_group,
            shards,
            routers,
            lifecycle: LifecycleCell::new(),
            network_active: false,
        })
    }

    // ==========================================================================
    // Lifecycle
    // ==========================================================================

    /// Bring the whole cluster up: create the network, start every
    /// unit in dependency order, then register the seed shards with
    /// the catalog.
    ///
    /// Startup is idempotent once it has fully succeeded. After a
    /// failure the cluster stays in its initial phase: a retry picks
    /// up where the last attempt left off, and [`stop`] tears down
    /// whatever did come up.
    ///
    /// [`stop`]: ShardedCluster::stop
    pub async fn start(&mut self) -> Result<()> {
        if !self.lifecycle.state().is_not_started() {
            debug!(
                cluster = %self.spec.name,
                state = %self.lifecycle.state(),
                "cluster start skipped"
            );
            return Ok(());
        }
        info!(cluster = %self.spec.name, "starting sharded cluster");
        if !self.network_active {
            self.runtime.create_network(&self.network).await?;
            self.network_active = true;
        }
        self.graph.start_all(&self.units()).await?;
        for shard in &self.shards {
            self.register_shard(shard).await?;
        }
        self.lifecycle.mark_started();
        info!(
            cluster = %self.spec.name,
            shards = self.shards.len(),
            routers = self.routers.len(),
            "sharded cluster started"
        );
        Ok(())
    }

    /// Tear the cluster down: stop every unit in reverse dependency
    /// order, then release the network.
    ///
    /// Before anything was ever started this is a complete no-op, and
    /// after a completed stop it is one too; the network is released
    /// exactly once. Teardown is best effort: every unit and the
    /// network get their stop attempt, the cluster always ends up
    /// stopped, and the first failure is reported once everything has
    /// been attempted.
    pub async fn stop(&mut self) -> Result<()> {
        if self.lifecycle.state().is_stopped() {
            debug!(cluster = %self.spec.name, "cluster stop skipped, already stopped");
            return Ok(());
        }
        if self.lifecycle.state().is_not_started() && !self.network_active {
            debug!(cluster = %self.spec.name, "cluster stop skipped, nothing was started");
            return Ok(());
        }
        info!(cluster = %self.spec.name, "stopping sharded cluster");
        let mut first_failure = self.graph.stop_all(&self.units()).await.err();
        if self.network_active {
            if let Err(error) = self.runtime.remove_network(&self.network).await {
                warn!(cluster = %self.spec.name, %error, "failed to release the cluster network");
                first_failure.get_or_insert(error);
            }
            self.network_active = false;
        }
        self.lifecycle.mark_stopped();
        info!(cluster = %self.spec.name, "sharded cluster stopped");
        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    // ==========================================================================
    // Membership
    // ==========================================================================

    /// Grow the cluster by one shard and return its name.
    ///
    /// The new group starts directly; the dependency relation is not
    /// revisited, routers are already up. The shard only joins the
    /// in-memory topology after the catalog has confirmed it, so a
    /// registration timeout leaves the topology unchanged (the
    /// orphaned group keeps running for the caller to inspect).
    pub async fn add_shard(&mut self) -> Result<String> {
        let shard = self.factory.next_shard()?;
        info!(shard = %shard.name(), "adding shard to a running cluster");
        shard.start().await?;
        self.register_shard(&shard).await?;
        let name = shard.name().to_string();
        self.shards.push(shard);
        info!(shard = %name, total = self.shards.len(), "shard joined the topology");
        Ok(name)
    }

    /// Drain and remove the most recently added shard, returning its
    /// name. Removal is strictly last-in-first-out.
    ///
    /// The catalog drains a shard asynchronously; re-issuing the
    /// removal command is how progress is observed. Until the drain is
    /// confirmed the shard stays in the topology and keeps running, so
    /// a timeout never strands data that was still being migrated.
    pub async fn remove_shard(&mut self) -> Result<String> {
        let shard = self
            .shards
            .last()
            .cloned()
            .ok_or_else(|| Error::Config("no shards left to remove".to_string()))?;
        info!(shard = %shard.name(), "draining shard");
        let connection_string = self.connection_string()?;
        let session = self.admin.connect(&connection_string).await?;
        let converged = await_converged(&self.spec.poll, || {
            let session = &session;
            let name = shard.name();
            async move {
                let reply = session.run_command(remove_shard_command(name)).await?;
                Ok(removal_completed(&reply))
            }
        })
        .await?;
        if !converged {
            warn!(
                shard = %shard.name(),
                timeout = ?self.spec.poll.timeout,
                "shard removal timed out, shard stays in the topology"
            );
            return Err(Error::MembershipTimeout {
                shard: shard.name().to_string(),
                operation: MembershipOperation::Removal,
                timeout: self.spec.poll.timeout,
            });
        }
        drop(session);

        // The catalog confirmed the drain; only now does the shard
        // leave the topology and get shut down.
        self.shards.pop();
        shard.stop().await?;
        let name = shard.name().to_string();
        info!(shard = %name, remaining = self.shards.len(), "shard removed");
        Ok(name)
    }

    /// Register `shard` with the catalog through a router and wait for
    /// it to report as active.
    async fn register_shard(&self, shard: &ReplicaGroup) -> Result<()> {
        let address = replica_set_address(shard, false);
        info!(shard = %shard.name(), %address, "registering shard");
        let session = self.admin.connect(&self.connection_string()?).await?;
        session.run_command(add_shard_command(&address)).await?;
        let converged = await_converged(&self.spec.poll, || {
            let session = &session;
            async move {
                let reply = session.run_command(list_shards_command()).await?;
                shard_active(&reply, shard.name())
            }
        })
        .await?;
        if !converged {
            warn!(
                shard = %shard.name(),
                timeout = ?self.spec.poll.timeout,
                "shard registration timed out"
            );
            return Err(Error::MembershipTimeout {
                shard: shard.name().to_string(),
                operation: MembershipOperation::Registration,
                timeout: self.spec.poll.timeout,
            });
        }
        debug!(shard = %shard.name(), "shard active in the catalog");
        Ok(())
    }

    // ==========================================================================
    // Data Plane
    // ==========================================================================

    /// Enable sharding for a database. Fire and forget: the command is
    /// acknowledged by the router, no convergence wait applies.
    pub async fn enable_sharding(&self, database: &str) -> Result<()> {
        let session = self.admin.connect(&self.connection_string()?).await?;
        session
            .run_command(enable_sharding_command(database))
            .await?;
        debug!(database, "sharding enabled");
        Ok(())
    }

    /// Shard a collection on a hashed key. Hashed keys spread writes
    /// evenly across shards regardless of key distribution, which is
    /// the behavior integration tests want.
    pub async fn shard_collection(
        &self,
        database: &str,
        collection: &str,
        key: &str,
    ) -> Result<()> {
        let session = self.admin.connect(&self.connection_string()?).await?;
        session
            .run_command(shard_collection_command(database, collection, key))
            .await?;
        debug!(database, collection, key, "collection sharded");
        Ok(())
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    /// The connection string a test driver uses: all routers' client
    /// addresses, and nothing else.
    pub fn connection_string(&self) -> Result<String> {
        cluster_connection_string(&self.routers)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Current shard names, oldest first.
    pub fn shard_names(&self) -> Vec<String> {
        self.shards
            .iter()
            .map(|shard| shard.name().to_string())
            .collect()
    }

    pub fn shards(&self) -> &[Arc<ReplicaGroup>] {
        &self.shards
    }

    pub fn config_group(&self) -> &ReplicaGroup {
        &self.config_group
    }

    pub fn routers(&self) -> &[Arc<Node>] {
        &self.routers
    }

    fn units(&self) -> Vec<Arc<dyn Startable>> {
        let mut units: Vec<Arc<dyn Startable>> =
            Vec::with_capacity(self.shards.len() + 1 + self.routers.len());
        for shard in &self.shards {
            units.push(shard.clone() as Arc<dyn Startable>);
        }
        units.push(self.config_group.clone() as Arc<dyn Startable>);
        for router in &self.routers {
            units.push(router.clone() as Arc<dyn Startable>);
        }
        units
    }
}

impl fmt::Debug for ShardedCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCluster")
            .field("name", &self.spec.name)
            .field("state", &self.lifecycle.state())
            .field("shards", &self.shard_names())
            .field("routers", &self.routers.len())
            .finish_non_exhaustive()
    }
}
