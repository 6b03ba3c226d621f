//! A named, ordered set of processes forming one replica set.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use super::lifecycle::{LifecycleCell, LifecycleState, Startable};
use super::node::Node;
use crate::error::Result;

/// A replica group: the unit shards and the config-server group are
/// made of. Membership is fixed at construction and ordered; the order
/// is what keeps replica-set address strings deterministic.
///
/// Starting a group starts every member concurrently; members of one
/// group have no ordering constraints among themselves. The group only
/// advances to `Started` once every member came up, so a partially
/// failed start can be retried and will skip the members that already
/// run.
#[derive(Debug)]
pub struct ReplicaGroup {
    name: String,
    members: Vec<Arc<Node>>,
    config_role: bool,
    lifecycle: LifecycleCell,
}

impl ReplicaGroup {
    /// Build a group over `members`, which must be non-empty.
    pub fn new(name: impl Into<String>, members: Vec<Arc<Node>>, config_role: bool) -> Self {
        debug_assert!(!members.is_empty(), "replica group without members");
        Self {
            name: name.into(),
            members,
            config_role,
            lifecycle: LifecycleCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in their fixed construction order.
    pub fn members(&self) -> &[Arc<Node>] {
        &self.members
    }

    /// Whether this group runs the cluster metadata catalog rather
    /// than user data.
    pub fn is_config_role(&self) -> bool {
        self.config_role
    }

    async fn start_members(&self) -> Result<()> {
        let results = join_all(self.members.iter().map(|m| m.start())).await;
        for (member, result) in self.members.iter().zip(results) {
            if let Err(error) = result {
                warn!(
                    group = %self.name,
                    member = %member.name(),
                    %error,
                    "group member failed to start"
                );
                return Err(error);
            }
        }
        Ok(())
    }

    async fn stop_members(&self) -> Result<()> {
        let results = join_all(self.members.iter().map(|m| m.stop())).await;
        let mut first_error = None;
        for (member, result) in self.members.iter().zip(results) {
            if let Err(error) = result {
                warn!(
                    group = %self.name,
                    member = %member.name(),
                    %error,
                    "group member failed to stop"
                );
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

#[async_trait]
impl Startable for ReplicaGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    async fn start(&self) -> Result<()> {
        if !self.lifecycle.state().is_not_started() {
            debug!(group = %self.name, state = %self.lifecycle.state(), "group start skipped");
            return Ok(());
        }
        debug!(group = %self.name, members = self.members.len(), "starting replica group");
        self.start_members().await?;
        self.lifecycle.mark_started();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.lifecycle.state().is_started() {
            debug!(group = %self.name, state = %self.lifecycle.state(), "group stop skipped");
            return Ok(());
        }
        debug!(group = %self.name, "stopping replica group");
        self.stop_members().await?;
        self.lifecycle.mark_stopped();
        Ok(())
    }
}
