//! A single cluster process and its network identities.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::lifecycle::{LifecycleCell, LifecycleState, Startable};
use super::runtime::{ProcessRuntime, ProcessSpec};
use crate::error::Result;
use crate::types::HostPort;

/// One process in the topology: a shard member, a config-server member,
/// or a router.
///
/// A node carries two addresses, fixed at construction: the *named*
/// address (host equals the node name, the identity peers discover it
/// under) and the *client* address (reachable from the test driver).
/// Launch arguments are assigned by the factory before the node is
/// shared; after that the node is immutable apart from its lifecycle
/// phase.
pub struct Node {
    name: String,
    named_address: HostPort,
    client_address: HostPort,
    network: String,
    command: Vec<String>,
    lifecycle: LifecycleCell,
    runtime: Arc<dyn ProcessRuntime>,
}

impl Node {
    /// Create a node with no launch arguments yet.
    pub fn new(
        name: impl Into<String>,
        named_address: HostPort,
        client_address: HostPort,
        network: impl Into<String>,
        runtime: Arc<dyn ProcessRuntime>,
    ) -> Self {
        Self {
            name: name.into(),
            named_address,
            client_address,
            network: network.into(),
            command: Vec::new(),
            lifecycle: LifecycleCell::new(),
            runtime,
        }
    }

    /// Assign the launch arguments. Must happen before `start()` and
    /// before the node is shared; the factory is the only caller.
    pub fn set_command(&mut self, command: Vec<String>) {
        self.command = command;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address peers discover this node under.
    pub fn named_address(&self) -> &HostPort {
        &self.named_address
    }

    /// The address the test driver dials.
    pub fn client_address(&self) -> &HostPort {
        &self.client_address
    }

    /// The launch arguments assigned by the factory.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    fn spec(&self) -> ProcessSpec {
        ProcessSpec {
            name: self.name.clone(),
            network: self.network.clone(),
            command: self.command.clone(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("named_address", &self.named_address)
            .field("client_address", &self.client_address)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}

#[async_trait]
impl Startable for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    async fn start(&self) -> Result<()> {
        if !self.lifecycle.state().is_not_started() {
            debug!(
                process = %self.name,
                state = %self.lifecycle.state(),
                "process start skipped"
            );
            return Ok(());
        }
        debug!(process = %self.name, "starting process");
        self.runtime.start_process(&self.spec()).await?;
        self.lifecycle.mark_started();
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.lifecycle.state().is_started() {
            debug!(
                process = %self.name,
                state = %self.lifecycle.state(),
                "process stop skipped"
            );
            return Ok(());
        }
        debug!(process = %self.name, "stopping process");
        self.runtime.stop_process(&self.name).await?;
        self.lifecycle.mark_stopped();
        Ok(())
    }
}
