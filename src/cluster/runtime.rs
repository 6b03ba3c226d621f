//! Process runtime trait for launching and tearing down cluster members.
//!
//! The orchestration core never touches containers or OS processes
//! directly; everything goes through [`ProcessRuntime`]. This keeps the
//! core deterministic and lets tests run against `MockRuntime` while
//! production harnesses plug in a container backend.
//!
//! The runtime contract is intentionally small: named networks for
//! inter-process traffic, and named processes joined to one network
//! with a flat argument list. Address assignment, ordering, and
//! idempotence all live above this seam.

use async_trait::async_trait;

use crate::error::Result;

/// Everything the runtime needs to launch one cluster member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Logical process name; unique within the cluster, also the
    /// process's stable network identity on the cluster network.
    pub name: String,
    /// Name of the network the process joins.
    pub network: String,
    /// Flat ordered launch arguments, assigned before start.
    pub command: Vec<String>,
}

/// Backend that runs the cluster's processes.
///
/// Implementations must tolerate being called from a single orchestrator
/// task; calls are never issued concurrently for the same process name.
/// Errors are reported as [`Error::Runtime`](crate::error::Error::Runtime)
/// with a message describing the backend failure.
#[async_trait]
pub trait ProcessRuntime: Send + Sync {
    /// Create the named network the cluster's processes communicate on.
    async fn create_network(&self, name: &str) -> Result<()>;

    /// Remove the named network. Called exactly once per cluster, after
    /// every process has been stopped; removing a network that does not
    /// exist is an error.
    async fn remove_network(&self, name: &str) -> Result<()>;

    /// Launch a process. Starting a name that is already running is an
    /// error; the orchestration layer guards against it.
    async fn start_process(&self, spec: &ProcessSpec) -> Result<()>;

    /// Stop a running process by name.
    async fn stop_process(&self, name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_spec_is_plain_data() {
        let spec = ProcessSpec {
            name: "test-mongo-shard1-replica-0".to_string(),
            network: "test-mongo-net".to_string(),
            command: vec!["--shardsvr".to_string(), "--port".to_string()],
        };
        let clone = spec.clone();
        assert_eq!(spec, clone);
        assert_eq!(clone.command.len(), 2);
    }
}
