//! Error types for cluster orchestration.
//!
//! # Error Handling Patterns
//!
//! Two patterns are used, chosen by operation criticality:
//!
//! ## Fail-Fast (Propagate Errors)
//!
//! Used where partial progress would leave the cluster in a state the
//! caller cannot reason about:
//! - Topology validation and connection-string formatting
//! - Process starts (a failed start surfaces immediately; siblings that
//!   already started are left running for inspection)
//! - Membership convergence (add/remove shard)
//!
//! ## Best-Effort (Log and Continue)
//!
//! Used for teardown, where stopping as much as possible beats stopping
//! at the first failure:
//! - `stop_all` keeps tearing down every remaining unit and reports the
//!   first failure only after the full pass
//!
//! # Convergence Timeouts
//!
//! [`Error::MembershipTimeout`] means the poll budget elapsed before the
//! cluster acknowledged a membership change. It is never swallowed: the
//! shard involved keeps running and stays in the topology (fail-closed),
//! and the caller decides whether the timeout is fatal.

use std::fmt;
use std::time::Duration;

use thiserror::Error as ThisError;

/// Result type for cluster orchestration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which membership flow a convergence wait belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOperation {
    /// Registering a new shard (`addShard` + `listShards` polling).
    Registration,
    /// Draining a shard out (`removeShard` polling).
    Removal,
}

impl MembershipOperation {
    /// String label for log fields and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipOperation::Registration => "registration",
            MembershipOperation::Removal => "removal",
        }
    }
}

impl fmt::Display for MembershipOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while orchestrating a sharded cluster.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The dependency relation handed to the graph executor contains a
    /// cycle.
    ///
    /// Unreachable when the topology is built through the factory
    /// (routers depend on shards and config servers, never the other
    /// way around); checked defensively and treated as a fatal
    /// programming-invariant violation, never retried.
    #[error("dependency cycle detected involving unit '{unit}'")]
    DependencyCycle { unit: String },

    /// A membership change was issued but the cluster did not converge
    /// within the poll budget.
    #[error("shard '{shard}' {operation} did not converge within {timeout:?}")]
    MembershipTimeout {
        shard: String,
        operation: MembershipOperation,
        timeout: Duration,
    },

    /// Configuration error: invalid cluster spec, empty router list when
    /// formatting a connection string, or removing a shard from an empty
    /// topology. Fails fast, before any side effect.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error from the process runtime backend (network create/remove,
    /// process start/stop).
    #[error("runtime error: {0}")]
    Runtime(String),

    /// An administrative command failed or returned a malformed reply.
    #[error("admin command '{command}' failed: {message}")]
    Admin { command: String, message: String },

    /// Serialization error while reading a command reply.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Build an admin error with the command name attached.
    pub fn admin(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Admin {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Check if this is a dependency-cycle violation.
    #[inline]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Error::DependencyCycle { .. })
    }

    /// Check if this is a membership-convergence timeout.
    ///
    /// Useful for callers that tolerate slow clusters and want to rerun
    /// the whole operation rather than fail the test.
    #[inline]
    pub fn is_membership_timeout(&self) -> bool {
        matches!(self, Error::MembershipTimeout { .. })
    }

    /// Check if this is a configuration error (failed fast, no side
    /// effects happened).
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if this error came from a backend (runtime or admin
    /// channel) rather than from orchestration logic.
    #[inline]
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            Error::Runtime(_) | Error::Admin { .. } | Error::Serde(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_cycle_display() {
        let err = Error::DependencyCycle {
            unit: "router1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle detected involving unit 'router1'"
        );
        assert!(err.is_cycle());
        assert!(!err.is_membership_timeout());
        assert!(!err.is_backend());
    }

    #[test]
    fn test_membership_timeout_display() {
        let err = Error::MembershipTimeout {
            shard: "shard2".to_string(),
            operation: MembershipOperation::Registration,
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "shard 'shard2' registration did not converge within 30s"
        );
        assert!(err.is_membership_timeout());
        assert!(!err.is_config());
    }

    #[test]
    fn test_membership_operation_labels() {
        assert_eq!(MembershipOperation::Registration.as_str(), "registration");
        assert_eq!(MembershipOperation::Removal.as_str(), "removal");
        assert_eq!(format!("{}", MembershipOperation::Removal), "removal");
    }

    #[test]
    fn test_config_display() {
        let err = Error::Config("no routers in topology".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: no routers in topology"
        );
        assert!(err.is_config());
        assert!(!err.is_backend());
    }

    #[test]
    fn test_admin_constructor() {
        let err = Error::admin("addShard", "connection refused");
        assert_eq!(
            err.to_string(),
            "admin command 'addShard' failed: connection refused"
        );
        assert!(err.is_backend());
    }

    #[test]
    fn test_runtime_is_backend() {
        let err = Error::Runtime("process already running".to_string());
        assert!(err.is_backend());
        assert!(!err.is_cycle());
        assert!(!err.is_config());
    }

    #[test]
    fn test_serde_conversion() {
        let result: std::result::Result<i64, serde_json::Error> =
            serde_json::from_value(serde_json::json!("not a number"));
        let err: Error = result.unwrap_err().into();
        assert!(err.is_backend());
        assert!(err.to_string().starts_with("serialization error:"));
    }
}
