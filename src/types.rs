//! Shared value types for cluster topology addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A network endpoint as `host:port`.
///
/// Every process in the topology carries two of these: the *named*
/// address it advertises to peers for discovery, and the *client*
/// address the test driver dials. The two may coincide.
///
/// # Usage
///
/// ```
/// use shardonnay::types::HostPort;
///
/// let addr = HostPort::new("shard1-replica-0", 27018);
/// assert_eq!(addr.to_string(), "shard1-replica-0:27018");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostPort {
    /// The host name or IP.
    host: String,
    /// The TCP port.
    port: u16,
}

impl HostPort {
    /// Create a new endpoint.
    #[inline]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the host name.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the port.
    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl From<(String, u16)> for HostPort {
    fn from((host, port): (String, u16)) -> Self {
        Self { host, port }
    }
}

impl From<(&str, u16)> for HostPort {
    fn from((host, port): (&str, u16)) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
