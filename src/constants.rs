//! Centralized protocol and configuration constants.
//!
//! This module consolidates the literals the orchestration layer shares
//! with the database processes it drives: command names, launch flags,
//! state codes, and topology defaults. Having them in one place makes it
//! easy to see the full surface the cluster is spoken to through.
//!
//! # Categories
//!
//! - **Admin Commands**: command and reply field names on the admin channel
//! - **Launch Arguments**: flags handed to shard/config/router processes
//! - **Topology Defaults**: counts, naming, ports
//! - **Convergence**: membership polling budget

// =============================================================================
// Admin Commands
// =============================================================================

/// Command registering a shard with the cluster.
///
/// Parameter: the shard's replica-set address string (client addresses).
/// The reply is only checked for failure; registration completion is
/// observed separately via [`LIST_SHARDS_COMMAND`].
pub const ADD_SHARD_COMMAND: &str = "addShard";

/// Command draining a shard out of the cluster.
///
/// Parameter: the shard name. The command is polled repeatedly; its own
/// reply carries a `state` field that ends at [`REMOVE_STATE_COMPLETED`].
pub const REMOVE_SHARD_COMMAND: &str = "removeShard";

/// Query returning the cluster's current membership view.
///
/// The reply's `shards` list holds one record per shard with an `_id`
/// and an integer `state` whose active value is [`SHARD_STATE_ACTIVE`].
pub const LIST_SHARDS_COMMAND: &str = "listShards";

/// Command enabling sharding for a database.
pub const ENABLE_SHARDING_COMMAND: &str = "enableSharding";

/// Command sharding a collection by key.
pub const SHARD_COLLECTION_COMMAND: &str = "shardCollection";

/// Reply field carrying a shard record's identifier in `listShards`.
pub const SHARD_ID_FIELD: &str = "_id";

/// Reply field carrying a state code or state literal.
pub const STATE_FIELD: &str = "state";

/// Reply field carrying the shard records in a `listShards` reply.
pub const SHARDS_FIELD: &str = "shards";

/// Parameter field carrying the key layout in `shardCollection`.
pub const SHARD_COLLECTION_KEY_FIELD: &str = "key";

/// Integer state code for an active shard in `listShards`.
pub const SHARD_STATE_ACTIVE: i64 = 1;

/// Terminal `state` literal in a `removeShard` reply.
pub const REMOVE_STATE_COMPLETED: &str = "completed";

/// Key layout literal for hashed sharding; the only key kind supported.
pub const HASHED_KEY: &str = "hashed";

// =============================================================================
// Launch Arguments
// =============================================================================

/// Role flag marking a process as a shard server.
pub const SHARD_ROLE_FLAG: &str = "--shardsvr";

/// Role flag marking a process as a config server.
pub const CONFIG_ROLE_FLAG: &str = "--configsvr";

/// Flag declaring the replica-set name a member belongs to.
pub const REPL_SET_FLAG: &str = "--replSet";

/// Flag declaring the port a member listens on.
pub const PORT_FLAG: &str = "--port";

/// Flag declaring the addresses a member binds.
///
/// The value is always `localhost,<named-host>` so the process is
/// reachable both from co-located peers and under its advertised
/// network identity.
pub const BIND_IP_FLAG: &str = "--bind_ip";

/// Loopback alias included in every bind list.
pub const LOOPBACK_ALIAS: &str = "localhost";

/// Binary name for router processes.
pub const ROUTER_BINARY: &str = "mongos";

/// Router flag pointing at the config-server replica set.
pub const CONFIGDB_FLAG: &str = "--configdb";

/// Scheme prefix of cluster connection strings.
pub const CONNECTION_SCHEME: &str = "mongodb://";

// =============================================================================
// Topology Defaults
// =============================================================================

/// Default number of shards in a freshly built cluster.
pub const DEFAULT_SHARD_COUNT: u32 = 1;

/// Default number of members per replica group.
pub const DEFAULT_REPLICA_COUNT: u32 = 1;

/// Default number of routers.
pub const DEFAULT_ROUTER_COUNT: u32 = 1;

/// Default cluster name, used as the prefix of every process name.
pub const DEFAULT_CLUSTER_NAME: &str = "test-mongo";

/// Default host for client addresses (reachable from the test driver).
pub const DEFAULT_CLIENT_HOST: &str = "127.0.0.1";

/// First port handed out by the deterministic port allocator.
pub const DEFAULT_BASE_PORT: u16 = 27017;

/// Replica-set name of the config-server group.
///
/// Fixed, not derived from the cluster name: routers reference it in
/// their `--configdb` argument and the literal is conventional.
pub const CONFIG_GROUP_NAME: &str = "configdb";

/// Prefix of generated shard names (`shard1`, `shard2`, ...).
///
/// The numeric suffix is monotonic over the cluster's lifetime and
/// never reused, even after a shard is removed.
pub const SHARD_NAME_PREFIX: &str = "shard";

// =============================================================================
// Convergence
// =============================================================================

/// Default interval between membership polls (1 second).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Default total budget for a membership change to converge (30 seconds).
pub const DEFAULT_CONVERGENCE_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_budget_is_consistent() {
        // The budget must allow for at least one poll.
        assert!(DEFAULT_CONVERGENCE_TIMEOUT_SECS >= DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn test_role_flags_are_distinct() {
        assert_ne!(SHARD_ROLE_FLAG, CONFIG_ROLE_FLAG);
    }

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn test_default_counts_give_a_runnable_cluster() {
        // One shard, one member each, one router is the smallest
        // cluster that can serve a request end to end.
        assert!(DEFAULT_REPLICA_COUNT >= 1);
        assert!(DEFAULT_ROUTER_COUNT >= 1);
        assert!(DEFAULT_SHARD_COUNT >= 1);
    }

    #[test]
    fn test_connection_scheme_shape() {
        assert!(CONNECTION_SCHEME.ends_with("://"));
    }
}
