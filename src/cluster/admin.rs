//! Administrative command channel to the cluster.
//!
//! All control-plane traffic (shard registration, removal, sharding
//! setup) goes through a router's admin namespace. The channel is
//! abstracted as two traits: [`AdminConnector`] dials a connection
//! string, [`AdminSession`] runs commands on the resulting connection.
//! Commands and replies are `serde_json` documents, mirroring the
//! database's own command shape without pulling in its wire protocol.
//!
//! Sessions are scoped: every orchestration operation connects, runs
//! its commands, and drops the session before returning. Dropping the
//! session releases the underlying connection on every exit path, so
//! no implementation may require an explicit close call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::constants::{
    ADD_SHARD_COMMAND, ENABLE_SHARDING_COMMAND, HASHED_KEY, LIST_SHARDS_COMMAND,
    REMOVE_SHARD_COMMAND, REMOVE_STATE_COMPLETED, SHARD_COLLECTION_COMMAND,
    SHARD_COLLECTION_KEY_FIELD, SHARD_STATE_ACTIVE, SHARDS_FIELD, STATE_FIELD,
};
use crate::error::{Error, Result};

/// Dials the cluster's admin namespace through a router.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    /// Open an admin session against the given connection string.
    async fn connect(&self, connection_string: &str) -> Result<Box<dyn AdminSession>>;
}

/// One open admin connection.
///
/// `run_command` takes `&self` so a polling loop can issue the same
/// query repeatedly without re-dialing; implementations use interior
/// mutability where they need per-command state.
#[async_trait]
pub trait AdminSession: Send + Sync {
    /// Run a command document and return the reply document.
    async fn run_command(&self, command: Value) -> Result<Value>;
}

// =============================================================================
// Command Documents
// =============================================================================

/// `addShard` with the shard's replica-set address (client addresses).
pub fn add_shard_command(address: &str) -> Value {
    json!({ ADD_SHARD_COMMAND: address })
}

/// `removeShard` for the named shard.
pub fn remove_shard_command(shard_name: &str) -> Value {
    json!({ REMOVE_SHARD_COMMAND: shard_name })
}

/// `listShards` membership query.
pub fn list_shards_command() -> Value {
    json!({ LIST_SHARDS_COMMAND: 1 })
}

/// `enableSharding` for a database.
pub fn enable_sharding_command(database: &str) -> Value {
    json!({ ENABLE_SHARDING_COMMAND: database })
}

/// `shardCollection` over a hashed key.
pub fn shard_collection_command(database: &str, collection: &str, key: &str) -> Value {
    json!({
        SHARD_COLLECTION_COMMAND: format!("{database}.{collection}"),
        SHARD_COLLECTION_KEY_FIELD: { key: HASHED_KEY },
    })
}

/// The command a document invokes: its first (and defining) key.
pub fn command_name(command: &Value) -> Option<&str> {
    command.as_object().and_then(|m| m.keys().next()).map(String::as_str)
}

// =============================================================================
// Reply Readers
// =============================================================================

/// One record in a `listShards` reply.
///
/// Replies carry more fields (host string, tags); only the identifier
/// and the membership state matter here, the rest is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardEntry {
    /// The shard's name.
    #[serde(rename = "_id")]
    pub id: String,
    /// Numeric membership state; `1` is active.
    #[serde(default)]
    pub state: i64,
}

impl ShardEntry {
    /// Check if the cluster reports this shard as active.
    pub fn is_active(&self) -> bool {
        self.state == SHARD_STATE_ACTIVE
    }
}

/// Extract the shard records from a `listShards` reply.
///
/// A reply without a `shards` list is malformed and reported as an
/// admin error rather than treated as an empty cluster.
pub fn shard_entries(reply: &Value) -> Result<Vec<ShardEntry>> {
    let entries = reply
        .get(SHARDS_FIELD)
        .ok_or_else(|| {
            Error::admin(
                LIST_SHARDS_COMMAND,
                format!("reply missing '{SHARDS_FIELD}' field"),
            )
        })?
        .clone();
    Ok(serde_json::from_value(entries)?)
}

/// Check whether a `listShards` reply shows the named shard as active.
pub fn shard_active(reply: &Value, shard_name: &str) -> Result<bool> {
    Ok(shard_entries(reply)?
        .iter()
        .any(|entry| entry.id == shard_name && entry.is_active()))
}

/// Check whether a `removeShard` reply reports the drain as completed.
///
/// Mid-drain replies carry other state literals (`started`, `ongoing`);
/// a missing field just means "keep polling".
pub fn removal_completed(reply: &Value) -> bool {
    reply.get(STATE_FIELD).and_then(Value::as_str) == Some(REMOVE_STATE_COMPLETED)
}
