//! In-memory process runtime and admin endpoint for tests.
//!
//! `MockRuntime` stands in for the containerized process backend: it
//! tracks networks and processes, records every transition in an
//! event log, and enforces the ordering rules a real backend would
//! (no process without its network, no double starts, no removing a
//! network twice). `MockAdmin` stands in for the routers' admin
//! endpoint and models the eventually consistent catalog: a shard
//! added via `addShard` stays pending for a configurable number of
//! `listShards` polls, and `removeShard` drains over a configurable
//! number of calls before reporting completion.
//!
//! Both are cheap to clone through their shared state and safe to use
//! from concurrent tasks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::admin::{command_name, AdminConnector, AdminSession};
use super::runtime::{ProcessRuntime, ProcessSpec};
use crate::constants::{
    ADD_SHARD_COMMAND, ENABLE_SHARDING_COMMAND, LIST_SHARDS_COMMAND, REMOVE_SHARD_COMMAND,
    REMOVE_STATE_COMPLETED, SHARDS_FIELD, SHARD_COLLECTION_COMMAND, SHARD_COLLECTION_KEY_FIELD,
    SHARD_ID_FIELD, STATE_FIELD,
};
use crate::error::{Error, Result};

// ==========================================================================
// Mock Process Runtime
// ==========================================================================

#[derive(Debug, Clone)]
struct MockProcess {
    spec: ProcessSpec,
    running: bool,
}

#[derive(Debug, Default)]
struct MockRuntimeState {
    networks: Vec<String>,
    processes: Vec<MockProcess>,
    fail_start: Vec<String>,
    events: Vec<String>,
}

impl MockRuntimeState {
    fn process_mut(&mut self, name: &str) -> Option<&mut MockProcess> {
        self.processes.iter_mut().find(|p| p.spec.name == name)
    }

    fn process(&self, name: &str) -> Option<&MockProcess> {
        self.processes.iter().find(|p| p.spec.name == name)
    }
}

/// Process backend that runs nothing and remembers everything.
#[derive(Debug, Default)]
pub struct MockRuntime {
    state: Arc<RwLock<MockRuntimeState>>,
    starts: AtomicU32,
    stops: AtomicU32,
    network_removals: AtomicU32,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next start of `name` fail. The injection is consumed
    /// by that one failure; a retry succeeds.
    pub async fn fail_start_once(&self, name: &str) {
        self.state.write().await.fail_start.push(name.to_string());
    }

    pub async fn is_running(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .process(name)
            .is_some_and(|p| p.running)
    }

    pub async fn running_count(&self) -> usize {
        self.state
            .read()
            .await
            .processes
            .iter()
            .filter(|p| p.running)
            .count()
    }

    pub async fn process_command(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .await
            .process(name)
            .map(|p| p.spec.command.clone())
    }

    pub async fn network_exists(&self, name: &str) -> bool {
        self.state.read().await.networks.iter().any(|n| n == name)
    }

    /// Every transition in order: `create-network`, `remove-network`,
    /// `start`, `stop`, each followed by the subject's name.
    pub async fn event_log(&self) -> Vec<String> {
        self.state.read().await.events.clone()
    }

    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn network_removal_count(&self) -> u32 {
        self.network_removals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRuntime for MockRuntime {
    async fn create_network(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.networks.iter().any(|n| n == name) {
            return Err(Error::Runtime(format!("network '{name}' already exists")));
        }
        state.networks.push(name.to_string());
        state.events.push(format!("create-network {name}"));
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(position) = state.networks.iter().position(|n| n == name) else {
            return Err(Error::Runtime(format!("network '{name}' does not exist")));
        };
        state.networks.remove(position);
        state.events.push(format!("remove-network {name}"));
        self.network_removals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start_process(&self, spec: &ProcessSpec) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(position) = state.fail_start.iter().position(|n| *n == spec.name) {
            state.fail_start.remove(position);
            return Err(Error::Runtime(format!(
                "injected start failure for '{}'",
                spec.name
            )));
        }
        if !state.networks.iter().any(|n| *n == spec.network) {
            return Err(Error::Runtime(format!(
                "network '{}' does not exist",
                spec.network
            )));
        }
        if state.process(&spec.name).is_some_and(|p| p.running) {
            return Err(Error::Runtime(format!(
                "process '{}' is already running",
                spec.name
            )));
        }
        state.processes.retain(|p| p.spec.name != spec.name);
        state.processes.push(MockProcess {
            spec: spec.clone(),
            running: true,
        });
        state.events.push(format!("start {}", spec.name));
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_process(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        match state.process_mut(name) {
            Some(process) if process.running => process.running = false,
            _ => return Err(Error::Runtime(format!("process '{name}' is not running"))),
        }
        state.events.push(format!("stop {name}"));
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ==========================================================================
// Mock Admin Endpoint
// ==========================================================================

/// A collection recorded by a `shardCollection` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardedCollection {
    pub database: String,
    pub collection: String,
    pub key: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
struct MockShardEntry {
    name: String,
    address: String,
    polls_until_active: u32,
    removal_polls_left: Option<u32>,
}

#[derive(Debug, Default)]
struct MockAdminState {
    shards: Vec<MockShardEntry>,
    registration_lag: u32,
    removal_lag: u32,
    freeze_removals: bool,
    databases: Vec<String>,
    collections: Vec<ShardedCollection>,
    connections: Vec<String>,
    commands: Vec<String>,
}

/// Admin endpoint modeling an eventually consistent cluster catalog.
#[derive(Debug, Default)]
pub struct MockAdmin {
    state: Arc<RwLock<MockAdminState>>,
    connects: AtomicU32,
}

impl MockAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `listShards` polls a newly added shard reports as
    /// pending before turning active. Zero means immediately active.
    pub async fn set_registration_lag(&self, polls: u32) {
        self.state.write().await.registration_lag = polls;
    }

    /// Number of `removeShard` calls a drain stays in progress before
    /// completing. Zero completes on the first call.
    pub async fn set_removal_lag(&self, polls: u32) {
        self.state.write().await.removal_lag = polls;
    }

    /// Make every drain report as in progress forever.
    pub async fn freeze_removals(&self) {
        self.state.write().await.freeze_removals = true;
    }

    pub async fn shard_names(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .shards
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    pub async fn shard_address(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .await
            .shards
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.address.clone())
    }

    pub async fn active_shard_count(&self) -> usize {
        self.state
            .read()
            .await
            .shards
            .iter()
            .filter(|s| s.polls_until_active == 0)
            .count()
    }

    pub async fn enabled_databases(&self) -> Vec<String> {
        self.state.read().await.databases.clone()
    }

    pub async fn sharded_collections(&self) -> Vec<ShardedCollection> {
        self.state.read().await.collections.clone()
    }

    pub async fn connections(&self) -> Vec<String> {
        self.state.read().await.connections.clone()
    }

    /// Command names in arrival order, across all sessions.
    pub async fn commands(&self) -> Vec<String> {
        self.state.read().await.commands.clone()
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminConnector for MockAdmin {
    async fn connect(&self, connection_string: &str) -> Result<Box<dyn AdminSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.state
            .write()
            .await
            .connections
            .push(connection_string.to_string());
        Ok(Box::new(MockAdminSession {
            state: self.state.clone(),
        }))
    }
}

struct MockAdminSession {
    state: Arc<RwLock<MockAdminState>>,
}

#[async_trait]
impl AdminSession for MockAdminSession {
    async fn run_command(&self, command: Value) -> Result<Value> {
        let name = command_name(&command)
            .ok_or_else(|| Error::admin("<none>", "command document has no name"))?
            .to_string();
        let mut state = self.state.write().await;
        state.commands.push(name.clone());
        match name.as_str() {
            ADD_SHARD_COMMAND => add_shard(&mut state, &command),
            LIST_SHARDS_COMMAND => Ok(list_shards(&mut state)),
            REMOVE_SHARD_COMMAND => remove_shard(&mut state, &command),
            ENABLE_SHARDING_COMMAND => enable_sharding(&mut state, &command),
            SHARD_COLLECTION_COMMAND => shard_collection(&mut state, &command),
            other => Err(Error::admin(other, "unsupported command")),
        }
    }
}

fn string_argument(command: &Value, name: &str) -> Result<String> {
    command
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::admin(name, "expected a string argument"))
}

fn add_shard(state: &mut MockAdminState, command: &Value) -> Result<Value> {
    let address = string_argument(command, ADD_SHARD_COMMAND)?;
    let Some((name, _)) = address.split_once('/') else {
        return Err(Error::admin(
            ADD_SHARD_COMMAND,
            format!("'{address}' is not a replica-set address"),
        ));
    };
    if state.shards.iter().all(|s| s.name != name) {
        let entry = MockShardEntry {
            name: name.to_string(),
            address: address.clone(),
            polls_until_active: state.registration_lag,
            removal_polls_left: None,
        };
        state.shards.push(entry);
    }
    Ok(json!({ "ok": 1, "shardAdded": name }))
}

fn list_shards(state: &mut MockAdminState) -> Value {
    let shards: Vec<Value> = state
        .shards
        .iter_mut()
        .map(|shard| {
            // Report before decrementing: a lag of N means exactly N
            // pending polls.
            let shard_state = if shard.polls_until_active == 0 { 1 } else { 0 };
            if shard.polls_until_active > 0 {
                shard.polls_until_active -= 1;
            }
            json!({
                SHARD_ID_FIELD: shard.name,
                "host": shard.address,
                STATE_FIELD: shard_state,
            })
        })
        .collect();
    json!({ "ok": 1, SHARDS_FIELD: shards })
}

fn remove_shard(state: &mut MockAdminState, command: &Value) -> Result<Value> {
    let name = string_argument(command, REMOVE_SHARD_COMMAND)?;
    let Some(position) = state.shards.iter().position(|s| s.name == name) else {
        return Err(Error::admin(
            REMOVE_SHARD_COMMAND,
            format!("shard '{name}' is not a cluster member"),
        ));
    };
    if state.freeze_removals {
        return Ok(json!({ "ok": 1, STATE_FIELD: "ongoing" }));
    }
    let lag = state.removal_lag;
    let progress = {
        let entry = &mut state.shards[position];
        let first_call = entry.removal_polls_left.is_none();
        let left = entry.removal_polls_left.get_or_insert(lag);
        if *left == 0 {
            None
        } else {
            *left -= 1;
            Some(first_call)
        }
    };
    match progress {
        None => {
            state.shards.remove(position);
            Ok(json!({ "ok": 1, STATE_FIELD: REMOVE_STATE_COMPLETED }))
        }
        Some(true) => Ok(json!({ "ok": 1, STATE_FIELD: "started" })),
        Some(false) => Ok(json!({ "ok": 1, STATE_FIELD: "ongoing" })),
    }
}

fn enable_sharding(state: &mut MockAdminState, command: &Value) -> Result<Value> {
    let database = string_argument(command, ENABLE_SHARDING_COMMAND)?;
    state.databases.push(database);
    Ok(json!({ "ok": 1 }))
}

fn shard_collection(state: &mut MockAdminState, command: &Value) -> Result<Value> {
    let namespace = string_argument(command, SHARD_COLLECTION_COMMAND)?;
    let Some((database, collection)) = namespace.split_once('.') else {
        return Err(Error::admin(
            SHARD_COLLECTION_COMMAND,
            format!("'{namespace}' is not a db.collection namespace"),
        ));
    };
    let (key, kind) = command
        .get(SHARD_COLLECTION_KEY_FIELD)
        .and_then(Value::as_object)
        .and_then(|key| key.iter().next())
        .and_then(|(field, kind)| kind.as_str().map(|k| (field.clone(), k.to_string())))
        .ok_or_else(|| Error::admin(SHARD_COLLECTION_COMMAND, "missing shard key"))?;
    state.collections.push(ShardedCollection {
        database: database.to_string(),
        collection: collection.to_string(),
        key,
        kind,
    });
    Ok(json!({ "ok": 1, "collectionsharded": namespace }))
}
