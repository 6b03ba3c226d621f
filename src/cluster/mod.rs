//! Sharded database cluster orchestration.
//!
//! This module builds and drives disposable sharded clusters for
//! integration tests: shard replica groups and a config-server group
//! launched as named processes on one network, fronted by stateless
//! routers, with membership changes confirmed through the routers'
//! admin channel.
//!
//! # Architecture
//!
//! ```text
//!                      ┌─────────────┐
//!                      │ Test Driver │
//!                      └──────┬──────┘
//!                             │ mongodb://...
//!               ┌─────────────┼─────────────┐
//!               ▼             ▼             ▼
//!         ┌──────────┐  ┌──────────┐  ┌──────────┐
//!         │ mongos1  │  │ mongos2  │  │ mongos3  │
//!         └─────┬────┘  └─────┬────┘  └─────┬────┘
//!               │             │             │
//!               └─────────────┼─────────────┘
//!                             ▼
//!      ┌───────────┐   ┌───────────┐   ┌───────────┐
//!      │  shard1   │   │  shard2   │   │ configdb  │
//!      │ replicas  │   │ replicas  │   │ replicas  │
//!      └───────────┘   └───────────┘   └───────────┘
//! ```
//!
//! Routers depend on every shard group and on the config group, so
//! startup brings the data layer up first and teardown stops the
//! routers first. The dependency relation is explicit and executed in
//! waves by [`ProcessGraph`].
//!
//! # Process Backends
//!
//! The orchestration core is backend-agnostic: processes are launched
//! through the [`ProcessRuntime`] trait and admin commands go through
//! [`AdminConnector`](admin::AdminConnector). Tests use the in-memory
//! `MockRuntime` and `MockAdmin`; production harnesses plug in a
//! container backend.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use shardonnay::cluster::{ClusterSpec, MockAdmin, MockRuntime, ShardedCluster};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = ClusterSpec {
//!         shard_count: 2,
//!         ..ClusterSpec::default()
//!     };
//!     let mut cluster = ShardedCluster::new(
//!         spec,
//!         Arc::new(MockRuntime::new()),
//!         Arc::new(MockAdmin::new()),
//!     )?;
//!
//!     cluster.start().await?;
//!     println!("cluster ready at {}", cluster.connection_string()?);
//!
//!     let added = cluster.add_shard().await?;
//!     println!("scaled out to {added}");
//!
//!     cluster.stop().await?;
//!     Ok(())
//! }
//! ```

mod address;
pub mod admin;
mod config;
mod controller;
pub mod convergence;
mod factory;
mod graph;
mod lifecycle;
mod node;
mod replica_group;
mod runtime;

#[cfg(any(test, feature = "test-utilities"))]
pub mod mock_backend;

pub use address::{cluster_connection_string, replica_set_address};
pub use config::{
    ClusterSpec, ENV_BASE_PORT, ENV_REPLICA_COUNT, ENV_ROUTER_COUNT, ENV_SHARD_COUNT,
};
pub use controller::ShardedCluster;
pub use convergence::PollPolicy;
pub use graph::ProcessGraph;
pub use lifecycle::{LifecycleState, Startable};
#[cfg(any(test, feature = "test-utilities"))]
pub use mock_backend::{MockAdmin, MockRuntime, ShardedCollection};
pub use node::Node;
pub use replica_group::ReplicaGroup;
pub use runtime::{ProcessRuntime, ProcessSpec};
