//! # Shardonnay
//! Disposable sharded database clusters for integration tests.
//!
//! This crate builds MongoDB-style sharded clusters: shard replica
//! groups plus a config-server group launched as named processes on one
//! network, fronted by stateless `mongos` routers. Startup runs in
//! dependency order, teardown in reverse, and every membership change
//! is polled through the routers' admin channel until the cluster
//! acknowledges it.
//!
//! # Goals
//! - Deterministic topologies: the same spec always yields the same names and ports
//! - Explicit convergence: membership changes complete or time out, never half-apply
//! - Backend-agnostic: processes run behind a small async trait, so tests stay in-memory
//! - Honest teardown: routers stop before the data layer they route to
//!
//! ## Getting started
//! Install `shardonnay` to your rust project with `cargo add shardonnay` or include the following snippet in your `Cargo.toml` dependencies:
//! ```toml
//! shardonnay = "0.1"
//! ```
//!
//! ### Driving a cluster
//! [`ShardedCluster`](cluster::ShardedCluster) is the main entry point.
//! Build it from a [`ClusterSpec`](cluster::ClusterSpec), a process
//! runtime, and an admin connector, then start it and hand its
//! connection string to the code under test.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use shardonnay::prelude::*;
//! use shardonnay::telemetry::{LogFormat, init_logging};
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     init_logging(LogFormat::from_env()).expect("Failed to init logging");
//!
//!     let spec = ClusterSpec {
//!         shard_count: 2,
//!         router_count: 2,
//!         ..ClusterSpec::default()
//!     };
//!     let mut cluster = ShardedCluster::new(
//!         spec,
//!         Arc::new(MockRuntime::new()),
//!         Arc::new(MockAdmin::new()),
//!     )?;
//!
//!     cluster.start().await?;
//!     println!("connect at {}", cluster.connection_string()?);
//!
//!     cluster.enable_sharding("app").await?;
//!     cluster.shard_collection("app", "events", "user_id").await?;
//!
//!     cluster.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! Production harnesses swap the mocks for a container-backed
//! [`ProcessRuntime`](cluster::ProcessRuntime) and a driver-backed
//! [`AdminConnector`](cluster::admin::AdminConnector); the orchestration
//! behavior is identical.
//!
//! ## Resources
//! - [MongoDB sharding reference](https://www.mongodb.com/docs/manual/sharding/)
//! - [removeShard draining semantics](https://www.mongodb.com/docs/manual/reference/command/removeShard/)

#![forbid(unsafe_code)]

pub mod cluster;
pub mod constants;
pub mod error;
pub mod telemetry;
pub mod types;

pub mod prelude {
    //! Main export of cluster structures
    //!
    //! # Cluster
    //!
    //! The cluster module provides orchestration for sharded database
    //! topologies. Use [`ShardedCluster`](crate::cluster::ShardedCluster)
    //! to build and drive a cluster, and implement
    //! [`ProcessRuntime`](crate::cluster::ProcessRuntime) and
    //! [`AdminConnector`](crate::cluster::admin::AdminConnector) to plug
    //! in a real process backend.
    //!
    //! ## Example
    //! ```rust,no_run
    //! use std::sync::Arc;
    //!
    //! use shardonnay::prelude::*;
    //!
    //! #[tokio::main]
    //! async fn main() {
    //!     let mut cluster = ShardedCluster::new(
    //!         ClusterSpec::default(),
    //!         Arc::new(MockRuntime::new()),
    //!         Arc::new(MockAdmin::new()),
    //!     )
    //!     .unwrap();
    //!     cluster.start().await.unwrap();
    //!     let added = cluster.add_shard().await.unwrap();
    //!     println!("added {added}");
    //!     cluster.stop().await.unwrap();
    //! }
    //! ```
    pub use crate::error::{Error, MembershipOperation, Result};
    pub use crate::types::HostPort;

    pub use crate::cluster::{
        ClusterSpec, LifecycleState, PollPolicy, ProcessRuntime, ProcessSpec, ShardedCluster,
        Startable,
    };
    #[cfg(any(test, feature = "test-utilities"))]
    pub use crate::cluster::{MockAdmin, MockRuntime};

    pub use serde_json;

    pub mod cluster {
        //! Sharded cluster orchestration.
        //!
        //! Use this module to build and drive disposable sharded
        //! clusters. See [`ShardedCluster`] for the main entry point.
        pub use crate::cluster::*;
    }
}
