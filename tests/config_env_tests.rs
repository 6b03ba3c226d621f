//! Integration tests for ClusterSpec::from_env()
//!
//! These tests verify configuration loading from environment variables.

use std::env;
use std::sync::Mutex;

use shardonnay::cluster::{
    ClusterSpec, ENV_BASE_PORT, ENV_REPLICA_COUNT, ENV_ROUTER_COUNT, ENV_SHARD_COUNT,
};

/// Global mutex to serialize all env-based tests.
/// Environment variables are process-global, so we must prevent concurrent access.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// All environment variables read by ClusterSpec::from_env().
/// We must save/restore ALL of these to prevent test pollution when running in parallel.
const ALL_SPEC_ENV_VARS: &[&str] = &[
    ENV_SHARD_COUNT,
    ENV_REPLICA_COUNT,
    ENV_ROUTER_COUNT,
    ENV_BASE_PORT,
];

/// Helper to run a test with specific environment variables set.
/// This helper:
/// 1. Acquires a mutex to serialize all env-based tests
/// 2. Saves and restores ALL spec-related env vars
fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let originals: Vec<_> = ALL_SPEC_ENV_VARS
        .iter()
        .map(|k| (*k, env::var(k).ok()))
        .collect();

    for key in ALL_SPEC_ENV_VARS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let result = f();

    for (key, original) in originals {
        match original {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }

    result
}

// ============================================================================
// Basic Environment Variable Tests
// ============================================================================

#[test]
fn test_from_env_without_overrides_matches_defaults() {
    with_env_vars(&[], || {
        let spec = ClusterSpec::from_env().expect("Should parse spec");
        let defaults = ClusterSpec::default();
        assert_eq!(spec.shard_count, defaults.shard_count);
        assert_eq!(spec.replica_count, defaults.replica_count);
        assert_eq!(spec.router_count, defaults.router_count);
        assert_eq!(spec.base_port, defaults.base_port);
    });
}

#[test]
fn test_from_env_with_counts() {
    with_env_vars(
        &[
            (ENV_SHARD_COUNT, "3"),
            (ENV_REPLICA_COUNT, "2"),
            (ENV_ROUTER_COUNT, "2"),
        ],
        || {
            let spec = ClusterSpec::from_env().expect("Should parse spec");
            assert_eq!(spec.shard_count, 3);
            assert_eq!(spec.replica_count, 2);
            assert_eq!(spec.router_count, 2);
        },
    );
}

#[test]
fn test_from_env_with_base_port() {
    with_env_vars(&[(ENV_BASE_PORT, "30000")], || {
        let spec = ClusterSpec::from_env().expect("Should parse spec");
        assert_eq!(spec.base_port, 30000);
    });
}

#[test]
fn test_from_env_invalid_count_fails() {
    with_env_vars(&[(ENV_SHARD_COUNT, "not-a-number")], || {
        let err = ClusterSpec::from_env().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(ENV_SHARD_COUNT));
    });
}

#[test]
fn test_from_env_port_out_of_range_fails() {
    with_env_vars(&[(ENV_BASE_PORT, "99999")], || {
        let result = ClusterSpec::from_env();
        assert!(result.is_err());
    });
}

#[test]
fn test_from_env_negative_count_fails() {
    with_env_vars(&[(ENV_REPLICA_COUNT, "-1")], || {
        let result = ClusterSpec::from_env();
        assert!(result.is_err());
    });
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_from_env_zero_routers_fails_validation() {
    with_env_vars(&[(ENV_ROUTER_COUNT, "0")], || {
        let err = ClusterSpec::from_env().unwrap_err();
        assert!(err.is_config());
    });
}

#[test]
fn test_from_env_zero_shards_is_valid() {
    with_env_vars(&[(ENV_SHARD_COUNT, "0")], || {
        let spec = ClusterSpec::from_env().expect("Should parse spec");
        assert_eq!(spec.shard_count, 0);
    });
}

#[test]
fn test_from_env_port_span_overflow_fails_validation() {
    // 3 replicas across 5 shard groups plus the config group plus one
    // router is 19 ports; they do not fit above 65530.
    with_env_vars(
        &[
            (ENV_BASE_PORT, "65530"),
            (ENV_SHARD_COUNT, "5"),
            (ENV_REPLICA_COUNT, "3"),
        ],
        || {
            let err = ClusterSpec::from_env().unwrap_err();
            assert!(err.is_config());
            assert!(err.to_string().contains("port range"));
        },
    );
}
