//! Dependency-ordered startup and teardown over lifecycle units.
//!
//! The dependency relation is captured once, at topology build time,
//! and never mutated afterwards. Scheduling works on whatever unit
//! slice the caller passes: edges pointing at units that are not in
//! the slice count as already satisfied, which is how a topology keeps
//! working after a shard has been removed from it.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use super::lifecycle::Startable;
use crate::error::{Error, Result};

/// An immutable "starts after" relation between named units.
///
/// `dependencies[unit]` lists the units that must be running before
/// `unit` starts, and that must outlive it on the way down. Units are
/// scheduled in waves: every unit whose dependencies are satisfied
/// goes into the next wave, and units within a wave run concurrently.
pub struct ProcessGraph {
    dependencies: HashMap<String, Vec<String>>,
}

impl ProcessGraph {
    pub fn new(dependencies: HashMap<String, Vec<String>>) -> Self {
        Self { dependencies }
    }

    /// The recorded dependencies of `unit`, empty for unknown names.
    pub fn dependencies_of(&self, unit: &str) -> &[String] {
        self.dependencies
            .get(unit)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Start every unit, dependencies first. Units within a wave start
    /// concurrently; a wave only begins once the previous wave is
    /// fully up.
    ///
    /// On failure the wave still runs to completion, then the first
    /// error in unit order is returned. Nothing is rolled back: units
    /// that came up stay up, and a later `stop_all` takes them down.
    pub async fn start_all(&self, units: &[Arc<dyn Startable>]) -> Result<()> {
        let waves = self.waves(units)?;
        info!(units = units.len(), waves = waves.len(), "starting units in dependency order");
        for wave in &waves {
            let results = join_all(wave.iter().map(|unit| unit.start())).await;
            for (unit, result) in wave.iter().zip(results) {
                if let Err(err) = result {
                    error!(unit = %unit.name(), error = %err, "unit failed to start");
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Stop every unit in reverse dependency order: a unit goes down
    /// before anything it depends on.
    ///
    /// Teardown is best effort. A failing unit is logged and the pass
    /// continues; the first error is returned once every unit has been
    /// attempted.
    pub async fn stop_all(&self, units: &[Arc<dyn Startable>]) -> Result<()> {
        let mut waves = self.waves(units)?;
        waves.reverse();
        debug!(units = units.len(), waves = waves.len(), "stopping units in reverse dependency order");
        let mut first_error = None;
        for wave in &waves {
            let results = join_all(wave.iter().map(|unit| unit.stop())).await;
            for (unit, result) in wave.iter().zip(results) {
                if let Err(err) = result {
                    warn!(unit = %unit.name(), error = %err, "unit failed to stop, continuing teardown");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Layer the units into start order. Deterministic: ties within a
    /// wave resolve to the order of the `units` slice.
    fn waves<'a>(
        &self,
        units: &'a [Arc<dyn Startable>],
    ) -> Result<Vec<Vec<&'a Arc<dyn Startable>>>> {
        let present: HashMap<&str, usize> = units
            .iter()
            .enumerate()
            .map(|(index, unit)| (unit.name(), index))
            .collect();

        // In-degrees and dependents, counting only edges between units
        // that are actually in the slice.
        let mut remaining: Vec<usize> = vec![0; units.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
        for (index, unit) in units.iter().enumerate() {
            for dependency in self.dependencies_of(unit.name()) {
                if let Some(&upstream) = present.get(dependency.as_str()) {
                    remaining[index] += 1;
                    dependents[upstream].push(index);
                }
            }
        }

        let mut waves = Vec::new();
        let mut placed = 0;
        let mut ready: Vec<usize> = (0..units.len())
            .filter(|&index| remaining[index] == 0)
            .collect();
        while !ready.is_empty() {
            placed += ready.len();
            let mut next = Vec::new();
            for &index in &ready {
                for &dependent in &dependents[index] {
                    remaining[dependent] -= 1;
                    if remaining[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            next.sort_unstable();
            waves.push(ready.iter().map(|&index| &units[index]).collect());
            ready = next;
        }

        if placed < units.len() {
            // Every unplaced unit sits on a cycle (or behind one);
            // report the first in slice order.
            let unit = units
                .iter()
                .enumerate()
                .find(|(index, _)| remaining[*index] > 0)
                .map(|(_, unit)| unit.name().to_string())
                .unwrap_or_default();
            return Err(Error::DependencyCycle { unit });
        }
        Ok(waves)
    }
}
