use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EvoError;

/// A candidate solution carried through the run.
///
/// Individuals are moved across the worker boundary (by serialized copy in
/// process-parallel mode) and stored in snapshots, hence the serde bounds.
pub trait Individual: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Fitness assigned by the last evaluation, if any.
    fn fitness(&self) -> Option<f64>;

    fn set_fitness(&mut self, fitness: f64);
}

/// Returns true if `candidate` is strictly better than `incumbent`.
///
/// Unevaluated individuals never win, and any evaluated individual beats an
/// unevaluated incumbent.
pub fn is_better<I: Individual>(candidate: &I, incumbent: &I, higher_is_better: bool) -> bool {
    match (candidate.fitness(), incumbent.fitness()) {
        (Some(c), Some(i)) => {
            if higher_is_better {
                c > i
            } else {
                c < i
            }
        }
        (Some(_), None) => true,
        _ => false,
    }
}

/// Concurrency flavour of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Shared-memory workers.
    Thread,
    /// Copy-isolated workers: a dedicated rayon thread pool where every item
    /// and result crosses the boundary as a `serde_json` copy. No OS
    /// processes are spawned, so there is no address-space isolation.
    Process,
}

impl ExecutorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorMode::Thread => "thread",
            ExecutorMode::Process => "process",
        }
    }
}

impl fmt::Display for ExecutorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutorMode {
    type Err = EvoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thread" => Ok(ExecutorMode::Thread),
            "process" => Ok(ExecutorMode::Process),
            other => Err(EvoError::Configuration(format!(
                "Executor must be either \"thread\" or \"process\", got \"{}\"",
                other
            ))),
        }
    }
}
