//! Orchestration of evolutionary-computation runs.
//!
//! [`EvolutionEngine`](engines::EvolutionEngine) drives pluggable collaborators
//! (breeder, population evaluator, termination checker, statistics) through
//! the generation loop, publishes lifecycle events on an [`EventBus`](engines::EventBus),
//! fans fitness evaluation out over a bounded [`WorkerPool`](engines::WorkerPool)
//! and keeps every run reproducible from its root seed.

pub mod config;
pub mod engines;
pub mod error;
pub mod types;

pub use error::{EvoError, Result};
pub use types::{ExecutorMode, Individual};
