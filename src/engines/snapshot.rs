//! Serializable capture of an engine's run state.
//!
//! The worker pool and the random generator are transient: neither is
//! stored. A restored engine rebuilds its pool from the recorded mode and
//! worker bound, and binds a fresh generator that becomes reproducible again
//! at the next reseed (which `resume` performs first thing).
//!
//! Collaborators are trait objects and cannot be serialized; `restore` takes
//! them from a fresh [`RunConfig`] and overlays the captured state.
//!
//! A run can be captured before it starts or at any generation boundary
//! reached through [`EvolutionEngine::evolve_generations`]. A run that has
//! already ended cannot be restored.

use serde::{Deserialize, Serialize};

use super::events::Event;
use super::evolution_engine::{Algorithm, EvolutionEngine, RunConfig, RunState};
use super::seed::SeedSequencer;
use crate::error::{EvoError, Result};
use crate::types::{ExecutorMode, Individual};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot<I> {
    pub taken_at: String,
    pub state: RunState,
    pub max_generation: usize,
    pub executor: ExecutorMode,
    pub max_workers: Option<usize>,
    pub random_seed: u64,
    pub generation_seed: Option<u64>,
    pub generation_num: usize,
    /// First generation a resumed run executes.
    pub next_generation: usize,
    pub final_generation: usize,
    pub best_of_run: Option<I>,
    pub individuals: Vec<Vec<I>>,
    pub event_names: Vec<Event>,
}

impl<I: Individual> EngineSnapshot<I> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<I, A> EvolutionEngine<I, A>
where
    I: Individual,
    A: Algorithm<I>,
{
    pub fn snapshot(&self) -> EngineSnapshot<I> {
        EngineSnapshot {
            taken_at: chrono::Utc::now().to_rfc3339(),
            state: self.state,
            max_generation: self.max_generation,
            executor: self.executor,
            max_workers: self.max_workers,
            random_seed: self.seeds.random_seed(),
            generation_seed: self.seeds.generation_seed(),
            generation_num: self.generation_num,
            next_generation: self.next_generation,
            final_generation: self.final_generation,
            best_of_run: self.best_of_run.clone(),
            individuals: self.population.individuals_by_subpopulation(),
            event_names: self.events.event_names(),
        }
    }

    /// Rebuilds an engine from `snapshot`, taking collaborators from `config`.
    ///
    /// Run settings recorded in the snapshot override those of `config`.
    /// The population in `config` must have the same number of subpopulations
    /// as the snapshot.
    ///
    /// Fails with [`EvoError::InvalidState`] when the snapshot was taken after
    /// the run ended, or of an engine that was itself restored and never
    /// resumed.
    pub fn restore(snapshot: EngineSnapshot<I>, mut config: RunConfig<I>, algorithm: A) -> Result<Self> {
        match snapshot.state {
            RunState::Constructed | RunState::Initialized | RunState::Running => {}
            state => {
                return Err(EvoError::InvalidState(format!(
                    "cannot restore a snapshot taken in state {:?}",
                    state
                )))
            }
        }

        config.settings.max_generation = snapshot.max_generation;
        config.settings.executor = snapshot.executor.as_str().to_string();
        config.settings.max_workers = snapshot.max_workers;
        config.settings.random_seed = Some(snapshot.random_seed);
        config.settings.generation_seed = snapshot.generation_seed;
        config.settings.generation_num = snapshot.generation_num;

        let mut engine = Self::new(config, algorithm)?;
        if snapshot.state != RunState::Constructed {
            engine.population.replace_individuals(snapshot.individuals)?;
        }
        for event in snapshot.event_names {
            engine.events.register(event);
        }
        engine.seeds = SeedSequencer::detached(snapshot.random_seed, snapshot.generation_seed);
        engine.best_of_run = snapshot.best_of_run;
        engine.final_generation = snapshot.final_generation;
        engine.next_generation = snapshot.next_generation;
        engine.restored_from = Some(snapshot.state);
        engine.state = RunState::Restored;

        log::info!(
            "Restored engine from snapshot taken at {} (generation {})",
            snapshot.taken_at,
            snapshot.generation_num
        );
        Ok(engine)
    }
}
