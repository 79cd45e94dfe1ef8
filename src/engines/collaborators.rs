//! Contracts of the pluggable collaborators driven by the evolution engine.
//!
//! The engine knows nothing about representations or operators; it only
//! calls these traits. Collaborator failures are reported as `anyhow` errors
//! and surface unchanged as [`EvoError::Collaborator`](crate::error::EvoError).

use rand::rngs::StdRng;

use super::events::{Event, EventPayload};
use super::population::Population;
use super::worker_pool::PoolHandle;

/// Lifecycle hook shared by every collaborator the engine owns.
pub trait Operator {
    /// Called once by the engine before the population is built.
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Human readable name, used in event payloads and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Applies selection and the operator sequence to produce the next generation.
pub trait Breeder<I>: Operator + Send {
    fn apply_breed(&mut self, population: &mut Population<I>, rng: &mut StdRng)
        -> anyhow::Result<()>;
}

/// Computes fitness for a whole population and reports its best individual.
pub trait PopulationEvaluator<I>: Operator + Send {
    /// Receives the worker pool once, at initialization.
    fn set_executor(&mut self, handle: PoolHandle);

    /// Evaluates every individual in place and returns the best one.
    fn act(&mut self, population: &mut Population<I>) -> anyhow::Result<I>;
}

pub trait TerminationChecker<I>: Operator + Send {
    fn should_terminate(
        &mut self,
        population: &Population<I>,
        best_of_run: Option<&I>,
        generation_num: usize,
    ) -> anyhow::Result<bool>;
}

/// Observer reporting on the run through the event bus.
pub trait Statistics<I>: Send {
    /// Subscriber identity on the event bus. Must be non-empty.
    fn id(&self) -> &str;

    /// Events this collector wants to hear about.
    fn events(&self) -> Vec<Event> {
        vec![Event::AfterGeneration]
    }

    fn write_statistics(&mut self, event: &Event, payload: &EventPayload<'_, I>)
        -> anyhow::Result<()>;
}

/// Builds the initial individuals of a subpopulation.
pub trait Creator<I>: Operator + Send {
    fn create_individuals(&mut self, count: usize, rng: &mut StdRng) -> anyhow::Result<Vec<I>>;
}

/// A variation operator (crossover, mutation...) attached to a subpopulation.
pub trait GeneticOperator<I>: Operator + Send {
    /// Chance of the operator being applied to a group of individuals.
    fn probability(&self) -> f64;

    /// Number of individuals consumed per application.
    fn arity(&self) -> usize {
        1
    }

    fn apply(&mut self, individuals: &mut [I], rng: &mut StdRng) -> anyhow::Result<()>;
}

/// Per-individual fitness function. Runs on worker threads, so it must not
/// touch the engine's random stream.
pub trait IndividualEvaluator<I>: Send + Sync {
    fn evaluate(&self, individual: &I) -> anyhow::Result<f64>;
}

/// Individuals that can be run against external inputs once evolved.
pub trait Executable {
    type Input;
    type Output;

    fn execute(&self, input: &Self::Input) -> anyhow::Result<Self::Output>;
}
