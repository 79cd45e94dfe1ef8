#![allow(dead_code)]

use evorun::engines::{
    Algorithm, Breeder, Creator, EventPayload, FinishContext, GenerationContext,
    IndividualEvaluator, Operator, Population, Statistics, Subpopulation, TerminationChecker,
    Event,
};
use evorun::{Individual, Result};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    pub fitness: Option<f64>,
}

impl Individual for Score {
    fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }
}

pub struct UniformCreator;

impl Operator for UniformCreator {}

impl Creator<Score> for UniformCreator {
    fn create_individuals(&mut self, count: usize, rng: &mut StdRng) -> anyhow::Result<Vec<Score>> {
        Ok((0..count)
            .map(|_| Score {
                value: rng.gen_range(0.0..1.0),
                fitness: None,
            })
            .collect())
    }
}

pub struct ValueEvaluator;

impl IndividualEvaluator<Score> for ValueEvaluator {
    fn evaluate(&self, individual: &Score) -> anyhow::Result<f64> {
        Ok(individual.value)
    }
}

/// Redraws every value from the generation stream.
#[derive(Default)]
pub struct RedrawBreeder {
    pub calls: Arc<AtomicUsize>,
    pub fail: bool,
}

impl Operator for RedrawBreeder {}

impl Breeder<Score> for RedrawBreeder {
    fn apply_breed(&mut self, population: &mut Population<Score>, rng: &mut StdRng) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("breeder exploded");
        }
        for sub in population.sub_populations_mut() {
            for individual in sub.individuals.iter_mut() {
                individual.value = rng.gen_range(0.0..1.0);
                individual.fitness = None;
            }
        }
        Ok(())
    }
}

/// Fires once `generation_num` reaches `at`. `None` never fires.
pub struct GenerationChecker {
    pub at: Option<usize>,
}

impl Operator for GenerationChecker {}

impl TerminationChecker<Score> for GenerationChecker {
    fn should_terminate(
        &mut self,
        _population: &Population<Score>,
        _best_of_run: Option<&Score>,
        generation_num: usize,
    ) -> anyhow::Result<bool> {
        Ok(self.at.map(|at| generation_num >= at).unwrap_or(false))
    }
}

/// Breeds, evaluates and records one draw from the generation stream.
#[derive(Default)]
pub struct RecordingAlgorithm {
    pub iterations: Arc<AtomicUsize>,
    pub draws: Arc<Mutex<Vec<u64>>>,
    pub finished: Arc<AtomicUsize>,
}

impl Algorithm<Score> for RecordingAlgorithm {
    type Input = ();
    type Output = ();

    fn generation_iteration(&mut self, ctx: GenerationContext<'_, Score>) -> Result<()> {
        self.iterations.fetch_add(1, Ordering::SeqCst);
        self.draws.lock().unwrap().push(ctx.rng.gen());
        ctx.breeder.apply_breed(ctx.population, ctx.rng)?;
        let best = ctx.population_evaluator.act(ctx.population)?;
        let improved = match &*ctx.best_of_run {
            Some(current) => best.value > current.value,
            None => true,
        };
        if improved {
            *ctx.best_of_run = Some(best);
        }
        Ok(())
    }

    fn finish(&mut self, _ctx: FinishContext<'_, Score>) -> Result<()> {
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records `(event, generation)` for every event it hears.
pub struct EventLog {
    pub id: String,
    pub events: Vec<Event>,
    pub seen: Arc<Mutex<Vec<(Event, usize)>>>,
}

impl EventLog {
    pub fn new(id: &str, events: Vec<Event>) -> Self {
        Self {
            id: id.to_string(),
            events,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Statistics<Score> for EventLog {
    fn id(&self) -> &str {
        &self.id
    }

    fn events(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn write_statistics(&mut self, event: &Event, payload: &EventPayload<'_, Score>) -> anyhow::Result<()> {
        let generation = match payload {
            EventPayload::AfterGeneration { generation_num, .. } => *generation_num,
            EventPayload::EvolutionFinished { final_generation, .. } => *final_generation,
            _ => 0,
        };
        self.seen.lock().unwrap().push((event.clone(), generation));
        Ok(())
    }
}

pub fn sub_population(size: usize) -> Subpopulation<Score> {
    Subpopulation::new(Box::new(UniformCreator), Arc::new(ValueEvaluator), size)
        .with_higher_is_better(true)
}
