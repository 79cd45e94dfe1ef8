use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::collaborators::{Breeder, PopulationEvaluator, Statistics, TerminationChecker};
use super::events::{Event, EventBus, EventPayload};
use super::population::{Population, PopulationInput};
use super::seed::SeedSequencer;
use super::worker_pool::{PoolHandle, WorkerPool};
use crate::config::{ConfigSection, RunSettings};
use crate::error::{EvoError, Result};
use crate::types::{ExecutorMode, Individual};

pub type SharedStatistics<I> = Arc<Mutex<dyn Statistics<I>>>;

/// Accepted shapes of the `statistics` construction option.
pub enum StatisticsInput<I> {
    Single(SharedStatistics<I>),
    Many(Vec<SharedStatistics<I>>),
}

impl<I: Individual> StatisticsInput<I> {
    pub fn single<S: Statistics<I> + 'static>(statistics: S) -> Self {
        StatisticsInput::Single(Arc::new(Mutex::new(statistics)))
    }

    fn resolve(input: Option<StatisticsInput<I>>) -> Result<Vec<SharedStatistics<I>>> {
        let statistics = match input {
            Some(StatisticsInput::Single(statistics)) => vec![statistics],
            Some(StatisticsInput::Many(statistics)) => statistics,
            None => {
                return Err(EvoError::Configuration(
                    "Parameter statistics must be either a Statistics or a list of Statistics"
                        .to_string(),
                ))
            }
        };

        let mut seen = HashSet::new();
        for entry in &statistics {
            let id = entry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .id()
                .to_string();
            if id.trim().is_empty() {
                return Err(EvoError::Configuration(
                    "Expected a Statistics instance with a subscriber id".to_string(),
                ));
            }
            if !seen.insert(id.clone()) {
                return Err(EvoError::Configuration(format!(
                    "Statistics id '{}' appears more than once",
                    id
                )));
            }
        }
        Ok(statistics)
    }
}

/// Everything needed to construct an [`EvolutionEngine`].
pub struct RunConfig<I> {
    pub population: Option<PopulationInput<I>>,
    pub statistics: Option<StatisticsInput<I>>,
    pub breeder: Box<dyn Breeder<I>>,
    pub population_evaluator: Box<dyn PopulationEvaluator<I>>,
    pub termination_checker: Box<dyn TerminationChecker<I>>,
    pub settings: RunSettings,
    /// Pre-seeded event registry, possibly with subscribers already attached.
    pub events: Option<EventBus<I>>,
}

impl<I: Individual> RunConfig<I> {
    pub fn new(
        population: impl Into<PopulationInput<I>>,
        statistics: StatisticsInput<I>,
        breeder: Box<dyn Breeder<I>>,
        population_evaluator: Box<dyn PopulationEvaluator<I>>,
        termination_checker: Box<dyn TerminationChecker<I>>,
    ) -> Self {
        Self {
            population: Some(population.into()),
            statistics: Some(statistics),
            breeder,
            population_evaluator,
            termination_checker,
            settings: RunSettings::default(),
            events: None,
        }
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_events(mut self, events: EventBus<I>) -> Self {
        self.events = Some(events);
        self
    }
}

/// What one generation may touch. Handed to [`Algorithm::generation_iteration`].
pub struct GenerationContext<'a, I> {
    pub population: &'a mut Population<I>,
    pub breeder: &'a mut dyn Breeder<I>,
    pub population_evaluator: &'a mut dyn PopulationEvaluator<I>,
    pub best_of_run: &'a mut Option<I>,
    pub rng: &'a mut StdRng,
    pub events: &'a mut EventBus<I>,
    pub generation_num: usize,
}

impl<I> GenerationContext<'_, I> {
    /// Publishes an algorithm-specific event. Such events carry no payload.
    pub fn publish(&mut self, event: Event) -> Result<()> {
        self.events.publish(&event, &EventPayload::Empty)
    }
}

pub struct FinishContext<'a, I> {
    pub population: &'a Population<I>,
    pub best_of_run: Option<&'a I>,
    pub final_generation: usize,
}

/// The operations a concrete evolutionary algorithm provides to the engine.
pub trait Algorithm<I>: Send {
    type Input;
    type Output;

    /// Performs the work of generation `ctx.generation_num`.
    fn generation_iteration(&mut self, ctx: GenerationContext<'_, I>) -> Result<()>;

    /// Called once per run, however the loop ended.
    fn finish(&mut self, ctx: FinishContext<'_, I>) -> Result<()>;

    /// Produces the algorithm's result for `input`.
    fn execute(&self, _best_of_run: Option<&I>, _input: &Self::Input) -> Result<Self::Output> {
        Err(EvoError::AbstractContract { hook: "execute" })
    }

    /// Extra events this algorithm publishes.
    fn event_names(&self) -> Vec<Event> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The termination checker fired.
    Threshold,
    /// `max_generation` generations ran.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Constructed,
    Initialized,
    Running,
    Terminated(TerminationReason),
    Finished,
    /// Rebuilt from a snapshot, waiting for `resume`.
    Restored,
}

/// Orchestrates one evolutionary run.
///
/// Generations run strictly one after another; the only fan-out happens
/// inside the population evaluator through the lent worker pool.
pub struct EvolutionEngine<I, A> {
    pub(super) population: Population<I>,
    pub(super) statistics: Vec<SharedStatistics<I>>,
    pub(super) breeder: Box<dyn Breeder<I>>,
    pub(super) population_evaluator: Box<dyn PopulationEvaluator<I>>,
    pub(super) termination_checker: Box<dyn TerminationChecker<I>>,
    pub(super) algorithm: A,
    pub(super) max_generation: usize,
    pub(super) executor: ExecutorMode,
    pub(super) max_workers: Option<usize>,
    pub(super) seeds: SeedSequencer,
    pub(super) best_of_run: Option<I>,
    pub(super) generation_num: usize,
    pub(super) final_generation: usize,
    pub(super) next_generation: usize,
    pub(super) restored_from: Option<RunState>,
    pub(super) events: EventBus<I>,
    pub(super) pool: PoolHandle,
    pub(super) state: RunState,
}

impl<I, A> EvolutionEngine<I, A>
where
    I: Individual,
    A: Algorithm<I>,
{
    /// Validates `config` and allocates the worker pool.
    ///
    /// Fails with [`EvoError::Configuration`] before anything is allocated.
    pub fn new(config: RunConfig<I>, algorithm: A) -> Result<Self> {
        let RunConfig {
            population,
            statistics,
            breeder,
            population_evaluator,
            termination_checker,
            settings,
            events,
        } = config;

        settings.validate()?;
        let executor = settings.executor_mode()?;
        let population = PopulationInput::resolve(population)?;
        let statistics = StatisticsInput::resolve(statistics)?;

        let mut events = events.unwrap_or_default();
        for name in &settings.event_names {
            events.register(Event::from_name(name));
        }
        for event in algorithm.event_names() {
            events.register(event);
        }
        for event in Event::STANDING {
            events.register(event);
        }
        subscribe_statistics(&mut events, &statistics);

        let pool = Arc::new(WorkerPool::new(executor, settings.max_workers)?);
        let seeds = SeedSequencer::new(settings.resolve_random_seed(), settings.generation_seed);

        log::info!(
            "Evolution engine ready: {} subpopulation(s), max_generation={}, executor={}",
            population.len(),
            settings.max_generation,
            executor
        );

        Ok(Self {
            population,
            statistics,
            breeder,
            population_evaluator,
            termination_checker,
            algorithm,
            max_generation: settings.max_generation,
            executor,
            max_workers: settings.max_workers,
            seeds,
            best_of_run: None,
            generation_num: settings.generation_num,
            final_generation: 0,
            next_generation: 0,
            restored_from: None,
            events,
            pool,
            state: RunState::Constructed,
        })
    }

    /// Seeds the run, wires the collaborators, builds and evaluates the
    /// initial population, then publishes `init`.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != RunState::Constructed {
            return Err(EvoError::InvalidState(format!(
                "cannot initialize an engine in state {:?}",
                self.state
            )));
        }

        let seed = self.seeds.random_seed();
        self.seeds.set_root_seed(seed);
        log::debug!("random seed = {}", seed);

        self.prepare_collaborators()?;
        self.population
            .create_population_individuals(self.seeds.rng())?;
        self.best_of_run = Some(self.population_evaluator.act(&mut self.population)?);

        self.state = RunState::Initialized;
        self.publish(Event::Init)
    }

    /// Runs the whole evolution: initialize, generation loop, finish.
    pub fn evolve(&mut self) -> Result<()> {
        self.initialize()?;
        self.evolve_generations(usize::MAX)?;
        Ok(())
    }

    /// Continues a run rebuilt with [`EvolutionEngine::restore`] to its end.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != RunState::Restored {
            return Err(EvoError::InvalidState(format!(
                "only a restored engine can resume, state is {:?}",
                self.state
            )));
        }
        self.evolve_generations(usize::MAX)?;
        Ok(())
    }

    /// Runs at most `count` generations and returns after the last one's
    /// `after_generation`. Returns `true` once the run has finished.
    ///
    /// A constructed engine is initialized first and a restored one is
    /// reopened. Between calls the engine sits at a generation boundary in
    /// [`RunState::Running`], where it can be snapshotted.
    pub fn evolve_generations(&mut self, count: usize) -> Result<bool> {
        match self.state {
            RunState::Constructed => self.initialize()?,
            RunState::Restored => self.reopen()?,
            RunState::Initialized | RunState::Running => {}
            state => {
                return Err(EvoError::InvalidState(format!(
                    "the run has already ended, state is {:?}",
                    state
                )))
            }
        }

        if self.state == RunState::Initialized {
            if self.termination_checker.should_terminate(
                &self.population,
                self.best_of_run.as_ref(),
                self.generation_num,
            )? {
                log::info!("Termination condition met before the first generation");
                self.final_generation = 0;
                self.publish(Event::AfterGeneration)?;
                self.end_run(TerminationReason::Threshold)?;
                return Ok(true);
            }
            self.state = RunState::Running;
        }

        let mut remaining = count;
        while self.next_generation < self.max_generation {
            if remaining == 0 {
                log::debug!("Pausing before generation {}", self.next_generation);
                return Ok(false);
            }
            remaining -= 1;

            if self.run_generation()? {
                self.end_run(TerminationReason::Threshold)?;
                return Ok(true);
            }
        }

        self.end_run(TerminationReason::Exhausted)?;
        Ok(true)
    }

    /// Rebinds the collaborators of a restored engine and announces the run.
    fn reopen(&mut self) -> Result<()> {
        let restored_from = self.restored_from.take().unwrap_or(RunState::Running);
        if restored_from == RunState::Constructed {
            self.state = RunState::Constructed;
            return self.initialize();
        }

        match self.seeds.generation_seed() {
            Some(seed) => self.seeds.set_generation_seed(seed),
            None => {
                let seed = self.seeds.random_seed();
                self.seeds.set_root_seed(seed);
            }
        }
        self.prepare_collaborators()?;

        self.state = restored_from;
        log::info!("Resuming evolution at generation {}", self.next_generation);
        self.publish(Event::Init)
    }

    fn prepare_collaborators(&mut self) -> Result<()> {
        self.population_evaluator.set_executor(self.pool.lend());

        self.breeder.initialize()?;
        self.population_evaluator.initialize()?;
        self.termination_checker.initialize()?;
        for sub_population in self.population.sub_populations_mut() {
            sub_population.initialize_operators()?;
        }
        Ok(())
    }

    /// Runs generation `next_generation`; returns whether the checker fired.
    fn run_generation(&mut self) -> Result<bool> {
        let gen = self.next_generation;
        self.generation_num = gen;
        let seed = self.seeds.advance_generation();
        log::debug!("generation {} seed = {}", gen, seed);

        self.algorithm.generation_iteration(GenerationContext {
            population: &mut self.population,
            breeder: self.breeder.as_mut(),
            population_evaluator: self.population_evaluator.as_mut(),
            best_of_run: &mut self.best_of_run,
            rng: self.seeds.rng(),
            events: &mut self.events,
            generation_num: gen,
        })?;

        let terminate = self.termination_checker.should_terminate(
            &self.population,
            self.best_of_run.as_ref(),
            self.generation_num,
        )?;
        self.final_generation = gen;
        self.next_generation = gen + 1;
        self.publish(Event::AfterGeneration)?;

        if terminate {
            log::info!("Termination condition met at generation {}", gen);
        }
        Ok(terminate)
    }

    fn end_run(&mut self, reason: TerminationReason) -> Result<()> {
        self.pool.shutdown();
        self.state = RunState::Terminated(reason);
        self.finish_run()
    }

    fn finish_run(&mut self) -> Result<()> {
        self.algorithm.finish(FinishContext {
            population: &self.population,
            best_of_run: self.best_of_run.as_ref(),
            final_generation: self.final_generation,
        })?;
        self.state = RunState::Finished;
        log::info!(
            "Evolution finished after generation {}",
            self.final_generation
        );
        self.publish(Event::EvolutionFinished)
    }

    /// Publishes `event` with the payload the engine associates with it.
    pub fn publish(&mut self, event: Event) -> Result<()> {
        let payload = match &event {
            Event::Init => EventPayload::Init {
                population: &self.population,
                statistics: self
                    .statistics
                    .iter()
                    .map(|s| {
                        s.lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .id()
                            .to_string()
                    })
                    .collect(),
                breeder: self.breeder.name(),
                termination_checker: self.termination_checker.name(),
                max_generation: self.max_generation,
                events: self.events.event_names(),
                max_workers: self.max_workers,
            },
            Event::AfterGeneration => EventPayload::AfterGeneration {
                population: &self.population,
                best_of_run: self.best_of_run.as_ref(),
                generation_num: self.generation_num,
            },
            Event::EvolutionFinished => EventPayload::EvolutionFinished {
                population: &self.population,
                best_of_run: self.best_of_run.as_ref(),
                final_generation: self.final_generation,
            },
            Event::Custom(_) => EventPayload::Empty,
        };
        self.events.publish(&event, &payload)
    }

    /// Runs the algorithm's result against `input`.
    pub fn execute(&self, input: &A::Input) -> Result<A::Output> {
        self.algorithm.execute(self.best_of_run.as_ref(), input)
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.seeds.set_root_seed(seed);
    }

    pub fn set_generation_seed(&mut self, seed: u64) {
        self.seeds.set_generation_seed(seed);
    }

    pub fn next_seed(&mut self) -> u64 {
        self.seeds.next_seed()
    }

    pub fn random_seed(&self) -> u64 {
        self.seeds.random_seed()
    }

    pub fn generation_seed(&self) -> Option<u64> {
        self.seeds.generation_seed()
    }

    pub fn population(&self) -> &Population<I> {
        &self.population
    }

    pub fn best_of_run(&self) -> Option<&I> {
        self.best_of_run.as_ref()
    }

    /// First generation the next call to the generation loop runs.
    pub fn next_generation(&self) -> usize {
        self.next_generation
    }

    pub fn generation_num(&self) -> usize {
        self.generation_num
    }

    pub fn final_generation(&self) -> usize {
        self.final_generation
    }

    pub fn max_generation(&self) -> usize {
        self.max_generation
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn worker_pool(&self) -> &PoolHandle {
        &self.pool
    }

    pub fn events_mut(&mut self) -> &mut EventBus<I> {
        &mut self.events
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }
}

impl<I, A> Drop for EvolutionEngine<I, A> {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

fn subscribe_statistics<I: Individual>(events: &mut EventBus<I>, statistics: &[SharedStatistics<I>]) {
    for entry in statistics {
        let (id, wanted) = {
            let guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
            (guard.id().to_string(), guard.events())
        };
        for event in wanted {
            let shared = Arc::clone(entry);
            events.subscribe(event, id.clone(), move |event, payload| {
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .write_statistics(event, payload)
            });
        }
    }
}
