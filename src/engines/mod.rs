pub mod collaborators;
pub mod population;
pub mod events;
pub mod worker_pool;
pub mod seed;
pub mod evolution_engine;
pub mod snapshot;
pub mod simple_evolution;
pub mod defaults;
pub mod progress;

pub use collaborators::{
    Breeder, Creator, Executable, GeneticOperator, IndividualEvaluator, Operator,
    PopulationEvaluator, Statistics, TerminationChecker,
};
pub use population::{Population, PopulationInput, Subpopulation};
pub use events::{Callback, Event, EventBus, EventPayload};
pub use worker_pool::{PoolHandle, WorkerPool};
pub use seed::{SeedSequencer, SEED_MAX_VALUE, SEED_MIN_VALUE};
pub use evolution_engine::{
    Algorithm, EvolutionEngine, FinishContext, GenerationContext, RunConfig, RunState,
    SharedStatistics, StatisticsInput, TerminationReason,
};
pub use snapshot::EngineSnapshot;
pub use simple_evolution::SimpleEvolution;
pub use defaults::{SimpleBreeder, SimplePopulationEvaluator, ThresholdFromTargetTerminationChecker};
pub use progress::{BestAverageWorstStatistics, ChannelStatistics, GenerationStats, StatisticsMessage};
