use evorun::engines::{
    BestAverageWorstStatistics, Creator, EvolutionEngine, Executable, GeneticOperator,
    IndividualEvaluator, Operator, RunConfig, SimpleBreeder, SimpleEvolution,
    SimplePopulationEvaluator, StatisticsInput, Subpopulation,
    ThresholdFromTargetTerminationChecker,
};
use evorun::config::RunSettings;
use evorun::Individual;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct BitString {
    bits: Vec<bool>,
    fitness: Option<f64>,
}

impl Individual for BitString {
    fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }
}

/// Running the best string against a mask counts the positions they agree on.
impl Executable for BitString {
    type Input = Vec<bool>;
    type Output = usize;

    fn execute(&self, mask: &Vec<bool>) -> anyhow::Result<usize> {
        Ok(self.bits.iter().zip(mask).filter(|(a, b)| a == b).count())
    }
}

struct RandomBits {
    length: usize,
}

impl Operator for RandomBits {}

impl Creator<BitString> for RandomBits {
    fn create_individuals(&mut self, count: usize, rng: &mut StdRng) -> anyhow::Result<Vec<BitString>> {
        Ok((0..count)
            .map(|_| BitString {
                bits: (0..self.length).map(|_| rng.gen_bool(0.5)).collect(),
                fitness: None,
            })
            .collect())
    }
}

struct OnePointCrossover {
    probability: f64,
}

impl Operator for OnePointCrossover {}

impl GeneticOperator<BitString> for OnePointCrossover {
    fn probability(&self) -> f64 {
        self.probability
    }

    fn arity(&self) -> usize {
        2
    }

    fn apply(&mut self, pair: &mut [BitString], rng: &mut StdRng) -> anyhow::Result<()> {
        let (left, right) = pair.split_at_mut(1);
        let len = left[0].bits.len().min(right[0].bits.len());
        if len <= 1 {
            return Ok(());
        }
        let point = rng.gen_range(1..len);
        left[0].bits[point..len].swap_with_slice(&mut right[0].bits[point..len]);
        Ok(())
    }
}

struct BitFlip {
    probability: f64,
    rate: f64,
}

impl Operator for BitFlip {}

impl GeneticOperator<BitString> for BitFlip {
    fn probability(&self) -> f64 {
        self.probability
    }

    fn apply(&mut self, individuals: &mut [BitString], rng: &mut StdRng) -> anyhow::Result<()> {
        for individual in individuals {
            for bit in individual.bits.iter_mut() {
                if rng.gen::<f64>() < self.rate {
                    *bit = !*bit;
                }
            }
        }
        Ok(())
    }
}

struct CountOnes;

impl IndividualEvaluator<BitString> for CountOnes {
    fn evaluate(&self, individual: &BitString) -> anyhow::Result<f64> {
        Ok(individual.bits.iter().filter(|b| **b).count() as f64)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let length: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(64);
    let population_size: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let executor = args.get(3).cloned().unwrap_or_else(|| "thread".to_string());

    println!("=== OneMax ===");
    println!("  String length: {}", length);
    println!("  Population size: {}", population_size);
    println!("  Executor: {}", executor);

    let operators: Vec<Box<dyn GeneticOperator<BitString>>> = vec![
        Box::new(OnePointCrossover { probability: 0.7 }),
        Box::new(BitFlip { probability: 0.2, rate: 1.0 / length as f64 }),
    ];
    let sub_population = Subpopulation::new(
        Box::new(RandomBits { length }),
        Arc::new(CountOnes),
        population_size,
    )
    .with_higher_is_better(true)
    .with_elitism_rate(0.02)
    .with_operators(operators);

    let settings = RunSettings {
        max_generation: 200,
        executor,
        random_seed: Some(42),
        ..RunSettings::default()
    };

    let config = RunConfig::new(
        sub_population,
        StatisticsInput::single(BestAverageWorstStatistics::default()),
        Box::new(SimpleBreeder::default()),
        Box::new(SimplePopulationEvaluator::new()),
        Box::new(ThresholdFromTargetTerminationChecker::new(length as f64, 0.0)),
    )
    .with_settings(settings);

    let mut engine = EvolutionEngine::new(config, SimpleEvolution::new())?;
    engine.evolve()?;

    let best = engine.best_of_run().and_then(Individual::fitness).unwrap_or(0.0);
    println!();
    println!("Finished after generation {}", engine.final_generation());
    println!("Best fitness: {:.0}/{}", best, length);
    println!("Agreement with all-ones mask: {}", engine.execute(&vec![true; length])?);

    Ok(())
}
