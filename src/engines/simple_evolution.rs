use std::marker::PhantomData;

use super::collaborators::Executable;
use super::evolution_engine::{Algorithm, FinishContext, GenerationContext};
use crate::error::{EvoError, Result};
use crate::types::{is_better, Individual};

/// Single-objective evolution: breed, evaluate, keep the best individual seen.
pub struct SimpleEvolution<I> {
    _individual: PhantomData<fn() -> I>,
}

impl<I> SimpleEvolution<I> {
    pub fn new() -> Self {
        Self {
            _individual: PhantomData,
        }
    }
}

impl<I> Default for SimpleEvolution<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Algorithm<I> for SimpleEvolution<I>
where
    I: Individual + Executable,
{
    type Input = <I as Executable>::Input;
    type Output = <I as Executable>::Output;

    fn generation_iteration(&mut self, ctx: GenerationContext<'_, I>) -> Result<()> {
        let GenerationContext {
            population,
            breeder,
            population_evaluator,
            best_of_run,
            rng,
            generation_num,
            ..
        } = ctx;

        breeder.apply_breed(population, rng)?;
        let best_of_gen = population_evaluator.act(population)?;

        let higher_is_better = population
            .sub_populations()
            .first()
            .map(|sub| sub.higher_is_better)
            .unwrap_or(false);
        let improved = match best_of_run {
            Some(current) => is_better(&best_of_gen, current, higher_is_better),
            None => true,
        };
        if improved {
            log::debug!(
                "New best of run at generation {}: {:?}",
                generation_num,
                best_of_gen.fitness()
            );
            *best_of_run = Some(best_of_gen);
        }
        Ok(())
    }

    fn finish(&mut self, ctx: FinishContext<'_, I>) -> Result<()> {
        match ctx.best_of_run.and_then(Individual::fitness) {
            Some(fitness) => log::info!(
                "Best of run after generation {}: fitness {:.4}",
                ctx.final_generation,
                fitness
            ),
            None => log::warn!("Run finished without an evaluated individual"),
        }
        Ok(())
    }

    fn execute(&self, best_of_run: Option<&I>, input: &Self::Input) -> Result<Self::Output> {
        let best = best_of_run
            .ok_or_else(|| EvoError::InvalidState("no best-of-run individual to execute".to_string()))?;
        Ok(best.execute(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::collaborators::{Breeder, Creator, IndividualEvaluator, Operator, PopulationEvaluator};
    use crate::engines::defaults::SimplePopulationEvaluator;
    use crate::engines::events::EventBus;
    use crate::engines::population::{Population, Subpopulation};
    use crate::engines::worker_pool::WorkerPool;
    use crate::types::ExecutorMode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Gain {
        factor: f64,
        fitness: Option<f64>,
    }

    impl Individual for Gain {
        fn fitness(&self) -> Option<f64> {
            self.fitness
        }

        fn set_fitness(&mut self, fitness: f64) {
            self.fitness = Some(fitness);
        }
    }

    impl Executable for Gain {
        type Input = f64;
        type Output = f64;

        fn execute(&self, input: &f64) -> anyhow::Result<f64> {
            Ok(self.factor * input)
        }
    }

    struct Unused;

    impl Operator for Unused {}

    impl Creator<Gain> for Unused {
        fn create_individuals(&mut self, _count: usize, _rng: &mut StdRng) -> anyhow::Result<Vec<Gain>> {
            Ok(Vec::new())
        }
    }

    struct Factor;

    impl IndividualEvaluator<Gain> for Factor {
        fn evaluate(&self, individual: &Gain) -> anyhow::Result<f64> {
            Ok(individual.factor)
        }
    }

    /// Replaces the population with fixed factors instead of breeding.
    struct Scripted(Vec<f64>);

    impl Operator for Scripted {}

    impl Breeder<Gain> for Scripted {
        fn apply_breed(&mut self, population: &mut Population<Gain>, _rng: &mut StdRng) -> anyhow::Result<()> {
            population.sub_populations_mut()[0].individuals = self
                .0
                .iter()
                .map(|factor| Gain { factor: *factor, fitness: None })
                .collect();
            Ok(())
        }
    }

    fn run_generation(factors: Vec<f64>, best_of_run: &mut Option<Gain>) {
        let sub = Subpopulation::new(Box::new(Unused), Arc::new(Factor), factors.len())
            .with_higher_is_better(true);
        let mut population = Population::new(vec![sub]);
        let mut breeder = Scripted(factors);
        let mut evaluator = SimplePopulationEvaluator::new();
        let pool = Arc::new(WorkerPool::new(ExecutorMode::Thread, Some(1)).unwrap());
        PopulationEvaluator::<Gain>::set_executor(&mut evaluator, pool.lend());
        let mut rng = StdRng::seed_from_u64(0);
        let mut events = EventBus::new();

        SimpleEvolution::new()
            .generation_iteration(GenerationContext {
                population: &mut population,
                breeder: &mut breeder,
                population_evaluator: &mut evaluator,
                best_of_run,
                rng: &mut rng,
                events: &mut events,
                generation_num: 0,
            })
            .unwrap();
    }

    #[test]
    fn test_best_of_run_only_improves() {
        let mut best_of_run = None;

        run_generation(vec![1.0, 3.0], &mut best_of_run);
        assert_eq!(best_of_run.as_ref().map(|b| b.factor), Some(3.0));

        run_generation(vec![2.0], &mut best_of_run);
        assert_eq!(best_of_run.as_ref().map(|b| b.factor), Some(3.0));

        run_generation(vec![4.0, 0.5], &mut best_of_run);
        assert_eq!(best_of_run.as_ref().map(|b| b.factor), Some(4.0));
    }

    #[test]
    fn test_execute_runs_best_individual() {
        let algorithm = SimpleEvolution::<Gain>::new();
        let best = Gain { factor: 2.5, fitness: Some(2.5) };

        assert_eq!(algorithm.execute(Some(&best), &4.0).unwrap(), 10.0);
        assert!(matches!(
            algorithm.execute(None, &4.0),
            Err(EvoError::InvalidState(_))
        ));
    }
}
