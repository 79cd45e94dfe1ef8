use std::cmp::Ordering;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;

use super::collaborators::{Breeder, Operator, PopulationEvaluator, TerminationChecker};
use super::population::{Population, Subpopulation};
use super::worker_pool::PoolHandle;
use crate::error::EvoError;
use crate::types::{is_better, Individual};

/// Elitism, tournament selection, then the subpopulation's operator sequence.
#[derive(Debug, Clone)]
pub struct SimpleBreeder {
    pub tournament_size: usize,
}

impl SimpleBreeder {
    pub fn new(tournament_size: usize) -> Self {
        Self { tournament_size }
    }

    fn breed<I: Individual>(&self, sub: &mut Subpopulation<I>, rng: &mut StdRng) -> anyhow::Result<Vec<I>> {
        if sub.individuals.is_empty() {
            anyhow::bail!("cannot breed an empty subpopulation");
        }

        let mut ranked: Vec<&I> = sub.individuals.iter().collect();
        ranked.sort_by(|a, b| rank(*a, *b, sub.higher_is_better));
        let mut next: Vec<I> = ranked
            .into_iter()
            .take(sub.elite_count())
            .cloned()
            .collect();

        let offspring_count = sub.population_size.saturating_sub(next.len());
        let mut offspring: Vec<I> = (0..offspring_count)
            .map(|_| tournament_selection(&sub.individuals, self.tournament_size, sub.higher_is_better, rng).clone())
            .collect();

        for operator in sub.operators_sequence.iter_mut() {
            let arity = operator.arity().max(1);
            let probability = operator.probability();
            for group in offspring.chunks_mut(arity) {
                if group.len() == arity && rng.gen::<f64>() < probability {
                    operator.apply(group, rng)?;
                }
            }
        }

        next.extend(offspring);
        Ok(next)
    }
}

impl Default for SimpleBreeder {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Operator for SimpleBreeder {
    fn name(&self) -> &str {
        "SimpleBreeder"
    }
}

impl<I: Individual> Breeder<I> for SimpleBreeder {
    fn apply_breed(&mut self, population: &mut Population<I>, rng: &mut StdRng) -> anyhow::Result<()> {
        for sub_population in population.sub_populations_mut() {
            sub_population.individuals = self.breed(sub_population, rng)?;
        }
        Ok(())
    }
}

/// Best-first ordering.
fn rank<I: Individual>(a: &I, b: &I, higher_is_better: bool) -> Ordering {
    if is_better(a, b, higher_is_better) {
        Ordering::Less
    } else if is_better(b, a, higher_is_better) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Tournament selection: pick best of K random candidates
fn tournament_selection<'a, I: Individual>(
    individuals: &'a [I],
    tournament_size: usize,
    higher_is_better: bool,
    rng: &mut StdRng,
) -> &'a I {
    let mut best = &individuals[rng.gen_range(0..individuals.len())];
    for _ in 1..tournament_size.max(1) {
        let candidate = &individuals[rng.gen_range(0..individuals.len())];
        if is_better(candidate, best, higher_is_better) {
            best = candidate;
        }
    }
    best
}

/// Evaluates every individual on the lent worker pool, one task per
/// individual, and reports the best individual of the first subpopulation.
#[derive(Default)]
pub struct SimplePopulationEvaluator {
    executor: Option<PoolHandle>,
}

impl SimplePopulationEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Operator for SimplePopulationEvaluator {
    fn name(&self) -> &str {
        "SimplePopulationEvaluator"
    }
}

impl<I: Individual> PopulationEvaluator<I> for SimplePopulationEvaluator {
    fn set_executor(&mut self, handle: PoolHandle) {
        self.executor = Some(handle);
    }

    fn act(&mut self, population: &mut Population<I>) -> anyhow::Result<I> {
        let pool = self
            .executor
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no worker pool has been lent to the evaluator"))?;

        let mut best_of_first = None;
        for (index, sub_population) in population.sub_populations_mut().iter_mut().enumerate() {
            let evaluator = Arc::clone(&sub_population.evaluator);
            let fitnesses = pool
                .map(&sub_population.individuals, |individual| {
                    let fitness = evaluator.evaluate(individual)?;
                    if !fitness.is_finite() {
                        anyhow::bail!("Non-finite fitness score encountered: {}", fitness);
                    }
                    Ok(fitness)
                })
                .map_err(|e| match e {
                    EvoError::Collaborator(inner) => inner,
                    other => other.into(),
                })?;

            for (individual, fitness) in sub_population.individuals.iter_mut().zip(fitnesses) {
                individual.set_fitness(fitness);
            }
            if index == 0 {
                best_of_first = sub_population.best().cloned();
            }
        }

        best_of_first.ok_or_else(|| anyhow::anyhow!("population has no evaluated individuals"))
    }
}

/// Stops the run once the best fitness is within `threshold` of `optimal`.
#[derive(Debug, Clone)]
pub struct ThresholdFromTargetTerminationChecker {
    pub optimal: f64,
    pub threshold: f64,
}

impl ThresholdFromTargetTerminationChecker {
    pub fn new(optimal: f64, threshold: f64) -> Self {
        Self { optimal, threshold }
    }
}

impl Default for ThresholdFromTargetTerminationChecker {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Operator for ThresholdFromTargetTerminationChecker {
    fn name(&self) -> &str {
        "ThresholdFromTargetTerminationChecker"
    }
}

impl<I: Individual> TerminationChecker<I> for ThresholdFromTargetTerminationChecker {
    fn should_terminate(
        &mut self,
        _population: &Population<I>,
        best_of_run: Option<&I>,
        _generation_num: usize,
    ) -> anyhow::Result<bool> {
        Ok(best_of_run
            .and_then(Individual::fitness)
            .map(|fitness| (fitness - self.optimal).abs() <= self.threshold)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::collaborators::{Creator, GeneticOperator, IndividualEvaluator};
    use crate::engines::worker_pool::WorkerPool;
    use crate::types::ExecutorMode;
    use rand::SeedableRng;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Number {
        value: f64,
        fitness: Option<f64>,
    }

    impl Individual for Number {
        fn fitness(&self) -> Option<f64> {
            self.fitness
        }

        fn set_fitness(&mut self, fitness: f64) {
            self.fitness = Some(fitness);
        }
    }

    struct Fixed(Vec<f64>);

    impl Operator for Fixed {}

    impl Creator<Number> for Fixed {
        fn create_individuals(&mut self, _count: usize, _rng: &mut StdRng) -> anyhow::Result<Vec<Number>> {
            Ok(self.0.iter().map(|v| Number { value: *v, fitness: None }).collect())
        }
    }

    struct Identity;

    impl IndividualEvaluator<Number> for Identity {
        fn evaluate(&self, individual: &Number) -> anyhow::Result<f64> {
            Ok(individual.value)
        }
    }

    fn population(values: Vec<f64>, higher_is_better: bool) -> Population<Number> {
        let size = values.len();
        let mut sub = Subpopulation::new(Box::new(Fixed(values.clone())), Arc::new(Identity), size)
            .with_higher_is_better(higher_is_better);
        sub.individuals = values.into_iter().map(|value| Number { value, fitness: None }).collect();
        Population::new(vec![sub])
    }

    fn evaluator(mode: ExecutorMode) -> SimplePopulationEvaluator {
        let mut evaluator = SimplePopulationEvaluator::new();
        let pool = Arc::new(WorkerPool::new(mode, Some(2)).unwrap());
        PopulationEvaluator::<Number>::set_executor(&mut evaluator, pool.lend());
        evaluator
    }

    #[test]
    fn test_act_assigns_fitness_and_returns_best() {
        for mode in [ExecutorMode::Thread, ExecutorMode::Process] {
            let mut pop = population(vec![3.0, 9.0, 1.0], true);
            let best = evaluator(mode).act(&mut pop).unwrap();

            assert_eq!(best.value, 9.0);
            assert!(pop.individuals().all(|i| i.fitness == Some(i.value)));
        }
    }

    #[test]
    fn test_act_minimizes_when_lower_is_better() {
        let mut pop = population(vec![3.0, 9.0, 1.0], false);
        let best = evaluator(ExecutorMode::Thread).act(&mut pop).unwrap();
        assert_eq!(best.value, 1.0);
    }

    #[test]
    fn test_act_without_pool_fails() {
        let mut pop = population(vec![1.0], true);
        let mut evaluator = SimplePopulationEvaluator::new();
        assert!(PopulationEvaluator::<Number>::act(&mut evaluator, &mut pop).is_err());
    }

    #[test]
    fn test_act_rejects_non_finite_fitness() {
        let mut pop = population(vec![1.0, f64::NAN], true);
        let err = evaluator(ExecutorMode::Thread).act(&mut pop).unwrap_err();
        assert!(err.to_string().contains("Non-finite"));
    }

    #[test]
    fn test_threshold_checker() {
        let pop = population(vec![], true);
        let mut checker = ThresholdFromTargetTerminationChecker::new(1.0, 0.01);
        let near = Number { value: 0.0, fitness: Some(0.995) };
        let far = Number { value: 0.0, fitness: Some(0.5) };

        assert!(checker.should_terminate(&pop, Some(&near), 0).unwrap());
        assert!(!checker.should_terminate(&pop, Some(&far), 0).unwrap());
        assert!(!checker.should_terminate(&pop, None, 0).unwrap());
    }

    struct Negate;

    impl Operator for Negate {}

    impl GeneticOperator<Number> for Negate {
        fn probability(&self) -> f64 {
            1.0
        }

        fn apply(&mut self, individuals: &mut [Number], _rng: &mut StdRng) -> anyhow::Result<()> {
            for individual in individuals {
                individual.value = -individual.value;
            }
            Ok(())
        }
    }

    fn evaluated(values: Vec<f64>, higher_is_better: bool, elitism_rate: f64) -> Population<Number> {
        let mut pop = population(values, higher_is_better);
        let sub = &mut pop.sub_populations_mut()[0];
        sub.elitism_rate = elitism_rate;
        for individual in sub.individuals.iter_mut() {
            individual.fitness = Some(individual.value);
        }
        pop
    }

    #[test]
    fn test_breeder_keeps_size_and_elites() {
        let mut pop = evaluated(vec![1.0, 5.0, 3.0, 2.0], true, 0.5);
        let mut rng = StdRng::seed_from_u64(1);

        SimpleBreeder::default().apply_breed(&mut pop, &mut rng).unwrap();

        let individuals = &pop.sub_populations()[0].individuals;
        assert_eq!(individuals.len(), 4);
        assert_eq!(individuals[0].value, 5.0);
        assert_eq!(individuals[1].value, 3.0);
    }

    #[test]
    fn test_breeder_applies_operators_to_offspring_only() {
        let mut pop = evaluated(vec![1.0, 2.0], true, 0.5);
        pop.sub_populations_mut()[0].operators_sequence = vec![Box::new(Negate)];
        let mut rng = StdRng::seed_from_u64(2);

        SimpleBreeder::new(2).apply_breed(&mut pop, &mut rng).unwrap();

        let individuals = &pop.sub_populations()[0].individuals;
        assert_eq!(individuals[0].value, 2.0);
        assert!(individuals[1].value < 0.0);
    }

    #[test]
    fn test_tournament_prefers_better() {
        let individuals: Vec<Number> = [4.0, 1.0, 3.0]
            .iter()
            .map(|v| Number { value: *v, fitness: Some(*v) })
            .collect();
        let mut rng = StdRng::seed_from_u64(3);

        // A tournament larger than the population almost surely sees the best.
        let winner = tournament_selection(&individuals, 50, false, &mut rng);
        assert_eq!(winner.value, 1.0);
    }
}
