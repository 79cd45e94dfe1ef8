use std::sync::Arc;

use rand::rngs::StdRng;

use super::collaborators::{Creator, GeneticOperator, IndividualEvaluator};
use crate::error::EvoError;
use crate::types::{is_better, Individual};

/// A group of individuals sharing representation, operators and evaluator.
pub struct Subpopulation<I> {
    pub individuals: Vec<I>,
    pub population_size: usize,
    pub higher_is_better: bool,
    pub elitism_rate: f64,
    pub creator: Box<dyn Creator<I>>,
    pub evaluator: Arc<dyn IndividualEvaluator<I>>,
    pub operators_sequence: Vec<Box<dyn GeneticOperator<I>>>,
}

impl<I: Individual> Subpopulation<I> {
    pub fn new(
        creator: Box<dyn Creator<I>>,
        evaluator: Arc<dyn IndividualEvaluator<I>>,
        population_size: usize,
    ) -> Self {
        Self {
            individuals: Vec::with_capacity(population_size),
            population_size,
            higher_is_better: false,
            elitism_rate: 0.0,
            creator,
            evaluator,
            operators_sequence: Vec::new(),
        }
    }

    pub fn with_higher_is_better(mut self, higher_is_better: bool) -> Self {
        self.higher_is_better = higher_is_better;
        self
    }

    pub fn with_elitism_rate(mut self, elitism_rate: f64) -> Self {
        self.elitism_rate = elitism_rate;
        self
    }

    pub fn with_operators(mut self, operators: Vec<Box<dyn GeneticOperator<I>>>) -> Self {
        self.operators_sequence = operators;
        self
    }

    /// A subpopulation must be able to hold at least one individual.
    pub fn is_valid(&self) -> bool {
        self.population_size > 0 && (0.0..=1.0).contains(&self.elitism_rate)
    }

    /// Number of individuals copied unchanged into the next generation.
    pub fn elite_count(&self) -> usize {
        (self.population_size as f64 * self.elitism_rate) as usize
    }

    /// Replaces the current individuals with freshly created ones.
    pub fn create_individuals(&mut self, rng: &mut StdRng) -> anyhow::Result<()> {
        let created = self.creator.create_individuals(self.population_size, rng)?;
        if created.len() != self.population_size {
            anyhow::bail!(
                "creator produced {} individuals, expected {}",
                created.len(),
                self.population_size
            );
        }
        self.individuals = created;
        Ok(())
    }

    /// Calls the initialization hook of the creator and every operator.
    pub fn initialize_operators(&mut self) -> anyhow::Result<()> {
        self.creator.initialize()?;
        for operator in &mut self.operators_sequence {
            operator.initialize()?;
        }
        Ok(())
    }

    /// Best evaluated individual, if any has been evaluated.
    pub fn best(&self) -> Option<&I> {
        self.individuals
            .iter()
            .filter(|ind| ind.fitness().is_some())
            .fold(None, |best: Option<&I>, ind| match best {
                Some(b) if !is_better(ind, b, self.higher_is_better) => Some(b),
                _ => Some(ind),
            })
    }
}

/// The full ordered collection of subpopulations for one run.
pub struct Population<I> {
    sub_populations: Vec<Subpopulation<I>>,
}

impl<I: Individual> Population<I> {
    pub fn new(sub_populations: Vec<Subpopulation<I>>) -> Self {
        Self { sub_populations }
    }

    pub fn sub_populations(&self) -> &[Subpopulation<I>] {
        &self.sub_populations
    }

    pub fn sub_populations_mut(&mut self) -> &mut [Subpopulation<I>] {
        &mut self.sub_populations
    }

    pub fn len(&self) -> usize {
        self.sub_populations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_populations.is_empty()
    }

    /// Builds every subpopulation in place.
    pub fn create_population_individuals(&mut self, rng: &mut StdRng) -> anyhow::Result<()> {
        for sub_population in &mut self.sub_populations {
            sub_population.create_individuals(rng)?;
        }
        Ok(())
    }

    pub fn individuals(&self) -> impl Iterator<Item = &I> {
        self.sub_populations.iter().flat_map(|s| s.individuals.iter())
    }

    /// Copies the individuals of every subpopulation, in order.
    pub fn individuals_by_subpopulation(&self) -> Vec<Vec<I>> {
        self.sub_populations
            .iter()
            .map(|s| s.individuals.clone())
            .collect()
    }

    /// Puts previously captured individuals back, one vector per subpopulation.
    pub fn replace_individuals(&mut self, individuals: Vec<Vec<I>>) -> Result<(), EvoError> {
        if individuals.len() != self.sub_populations.len() {
            return Err(EvoError::Configuration(format!(
                "Snapshot holds {} subpopulations but the population has {}",
                individuals.len(),
                self.sub_populations.len()
            )));
        }
        for (sub_population, saved) in self.sub_populations.iter_mut().zip(individuals) {
            sub_population.individuals = saved;
        }
        Ok(())
    }
}

/// Accepted shapes of the `population` construction option.
pub enum PopulationInput<I> {
    Population(Population<I>),
    /// Wrapped into a one-element population.
    Subpopulation(Subpopulation<I>),
    Subpopulations(Vec<Subpopulation<I>>),
}

impl<I> From<Population<I>> for PopulationInput<I> {
    fn from(population: Population<I>) -> Self {
        PopulationInput::Population(population)
    }
}

impl<I> From<Subpopulation<I>> for PopulationInput<I> {
    fn from(sub_population: Subpopulation<I>) -> Self {
        PopulationInput::Subpopulation(sub_population)
    }
}

impl<I> From<Vec<Subpopulation<I>>> for PopulationInput<I> {
    fn from(sub_populations: Vec<Subpopulation<I>>) -> Self {
        PopulationInput::Subpopulations(sub_populations)
    }
}

impl<I: Individual> PopulationInput<I> {
    /// Validates the input and normalizes it into a [`Population`].
    pub fn resolve(input: Option<PopulationInput<I>>) -> Result<Population<I>, EvoError> {
        let sub_populations = match input {
            None => {
                return Err(EvoError::Configuration(
                    "Population cannot be None".to_string(),
                ))
            }
            Some(PopulationInput::Population(population)) => population.sub_populations,
            Some(PopulationInput::Subpopulation(sub_population)) => vec![sub_population],
            Some(PopulationInput::Subpopulations(sub_populations)) => sub_populations,
        };

        if sub_populations.is_empty() {
            return Err(EvoError::Configuration(
                "Population cannot be empty".to_string(),
            ));
        }
        if let Some(index) = sub_populations.iter().position(|s| !s.is_valid()) {
            return Err(EvoError::Configuration(format!(
                "Detected an invalid Subpopulation at index {} of the Population",
                index
            )));
        }

        Ok(Population::new(sub_populations))
    }
}
