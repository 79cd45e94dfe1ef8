use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use super::collaborators::Statistics;
use super::events::{Event, EventPayload};
use super::population::Subpopulation;
use crate::types::Individual;

/// Fitness summary of one subpopulation at one point of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub sub_population: usize,
    pub best: f64,
    pub average: f64,
    pub worst: f64,
}

impl GenerationStats {
    fn collect<I: Individual>(generation: usize, index: usize, sub: &Subpopulation<I>) -> Option<Self> {
        let fitnesses: Vec<f64> = sub.individuals.iter().filter_map(Individual::fitness).collect();
        if fitnesses.is_empty() {
            return None;
        }

        let max = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = fitnesses.iter().cloned().fold(f64::INFINITY, f64::min);
        let (best, worst) = if sub.higher_is_better { (max, min) } else { (min, max) };

        Some(Self {
            generation,
            sub_population: index,
            best,
            average: fitnesses.iter().sum::<f64>() / fitnesses.len() as f64,
            worst,
        })
    }
}

fn summarize<I: Individual>(event: &Event, payload: &EventPayload<'_, I>) -> Vec<GenerationStats> {
    let generation = match payload {
        EventPayload::AfterGeneration { generation_num, .. } => *generation_num,
        EventPayload::EvolutionFinished { final_generation, .. } => *final_generation,
        EventPayload::Init { .. } => 0,
        EventPayload::Empty => {
            log::debug!("No population attached to event '{}'", event);
            return Vec::new();
        }
    };

    payload
        .population()
        .map(|population| {
            population
                .sub_populations()
                .iter()
                .enumerate()
                .filter_map(|(index, sub)| GenerationStats::collect(generation, index, sub))
                .collect()
        })
        .unwrap_or_default()
}

/// Logs best, average and worst fitness of each subpopulation after every
/// generation and keeps the history.
pub struct BestAverageWorstStatistics {
    id: String,
    history: Vec<GenerationStats>,
}

impl BestAverageWorstStatistics {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }
}

impl Default for BestAverageWorstStatistics {
    fn default() -> Self {
        Self::new("best_average_worst")
    }
}

impl<I: Individual> Statistics<I> for BestAverageWorstStatistics {
    fn id(&self) -> &str {
        &self.id
    }

    fn write_statistics(&mut self, event: &Event, payload: &EventPayload<'_, I>) -> anyhow::Result<()> {
        for stats in summarize(event, payload) {
            log::info!(
                "Generation {} subpopulation {}: best {:.4}, average {:.4}, worst {:.4}",
                stats.generation,
                stats.sub_population,
                stats.best,
                stats.average,
                stats.worst
            );
            self.history.push(stats);
        }
        Ok(())
    }
}

// For forwarding progress to another thread
pub enum StatisticsMessage {
    Initialized { max_generation: usize },
    GenerationComplete(Vec<GenerationStats>),
    Finished { final_generation: usize },
}

pub struct ChannelStatistics {
    id: String,
    sender: Sender<StatisticsMessage>,
}

impl ChannelStatistics {
    pub fn new(id: impl Into<String>, sender: Sender<StatisticsMessage>) -> Self {
        Self {
            id: id.into(),
            sender,
        }
    }
}

impl<I: Individual> Statistics<I> for ChannelStatistics {
    fn id(&self) -> &str {
        &self.id
    }

    fn events(&self) -> Vec<Event> {
        Event::STANDING.to_vec()
    }

    fn write_statistics(&mut self, event: &Event, payload: &EventPayload<'_, I>) -> anyhow::Result<()> {
        let message = match payload {
            EventPayload::Init { max_generation, .. } => StatisticsMessage::Initialized {
                max_generation: *max_generation,
            },
            EventPayload::AfterGeneration { .. } => {
                StatisticsMessage::GenerationComplete(summarize(event, payload))
            }
            EventPayload::EvolutionFinished { final_generation, .. } => StatisticsMessage::Finished {
                final_generation: *final_generation,
            },
            EventPayload::Empty => return Ok(()),
        };
        let _ = self.sender.send(message);
        Ok(())
    }
}
