use super::traits::ConfigSection;
use crate::error::EvoError;
use crate::types::ExecutorMode;
use serde::{Deserialize, Serialize};

/// Scalar options of a run that can live in a config file.
///
/// Collaborators (population, breeder, evaluator...) cannot be described
/// in a file; they are supplied through [`RunConfig`](crate::engines::RunConfig).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Upper bound on the number of generations.
    pub max_generation: usize,
    /// Either "thread" or "process".
    pub executor: String,
    /// Worker bound; `None` uses rayon's default parallelism.
    pub max_workers: Option<usize>,
    /// Root seed; `None` derives one from the wall clock.
    pub random_seed: Option<u64>,
    /// Seed of the current generation, used when resuming.
    pub generation_seed: Option<u64>,
    /// Generation to start counting from.
    pub generation_num: usize,
    /// Custom event names registered next to the standing ones.
    pub event_names: Vec<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_generation: 1000,
            executor: ExecutorMode::Thread.as_str().to_string(),
            max_workers: None,
            random_seed: None,
            generation_seed: None,
            generation_num: 0,
            event_names: Vec::new(),
        }
    }
}

impl RunSettings {
    pub fn executor_mode(&self) -> Result<ExecutorMode, EvoError> {
        self.executor.parse()
    }

    /// Root seed, falling back to the current wall-clock time in milliseconds.
    pub fn resolve_random_seed(&self) -> u64 {
        self.random_seed
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().unsigned_abs())
    }
}

impl ConfigSection for RunSettings {
    fn section_name() -> &'static str {
        "run"
    }

    fn validate(&self) -> Result<(), EvoError> {
        self.executor_mode()?;
        if self.max_workers == Some(0) {
            return Err(EvoError::Configuration(
                "max_workers must be positive when set".to_string(),
            ));
        }
        if self.event_names.iter().any(|name| name.trim().is_empty()) {
            return Err(EvoError::Configuration(
                "Event names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
