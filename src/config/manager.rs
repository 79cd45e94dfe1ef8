use super::{run::RunSettings, traits::ConfigSection};
use crate::error::EvoError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Prefix of environment variables overriding file values,
/// e.g. `EVORUN__RUN__MAX_GENERATION=50`.
pub const ENV_PREFIX: &str = "EVORUN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EvoError> {
        validate_section(&self.run)
    }
}

/// Validates one section, naming it in configuration errors.
fn validate_section<S: ConfigSection>(section: &S) -> Result<(), EvoError> {
    section.validate().map_err(|e| match e {
        EvoError::Configuration(message) => {
            EvoError::Configuration(format!("[{}] {}", S::section_name(), message))
        }
        other => other,
    })
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvoError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EvoError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| EvoError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    /// Loads `path` and overlays any `EVORUN__<SECTION>__<KEY>` environment variables.
    pub fn load_layered<P: AsRef<Path>>(&self, path: P) -> Result<(), EvoError> {
        let layered = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| EvoError::Configuration(format!("Failed to load config: {}", e)))?;

        let config: AppConfig = layered
            .try_deserialize()
            .map_err(|e| EvoError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvoError> {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| EvoError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn run_settings(&self) -> RunSettings {
        self.get().run
    }

    /// Applies `f` and keeps the result only if it still validates.
    pub fn update<F>(&self, f: F) -> Result<(), EvoError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_invalid_change() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.run.executor = "coroutine".to_string());

        assert!(result.is_err());
        assert_eq!(manager.run_settings().executor, "thread");
    }

    #[test]
    fn test_update_applies_valid_change() {
        let manager = ConfigManager::new();
        manager
            .update(|c| {
                c.run.max_generation = 40;
                c.run.random_seed = Some(10);
            })
            .unwrap();

        let settings = manager.run_settings();
        assert_eq!(settings.max_generation, 40);
        assert_eq!(settings.random_seed, Some(10));
    }
}
