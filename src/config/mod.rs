pub mod traits;
pub mod run;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use run::RunSettings;
pub use traits::ConfigSection;
