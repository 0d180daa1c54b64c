// Configuration management module
// TOML settings stored in the data directory, plus the interactive editor

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, OllamaConfig, RetrievalConfig};
