pub mod error;
pub mod loader;

pub use error::{ConfigError, Result};
pub use loader::{CONFIG_ENV, CONFIG_FILE, ConfigSource, LoadedConfig, load, parse_config};
