use std::path::{Path, PathBuf};
use std::{env, fs};

use tick_core::ReclaimerConfig;

use crate::error::{ConfigError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TICKSTACK_CONFIG";

/// File name searched for in the working directory.
pub const CONFIG_FILE: &str = "tickstack.toml";

/// Where the effective configuration came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Env(PathBuf),
    WorkingDir(PathBuf),
    Defaults,
}

#[derive(Clone, Debug)]
pub struct LoadedConfig {
    pub config: ReclaimerConfig,
    pub source: ConfigSource,
}

// ---------------------------------------------------------------------------
// Pure helpers (no I/O, fully unit-testable)
// ---------------------------------------------------------------------------

/// Parse and validate TOML content. `path` only labels errors.
pub fn parse_config(content: &str, path: &Path) -> Result<ReclaimerConfig> {
    let config: ReclaimerConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Pick the config location. Precedence: explicit path, then the env var,
/// then `tickstack.toml` in `cwd` if it exists.
fn resolve(
    explicit: Option<&Path>,
    env_value: Option<String>,
    cwd: &Path,
    exists: impl Fn(&Path) -> bool,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return ConfigSource::Env(PathBuf::from(value));
    }
    let local = cwd.join(CONFIG_FILE);
    if exists(&local) {
        ConfigSource::WorkingDir(local)
    } else {
        ConfigSource::Defaults
    }
}

// ---------------------------------------------------------------------------
// I/O
// ---------------------------------------------------------------------------

/// Resolve, read and validate the effective configuration.
///
/// An explicitly named file (argument or env var) must exist; a missing
/// working-directory file silently falls back to defaults.
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let source = resolve(explicit, env::var(CONFIG_ENV).ok(), &cwd, Path::is_file);

    let config = match &source {
        ConfigSource::Explicit(path) | ConfigSource::Env(path) | ConfigSource::WorkingDir(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let config = parse_config(&content, path)?;
            tracing::info!("loaded config from {}", path.display());
            config
        }
        ConfigSource::Defaults => {
            tracing::debug!("no config file found, using defaults");
            ReclaimerConfig::default()
        }
    };
    Ok(LoadedConfig { config, source })
}
