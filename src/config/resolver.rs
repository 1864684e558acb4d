//! Precedence resolution for configuration.
//!
//! ## Store root (highest to lowest)
//!
//! 1. `--store` CLI flag
//! 2. `ABL_DATA_DIR` environment variable (root is `$ABL_DATA_DIR/abilities`)
//! 3. `store-root` in the system config.kdl
//! 4. `<data dir>/abl/abilities`
//!
//! ## Other preferences
//!
//! CLI flag > system config.kdl > built-in defaults

use std::path::PathBuf;

use crate::Result;
use crate::config::schema::{AbilityConfig, OutputFormat};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "ABL_DATA_DIR";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "ABL_CONFIG_DIR";

/// Store folder name under a data directory.
const STORE_DIR_NAME: &str = "abilities";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the system config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub store_root: Resolved<PathBuf>,
    pub seed_defaults: Resolved<bool>,
    pub output_format: Resolved<OutputFormat>,
    /// Config file consulted, if a config directory could be determined
    pub config_path: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn store_root(&self) -> &PathBuf {
        &self.store_root.value
    }

    pub fn seed_defaults(&self) -> bool {
        self.seed_defaults.value
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Store root from `--store`
    pub store_root: Option<PathBuf>,
    /// Output format from `-H`
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store_root = Some(root.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Path of the system config.kdl.
///
/// `$ABL_CONFIG_DIR/config.kdl` when set, otherwise `<config dir>/abl/config.kdl`.
pub fn system_config_path() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir).join("config.kdl")),
        _ => dirs::config_dir().map(|d| d.join("abl").join("config.kdl")),
    }
}

/// Read the system config, or an empty config when there is none.
pub fn read_system_config() -> Result<AbilityConfig> {
    match system_config_path() {
        Some(path) => AbilityConfig::load(&path),
        None => Ok(AbilityConfig::new()),
    }
}

/// Resolve configuration from the process environment and system config.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = read_system_config()?;
    let env_data_dir = std::env::var(DATA_DIR_ENV).ok();
    let mut resolved = resolve_config_from(overrides, &system, env_data_dir.as_deref());
    resolved.config_path = system_config_path();
    Ok(resolved)
}

/// Resolve configuration from explicit inputs.
pub fn resolve_config_from(
    overrides: &ConfigOverrides,
    system: &AbilityConfig,
    env_data_dir: Option<&str>,
) -> ResolvedConfig {
    let store_root = if let Some(ref root) = overrides.store_root {
        Resolved::new(root.clone(), ValueSource::CliFlag)
    } else if let Some(dir) = env_data_dir.filter(|d| !d.is_empty()) {
        Resolved::new(
            PathBuf::from(dir).join(STORE_DIR_NAME),
            ValueSource::EnvVar(DATA_DIR_ENV.to_string()),
        )
    } else if let Some(ref root) = system.store_root {
        Resolved::new(root.clone(), ValueSource::System)
    } else {
        Resolved::new(default_store_root(), ValueSource::Default)
    };

    let seed_defaults = match system.seed_defaults {
        Some(seed) => Resolved::new(seed, ValueSource::System),
        None => Resolved::new(true, ValueSource::Default),
    };

    let output_format = if let Some(format) = overrides.output_format {
        Resolved::new(format, ValueSource::CliFlag)
    } else if let Some(format) = system.output_format {
        Resolved::new(format, ValueSource::System)
    } else {
        Resolved::new(OutputFormat::default(), ValueSource::Default)
    };

    ResolvedConfig {
        store_root,
        seed_defaults,
        output_format,
        config_path: None,
    }
}

fn default_store_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("abl")
        .join(STORE_DIR_NAME)
}
