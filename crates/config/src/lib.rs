//! Layer loading configuration for Strata.
//!
//! Reads `strata.toml` (which files to stack, which environment prefix to
//! read) with environment variable overrides, then builds a
//! [`LayeredMap`](strata_core::LayeredMap) from defaults, files,
//! environment and explicit overrides, in that order.

mod loader;

pub use loader::{LayerLoader, LayerOrigin, LayerSource, LoadedLayers};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File name looked up by [`LoaderConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "strata.toml";

/// Environment variable overriding [`LoaderConfig::env_prefix`].
pub const ENV_PREFIX_VAR: &str = "STRATA_ENV_PREFIX";

/// Environment variable overriding [`LoaderConfig::skip_missing`].
pub const SKIP_MISSING_VAR: &str = "STRATA_SKIP_MISSING";

/// Which sources feed a layered map and how.
///
/// Maps directly to `strata.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Layer files, lowest priority first. `.json` files are parsed as JSON,
    /// everything else as TOML.
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Prefix selecting environment variables for the environment layer
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    /// Skip listed files that do not exist instead of failing
    #[serde(default = "default_true")]
    pub skip_missing: bool,

    /// Whether to stack an environment layer at all
    #[serde(default = "default_true")]
    pub include_env: bool,
}

fn default_env_prefix() -> String {
    "STRATA_".into()
}
fn default_true() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            files: vec![],
            env_prefix: default_env_prefix(),
            skip_missing: true,
            include_env: true,
        }
    }
}

impl LoaderConfig {
    /// Load `strata.toml` from the working directory, then apply
    /// `STRATA_ENV_PREFIX` / `STRATA_SKIP_MISSING` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new(DEFAULT_CONFIG_FILE))?;
        config.apply_env_overrides(utf8_env_vars(std::env::vars_os()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file yields the defaults. Relative layer paths are
    /// resolved against the directory holding the configuration file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No loader config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(base) = path.parent() {
            for file in &mut config.files {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `(name, value)` environment pairs.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            match name.as_str() {
                ENV_PREFIX_VAR => self.env_prefix = value,
                SKIP_MISSING_VAR => {
                    self.skip_missing = parse_flag(&value).ok_or_else(|| {
                        ConfigError::ValidationError(format!(
                            "{SKIP_MISSING_VAR} must be true or false, got '{value}'"
                        ))
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.include_env && self.env_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "env_prefix must not be empty when include_env is set".into(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.files.iter().find(|file| !seen.insert(*file)) {
            return Err(ConfigError::ValidationError(format!(
                "layer file listed twice: {}",
                duplicate.display()
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Keep the environment pairs that are valid UTF-8. Others are logged and
/// dropped.
pub(crate) fn utf8_env_vars<I>(vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (name, _) => {
                tracing::warn!(
                    name = %name.map_or_else(|n| n.to_string_lossy().into_owned(), |n| n),
                    "Skipping environment variable that is not valid UTF-8"
                );
                None
            }
        })
        .collect()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration and layer loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Layer file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid layers: {0}")]
    Layers(#[from] strata_core::Error),
}
