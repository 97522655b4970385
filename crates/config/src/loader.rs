//! Stacking configuration sources into a layered map.
//!
//! Layer order, lowest priority first:
//! 1. Built-in defaults
//! 2. Layer files, in the order listed
//! 3. Environment variables carrying the configured prefix
//! 4. Explicit overrides

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strata_core::{ConstructionError, LayeredMap, json_type_name};
use tracing::{debug, warn};

use crate::{ConfigError, ENV_PREFIX_VAR, LoaderConfig, SKIP_MISSING_VAR, utf8_env_vars};

/// Where a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerOrigin {
    Defaults,
    File,
    Env,
    Overrides,
}

/// Provenance of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSource {
    pub origin: LayerOrigin,

    /// File path (None for everything but files)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl LayerSource {
    fn new(origin: LayerOrigin) -> Self {
        Self { origin, path: None }
    }

    fn file(path: &Path) -> Self {
        Self {
            origin: LayerOrigin::File,
            path: Some(path.to_path_buf()),
        }
    }
}

/// A layered map together with the provenance of each layer.
///
/// `sources()[i]` describes `map().layers()[i]`.
#[derive(Debug, Clone)]
pub struct LoadedLayers {
    map: LayeredMap<String, Value>,
    sources: Vec<LayerSource>,
}

impl LoadedLayers {
    pub fn map(&self) -> &LayeredMap<String, Value> {
        &self.map
    }

    pub fn sources(&self) -> &[LayerSource] {
        &self.sources
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// The source whose layer supplies the visible value for `key`.
    pub fn origin_of(&self, key: &str) -> Option<&LayerSource> {
        self.map
            .layers()
            .iter()
            .rposition(|layer| layer.contains_key(key))
            .and_then(|index| self.sources.get(index))
    }

    pub fn into_map(self) -> LayeredMap<String, Value> {
        self.map
    }
}

/// Builds a [`LoadedLayers`] from a [`LoaderConfig`] plus in-process values.
#[derive(Debug, Clone)]
pub struct LayerLoader {
    config: LoaderConfig,
    defaults: Option<Value>,
    overrides: Option<Value>,
    env: Option<Vec<(String, String)>>,
}

impl LayerLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            defaults: None,
            overrides: None,
            env: None,
        }
    }

    /// Lowest-priority layer.
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Highest-priority layer.
    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Read the environment layer from these pairs instead of the process
    /// environment.
    pub fn with_env_vars<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env = Some(vars.into_iter().collect());
        self
    }

    /// Read every source and stack the non-empty ones.
    ///
    /// Each source must be an object. Empty objects are skipped and leave no
    /// provenance entry. Fails if no source contributes a key.
    pub fn load(self) -> Result<LoadedLayers, ConfigError> {
        self.config.validate()?;

        let mut candidates: Vec<(LayerSource, Value)> = Vec::new();

        if let Some(defaults) = self.defaults {
            candidates.push((LayerSource::new(LayerOrigin::Defaults), defaults));
        }

        for path in &self.config.files {
            if !path.exists() {
                if self.config.skip_missing {
                    warn!("Layer file {} not found, skipping", path.display());
                    continue;
                }
                return Err(ConfigError::MissingFile(path.clone()));
            }
            candidates.push((LayerSource::file(path), read_layer_file(path)?));
        }

        if self.config.include_env {
            let vars = match self.env {
                Some(vars) => vars,
                None => utf8_env_vars(std::env::vars_os()),
            };
            candidates.push((
                LayerSource::new(LayerOrigin::Env),
                env_layer(&self.config.env_prefix, vars),
            ));
        }

        if let Some(overrides) = self.overrides {
            candidates.push((LayerSource::new(LayerOrigin::Overrides), overrides));
        }

        let mut sources = Vec::with_capacity(candidates.len());
        let mut values = Vec::with_capacity(candidates.len());
        for (index, (source, value)) in candidates.into_iter().enumerate() {
            match &value {
                Value::Object(map) if map.is_empty() => {
                    debug!(origin = ?source.origin, "Skipping empty layer");
                }
                Value::Object(map) => {
                    debug!(origin = ?source.origin, keys = map.len(), "Stacking layer");
                    sources.push(source);
                    values.push(value);
                }
                other => {
                    return Err(strata_core::Error::from(ConstructionError::NotAMapping {
                        index,
                        found: json_type_name(other).to_string(),
                    })
                    .into());
                }
            }
        }

        let map = LayeredMap::from_values(values).map_err(strata_core::Error::from)?;
        Ok(LoadedLayers { map, sources })
    }
}

/// Parse a layer file: JSON for `.json`, TOML otherwise.
fn read_layer_file(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let parse_error = |reason: String| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason,
    };

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).map_err(|e| parse_error(format!("JSON parse error: {e}")))
    } else {
        let table: toml::Table = toml::from_str(&content)
            .map_err(|e| parse_error(format!("TOML parse error: {e}")))?;
        toml_to_json(toml::Value::Table(table)).map_err(parse_error)
    }
}

/// Convert TOML Value to JSON Value.
///
/// JSON has no `nan` or `inf`, so non-finite floats are an error.
fn toml_to_json(toml: toml::Value) -> Result<Value, String> {
    Ok(match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| format!("non-finite float {f} has no JSON form"))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| Ok((k, toml_to_json(v)?)))
                .collect::<Result<_, String>>()?,
        ),
    })
}

/// Collect prefixed variables into an object keyed by the lowercased
/// remainder of the name. The loader's own control variables are skipped.
fn env_layer<I>(prefix: &str, vars: I) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut layer = Map::new();
    for (name, raw) in vars {
        if name == ENV_PREFIX_VAR || name == SKIP_MISSING_VAR {
            continue;
        }
        let Some(key) = name.strip_prefix(prefix) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        layer.insert(key.to_lowercase(), parse_env_value(&raw));
    }
    Value::Object(layer)
}

/// Booleans and numbers keep their type; everything else stays a string.
fn parse_env_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn env_layer_strips_prefix_and_types_values() {
        let layer = env_layer(
            "APP_",
            vec![
                ("APP_PORT".to_string(), "8080".to_string()),
                ("APP_DEBUG".to_string(), "true".to_string()),
                ("APP_NAME".to_string(), "strata".to_string()),
                ("APP_".to_string(), "ignored".to_string()),
                ("OTHER".to_string(), "1".to_string()),
            ],
        );
        assert_eq!(layer, json!({"port": 8080, "debug": true, "name": "strata"}));
    }

    #[test]
    fn env_layer_skips_control_variables() {
        let layer = env_layer(
            "STRATA_",
            vec![
                (ENV_PREFIX_VAR.to_string(), "X_".to_string()),
                (SKIP_MISSING_VAR.to_string(), "false".to_string()),
                ("STRATA_MODE".to_string(), "fast".to_string()),
            ],
        );
        assert_eq!(layer, json!({"mode": "fast"}));
    }

    #[test]
    fn toml_values_convert_to_json() {
        let table: toml::Table =
            toml::from_str("a = 1\nb = 2.5\nc = [true]\n[d]\ne = \"x\"\n").unwrap();
        assert_eq!(
            toml_to_json(toml::Value::Table(table)).unwrap(),
            json!({"a": 1, "b": 2.5, "c": [true], "d": {"e": "x"}})
        );
    }

    #[test]
    fn non_finite_toml_float_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floats.toml");
        fs::write(&path, "ok = 1.5\n[limits]\nmax = inf\n").unwrap();

        let err = read_layer_file(&path).unwrap_err();
        assert!(matches!(&err, ConfigError::ParseError { path: p, .. } if *p == path));
        assert!(err.to_string().contains("non-finite"));

        let table: toml::Table = toml::from_str("x = nan").unwrap();
        assert!(toml_to_json(toml::Value::Table(table)).is_err());
    }

    #[test]
    fn defaults_and_overrides_only() {
        let loaded = LayerLoader::new(LoaderConfig::default())
            .with_defaults(json!({"timeout": 100, "mode": "off"}))
            .with_overrides(json!({"timeout": 50}))
            .with_env_vars(no_env())
            .load()
            .unwrap();

        assert_eq!(loaded.get("timeout"), Some(&json!(50)));
        assert_eq!(loaded.get("mode"), Some(&json!("off")));
        assert_eq!(loaded.sources().len(), 2);
        assert_eq!(loaded.origin_of("timeout").unwrap().origin, LayerOrigin::Overrides);
        assert_eq!(loaded.origin_of("mode").unwrap().origin, LayerOrigin::Defaults);
        assert!(loaded.origin_of("absent").is_none());
    }

    #[test]
    fn non_object_source_is_rejected() {
        let err = LayerLoader::new(LoaderConfig::default())
            .with_defaults(json!({"a": 1}))
            .with_overrides(json!([1, 2]))
            .with_env_vars(no_env())
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Layers(strata_core::Error::Construction(
                ConstructionError::NotAMapping { index: 2, .. }
            ))
        ));
    }

    #[test]
    fn nothing_to_stack_is_an_error() {
        let err = LayerLoader::new(LoaderConfig::default())
            .with_defaults(json!({}))
            .with_env_vars(no_env())
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Layers(strata_core::Error::Construction(ConstructionError::AllEmpty))
        ));
    }

    #[test]
    fn missing_file_fails_unless_skipped() {
        let config = LoaderConfig {
            files: vec!["/nonexistent/layer.toml".into()],
            skip_missing: false,
            ..LoaderConfig::default()
        };
        let err = LayerLoader::new(config.clone())
            .with_defaults(json!({"a": 1}))
            .with_env_vars(no_env())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));

        let loaded = LayerLoader::new(LoaderConfig {
            skip_missing: true,
            ..config
        })
        .with_defaults(json!({"a": 1}))
        .with_env_vars(no_env())
        .load()
        .unwrap();
        assert_eq!(loaded.sources().len(), 1);
    }
}
