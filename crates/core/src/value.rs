//! Dynamic layers over `serde_json::Value`.
//!
//! Typed code can only hand `BTreeMap`s to a [`LayeredMap`], so operand
//! checks happen at compile time. Layers decoded at runtime arrive as
//! arbitrary JSON values; these entry points apply the same rules and
//! report non-object operands as errors instead.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{ConstructionError, Error, Result};
use crate::map::LayeredMap;

/// The JSON type name of a value, as used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Null, `false`, zero, and empty strings, arrays and objects.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn object_layer(map: Map<String, Value>) -> BTreeMap<String, Value> {
    map.into_iter().collect()
}

impl LayeredMap<String, Value> {
    /// Build a layered map from JSON values, oldest first.
    ///
    /// Blank values (`null`, `false`, `0`, `""`, `[]`, `{}`) are dropped
    /// before anything else is checked. If nothing survives the result is
    /// [`ConstructionError::AllEmpty`]; otherwise every survivor must be an
    /// object or the result is [`ConstructionError::NotAMapping`] naming
    /// its position in the input.
    pub fn from_values<I>(values: I) -> std::result::Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<(usize, Value)> = values.into_iter().enumerate().collect();
        if values.is_empty() {
            return Err(ConstructionError::NoLayers);
        }

        let kept: Vec<(usize, Value)> = values
            .into_iter()
            .filter(|(_, value)| !is_blank(value))
            .collect();
        if kept.is_empty() {
            return Err(ConstructionError::AllEmpty);
        }

        let mut layers = Vec::with_capacity(kept.len());
        for (index, value) in kept {
            match value {
                Value::Object(map) => layers.push(object_layer(map)),
                other => {
                    return Err(ConstructionError::NotAMapping {
                        index,
                        found: json_type_name(&other).to_string(),
                    });
                }
            }
        }

        Self::new(layers)
    }

    /// Stack a JSON object on top. An empty object leaves the map untouched;
    /// any other JSON type is an [`Error::TypeMismatch`].
    pub fn concat_value(self, value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(self.push_layer(object_layer(map))),
            other => Err(Error::TypeMismatch {
                left: "LayeredMap".into(),
                right: json_type_name(&other).into(),
            }),
        }
    }

    /// Slide a JSON object underneath. Mirrors [`concat_value`](Self::concat_value).
    pub fn prepend_value(self, value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(self.prepend_layer(object_layer(map))),
            other => Err(Error::TypeMismatch {
                left: json_type_name(&other).into(),
                right: "LayeredMap".into(),
            }),
        }
    }

    /// The resolved view as a single JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}
