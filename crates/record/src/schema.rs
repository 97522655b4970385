//! Record types: a named, fixed list of fields with optional defaults.
//!
//! A [`RecordType`] is built once from field-name strings and then stamps
//! out [`Record`] values. The schema is shared behind an `Arc`, so cloning
//! a type or a record never copies the field list.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{RecordError, Result};
use crate::record::Record;

/// Strict and reserved Rust keywords; neither may name a type or a field.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic());
    starts_well && name != "_" && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn is_valid_name(name: &str) -> bool {
    is_identifier(name) && !KEYWORDS.contains(&name)
}

#[derive(Debug)]
pub(crate) struct Schema {
    pub(crate) name: String,
    pub(crate) fields: Vec<String>,
    pub(crate) defaults: BTreeMap<String, Value>,
    pub(crate) mutable: bool,
}

/// A record type definition.
#[derive(Debug, Clone)]
pub struct RecordType {
    pub(crate) schema: Arc<Schema>,
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            || (self.schema.name == other.schema.name && self.schema.fields == other.schema.fields)
    }
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
            defaults: Vec::new(),
            mutable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Field names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.schema.fields
    }

    pub fn is_mutable(&self) -> bool {
        self.schema.mutable
    }

    pub fn default_for(&self, field: &str) -> Option<&Value> {
        self.schema.defaults.get(field)
    }

    pub(crate) fn position(&self, field: &str) -> Result<usize> {
        self.schema
            .fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| RecordError::UnknownField {
                type_name: self.schema.name.clone(),
                field: field.to_string(),
            })
    }

    fn fallback(&self, field: &str) -> Value {
        self.default_for(field).cloned().unwrap_or(Value::Null)
    }

    /// Build a record from leading positional values.
    ///
    /// Fields past the end of `values` take their default, or `null` when
    /// none was declared.
    pub fn construct<I>(&self, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut values: Vec<Value> = values.into_iter().collect();
        let expected = self.schema.fields.len();
        if values.len() > expected {
            return Err(self.arity(values.len()));
        }

        let supplied = values.len();
        values.extend(self.schema.fields[supplied..].iter().map(|f| self.fallback(f)));
        Ok(Record::from_parts(self.clone(), values))
    }

    /// Build a record from exactly one value per field.
    pub fn make<I>(&self, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        if values.len() != self.schema.fields.len() {
            return Err(self.arity(values.len()));
        }
        Ok(Record::from_parts(self.clone(), values))
    }

    /// Build a record from `(field, value)` pairs; unnamed fields fall back
    /// to their defaults.
    pub fn from_named<I, S>(&self, pairs: I) -> Result<Record>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let mut values: Vec<Value> = self.schema.fields.iter().map(|f| self.fallback(f)).collect();
        for (field, value) in pairs {
            let index = self.position(field.as_ref())?;
            values[index] = value;
        }
        Ok(Record::from_parts(self.clone(), values))
    }

    fn arity(&self, actual: usize) -> RecordError {
        RecordError::Arity {
            type_name: self.schema.name.clone(),
            expected: self.schema.fields.len(),
            actual,
        }
    }
}

/// Builder for [`RecordType`].
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    name: String,
    fields: Vec<String>,
    defaults: Vec<(String, Value)>,
    mutable: bool,
}

impl RecordTypeBuilder {
    /// Declare fields from a comma- and/or whitespace-separated list.
    pub fn fields(mut self, spec: &str) -> Self {
        self.fields.extend(
            spec.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
        self
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    pub fn default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.push((field.into(), value.into()));
        self
    }

    /// Whether records of this type may be changed after construction.
    pub fn mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    /// Validate and freeze the definition.
    ///
    /// Repeated field names collapse onto their first occurrence.
    pub fn build(self) -> Result<RecordType> {
        let mut fields: Vec<String> = Vec::with_capacity(self.fields.len());
        for name in self.fields {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }

        if let Some(bad) = fields.iter().find(|name| !is_valid_name(name)) {
            return Err(RecordError::InvalidFieldName(bad.clone()));
        }
        if !is_valid_name(&self.name) {
            return Err(RecordError::InvalidTypeName(self.name));
        }

        let mut defaults = BTreeMap::new();
        for (field, value) in self.defaults {
            if !fields.contains(&field) {
                return Err(RecordError::UnknownDefault(field));
            }
            defaults.insert(field, value);
        }

        debug!(type_name = %self.name, fields = fields.len(), mutable = self.mutable, "Built record type");

        Ok(RecordType {
            schema: Arc::new(Schema {
                name: self.name,
                fields,
                defaults,
                mutable: self.mutable,
            }),
        })
    }
}
