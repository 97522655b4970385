//! Record definition and access errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    // --- Definition ---
    #[error("Invalid type name '{0}': must be an identifier and not a keyword")]
    InvalidTypeName(String),

    #[error("Invalid field name '{0}': must be an identifier and not a keyword")]
    InvalidFieldName(String),

    #[error("Default given for undeclared field '{0}'")]
    UnknownDefault(String),

    // --- Construction / access ---
    #[error("{type_name} expects {expected} values, got {actual}")]
    Arity {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("{type_name} has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("{type_name} is {mode}; use {method}")]
    ReplaceMode {
        type_name: String,
        mode: &'static str,
        method: &'static str,
    },

    #[error("Cannot modify field '{field}' of immutable {type_name}")]
    Immutable { type_name: String, field: String },
}

pub type Result<T> = std::result::Result<T, RecordError>;
