//! Error types for layered map operations.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Construction failures get their own enum so callers building maps
//! from untrusted input can match on them without the lookup variants.

use thiserror::Error;

/// The top-level error type for all layered map operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // --- Construction ---
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    // --- Lookup / removal ---
    #[error("Key {key} not found")]
    NotFound { key: String },

    // --- Concatenation ---
    #[error("Unsupported operand types for +: '{left}' and '{right}'")]
    TypeMismatch { left: String, right: String },
}

impl Error {
    /// Build a `NotFound` error, rendering the key with its `Debug` form.
    pub fn not_found<Q: std::fmt::Debug + ?Sized>(key: &Q) -> Self {
        Self::NotFound {
            key: format!("{key:?}"),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a `LayeredMap` could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("No layers provided")]
    NoLayers,

    #[error("No non-empty layers provided")]
    AllEmpty,

    #[error("Layer {index} is not a mapping (found {found})")]
    NotAMapping { index: usize, found: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_key_with_debug() {
        let err = Error::not_found("c1");
        assert_eq!(err.to_string(), "Key \"c1\" not found");
    }

    #[test]
    fn construction_error_converts_into_error() {
        let err: Error = ConstructionError::AllEmpty.into();
        assert!(matches!(err, Error::Construction(ConstructionError::AllEmpty)));
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn type_mismatch_names_both_operands() {
        let err = Error::TypeMismatch {
            left: "LayeredMap".into(),
            right: "array".into(),
        };
        assert!(err.to_string().contains("LayeredMap"));
        assert!(err.to_string().contains("array"));
    }
}
