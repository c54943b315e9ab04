use std::fmt::Display;

use serde::{de, ser};
use thiserror::Error;

/// Failure of a single encode or decode call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The tag present on the wire does not fit the requested native shape.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A non-optional field is absent from the map.
    #[error("missing required field `{field}`")]
    MissingRequiredField { field: String },

    /// An enum discriminant matched none of the known variants.
    #[error("unknown variant `{variant}`, expected one of {expected:?}")]
    UnknownVariant {
        variant: String,
        expected: Vec<&'static str>,
    },

    /// An `N` value that does not parse into the requested numeric type.
    #[error("invalid number `{value}` for {expected}")]
    InvalidNumber { value: String, expected: String },

    /// NaN and infinities have no decimal representation.
    #[error("non-finite floating point values cannot be encoded as a number")]
    NonFiniteNumber,

    #[error("map keys must serialize to strings")]
    KeyMustBeString,

    /// The top-level value of an item encode was not map-shaped.
    #[error("expected a map-shaped value at the top level, found {found}")]
    NotAMap { found: String },

    #[error("{0}")]
    Custom(String),
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl ser::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl de::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }

    fn invalid_type(unexp: de::Unexpected, exp: &dyn de::Expected) -> Self {
        Self::mismatch(exp.to_string(), unexp.to_string())
    }

    fn invalid_length(len: usize, exp: &dyn de::Expected) -> Self {
        Self::mismatch(exp.to_string(), format!("a sequence of length {len}"))
    }

    fn missing_field(field: &'static str) -> Self {
        Self::MissingRequiredField {
            field: field.to_string(),
        }
    }

    fn unknown_variant(variant: &str, expected: &'static [&'static str]) -> Self {
        Self::UnknownVariant {
            variant: variant.to_string(),
            expected: expected.to_vec(),
        }
    }
}
