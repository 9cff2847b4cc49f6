//! Catalogue decoding with JSON-path context in error messages.
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::spec::{Specification, SpecificationKind};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    str_with_path(src).map_err(|error| error.message)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    value_with_path(value).map_err(|error| error.message)
}

/// Like [`from_str_with_path`], keeping the failing path as its own field.
pub fn str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(PathError::from)
}

pub fn value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, PathError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(PathError::from)
}

#[derive(Debug, Clone)]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl<E: std::fmt::Display> From<serde_path_to_error::Error<E>> for PathError {
    fn from(err: serde_path_to_error::Error<E>) -> Self {
        let path = err.path().to_string();
        let message = format!("at JSON path {path} → {}", err.into_inner());
        Self { path, message }
    }
}

impl From<PathError> for Error {
    fn from(PathError { path, message }: PathError) -> Self {
        Error::Decode { path, message }
    }
}

/// Decodes a catalogue document: either an array of descriptor records or a
/// single record. Unrecognized descriptors are kept as
/// [`SpecificationKind::Ignored`] and reported once each.
pub fn decode_catalogue(value: Value) -> Result<Vec<Specification>> {
    let specs = match value {
        Value::Array(_) => value_with_path::<Vec<Specification>>(value)?,
        Value::Object(_) => vec![value_with_path::<Specification>(value)?],
        other => {
            return Err(Error::Decode {
                path: ".".to_owned(),
                message: format!("expected an array of descriptors, found {}", json_kind(&other)),
            });
        }
    };
    for spec in &specs {
        if let SpecificationKind::Ignored { discriminant, reason } = &spec.kind {
            tracing::warn!(
                id = %spec.id,
                name = %spec.name,
                discriminant = %discriminant,
                "skipping descriptor: {reason}"
            );
        }
    }
    Ok(specs)
}

pub fn decode_catalogue_str(src: &str) -> Result<Vec<Specification>> {
    let value = str_with_path::<Value>(src)?;
    decode_catalogue(value)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
