//! Response validation for model output.
//!
//! Models wrap JSON in markdown fences or prose often enough that the engine never parses a
//! completion directly. [`extract_json_object`] finds the first balanced top-level object;
//! callers then deserialize into a raw shape and check enum and range constraints. Nothing
//! here fills in defaults for missing fields.

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("response did not contain a JSON object")]
    NoJsonObject,
    #[error("response JSON does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("unrecognized classification status '{0}'")]
    InvalidClassification(String),
    #[error("unrecognized viability recommendation '{0}'")]
    InvalidRecommendation(String),
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("field '{field}' is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("field '{0}' must not be empty")]
    Empty(&'static str),
}

/// Returns the first balanced `{ ... }` in `text`, ignoring braces inside strings.
pub fn extract_json_object(text: &str) -> Result<&str, ValidationError> {
    let start = text.find('{').ok_or(ValidationError::NoJsonObject)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Err(ValidationError::NoJsonObject)
}

/// Extracts and deserializes the JSON object in a completion.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, ValidationError> {
    let object = extract_json_object(text)?;
    Ok(serde_json::from_str(object)?)
}

pub(crate) fn require<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

pub(crate) fn require_finite(value: Option<f64>, field: &'static str) -> Result<f64, ValidationError> {
    let value = require(value, field)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

pub(crate) fn require_text(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    let value = require(value, field)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(trimmed.to_string())
    }
}
