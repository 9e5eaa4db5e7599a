//! Schema-versioned wrappers for cached analyses stored as JSON text.
//!
//! Rows written before versioning carry the bare analysis object and are read as the
//! first schema. An unknown `schema_version` fails to decode instead of being guessed.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: &str = "1";
const VERSION_FIELD: &str = "schema_version";

#[derive(Serialize, Deserialize)]
#[serde(tag = "schema_version")]
enum Envelope<T> {
    #[serde(rename = "1")]
    V1(T),
}

pub fn seal<T: Serialize>(analysis: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope::V1(analysis))
}

pub fn open<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.get(VERSION_FIELD).is_none() {
        return serde_json::from_value(value);
    }

    match serde_json::from_value::<Envelope<T>>(value)? {
        Envelope::V1(analysis) => Ok(analysis),
    }
}
