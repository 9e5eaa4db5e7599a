//! Relational store backing both workflows.

mod schema;
mod seed;
mod sqlite;

pub use seed::{ClaimSeed, NotificationEntry};
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored JSON could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{table} row {id} does not exist")]
    MissingRow { table: &'static str, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt value in {table}.{column}: {value}")]
    Corrupt {
        table: &'static str,
        column: &'static str,
        value: String,
    },
}
