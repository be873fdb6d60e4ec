//! Storage error types.

use crate::domain::{InvalidStationId, TimeError};

/// Errors from the physical timetable store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The database could not be opened or configured at all
    #[error("timetable store {location} unavailable: {message}")]
    Unavailable { location: String, message: String },

    /// A query or schema statement failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A thread panicked while holding a storage connection
    #[error("storage lock poisoned")]
    Poisoned,

    /// The file was written by a newer schema than this build knows
    #[error("unknown schema version {0} in timetable store")]
    UnknownSchema(u32),
}

/// Errors decoding a single stored row into a timetable entry.
///
/// These never abort a lookup; the row is skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The column is missing or not text
    #[error("column {column}: {source}")]
    Column {
        column: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// The column holds text that is not a valid timestamp
    #[error("column {column}: {source}")]
    Timestamp {
        column: &'static str,
        #[source]
        source: TimeError,
    },

    /// The column holds an empty or padded station id
    #[error("column {column}: {source}")]
    StationId {
        column: &'static str,
        #[source]
        source: InvalidStationId,
    },
}
