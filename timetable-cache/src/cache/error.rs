//! Cache error types.

use crate::domain::{DayKey, StationId};
use crate::storage::StorageError;

/// Errors returned by [`TimetableCache`](super::TimetableCache).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Nothing is cached for the key. Callers should fetch fresh data.
    #[error("no data in timetable cache for: from={from}, to={to}, date={date}")]
    Miss {
        from: StationId,
        to: StationId,
        date: DayKey,
    },

    /// The write transaction failed and was rolled back; no rows persist
    #[error("failed to write timetable to cache: {0}")]
    Write(#[source] rusqlite::Error),

    /// The store could not be opened or queried
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CacheError {
    /// Whether this is an expected miss rather than a failure.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss { .. })
    }
}
