//! Read-through wrapper pairing a timetable source with the cache.

use tracing::debug;

use crate::domain::{DayKey, StationId, TimetableEntry};

use super::error::CacheError;
use super::timetable::TimetableCache;

/// A remote service that answers timetable queries.
///
/// This abstraction allows the client to be tested with mock data.
pub trait TimetableSource {
    /// Error returned when a fetch fails.
    type Error: std::error::Error + 'static;

    /// Fetch every train from `from` to `to` departing on `day`.
    fn fetch(
        &self,
        from: &StationId,
        to: &StationId,
        day: DayKey,
    ) -> Result<Vec<TimetableEntry>, Self::Error>;
}

/// Errors from [`CachedTimetableClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError<E> {
    /// The cache failed for a reason other than a miss
    #[error("timetable cache error: {0}")]
    Cache(#[from] CacheError),

    /// The source failed after a cache miss
    #[error("timetable source error: {0}")]
    Source(#[source] E),
}

/// Timetable source with caching.
///
/// Wraps a [`TimetableSource`] and stores its non-empty results in a
/// [`TimetableCache`], so repeated queries for the same key don't reach the
/// source.
pub struct CachedTimetableClient<S> {
    source: S,
    cache: TimetableCache,
}

impl<S: TimetableSource> CachedTimetableClient<S> {
    /// Create a new cached client.
    pub fn new(source: S, cache: TimetableCache) -> Self {
        Self { source, cache }
    }

    /// Get the timetable for a key, using the cache if it has the data.
    ///
    /// An empty result from the source is returned but not cached, so the
    /// next call asks the source again.
    pub fn get_timetable(
        &self,
        from: &StationId,
        to: &StationId,
        date: impl Into<DayKey>,
    ) -> Result<Vec<TimetableEntry>, ClientError<S::Error>> {
        let day = date.into();

        // Try cache first
        match self.cache.get(from, to, day) {
            Ok(entries) => return Ok(entries),
            Err(e) if e.is_miss() => {}
            Err(e) => return Err(e.into()),
        }

        // Fetch from source
        let entries = self
            .source
            .fetch(from, to, day)
            .map_err(ClientError::Source)?;
        debug!(%from, %to, %day, entries = entries.len(), "fetched timetable from source");

        // Cache and return
        self.cache.put(from, to, day, &entries)?;

        Ok(entries)
    }

    /// The underlying source, for requests that bypass the cache.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The cache in front of the source.
    pub fn cache(&self) -> &TimetableCache {
        &self.cache
    }
}
