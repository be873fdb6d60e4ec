//! The timetable cache façade.
//!
//! Keys are (departure station, arrival station, Moscow calendar day). The
//! stored unit is the list of [`TimetableEntry`] values a timetable query
//! returned for that key.
//!
//! All operations block on SQLite and should run on a worker thread, never on
//! a latency-sensitive one.

use rusqlite::{params, params_from_iter};
use tracing::{debug, warn};

use crate::domain::{DayKey, StationId, TimetableEntry};
use crate::storage::{SchemaVersion, StorageError, StorageGateway};

use super::error::CacheError;
use super::stats::{CacheStats, CacheStatsSnapshot};

/// Persistent cache of timetable query results.
///
/// Bound to one schema version at construction. Any number of caches, with
/// the same or different versions, may share a [`StorageGateway`].
#[derive(Debug)]
pub struct TimetableCache {
    gateway: StorageGateway,
    version: SchemaVersion,
    stats: CacheStats,
}

/// Entries decoded by one lookup, plus the rows that had to be dropped.
struct DayRows {
    entries: Vec<TimetableEntry>,
    skipped: u64,
}

impl TimetableCache {
    /// Create a cache working with the given schema version.
    ///
    /// Creates or migrates the table on first use. Cheap on later calls, and
    /// safe to call from any thread.
    pub fn new(gateway: &StorageGateway, version: SchemaVersion) -> Result<Self, CacheError> {
        let gateway = gateway.open(version)?;
        Ok(Self {
            gateway,
            version,
            stats: CacheStats::default(),
        })
    }

    /// Get the cached timetable for trains from `from` to `to` departing on
    /// the Moscow calendar day of `date`.
    ///
    /// Only the calendar day of `date` matters. Entries come back in storage
    /// order. Rows that can't be decoded are skipped and counted.
    ///
    /// # Errors
    ///
    /// [`CacheError::Miss`] if no usable rows are cached for the key, or
    /// [`CacheError::Storage`] if the store can't be queried.
    pub fn get(
        &self,
        from: &StationId,
        to: &StationId,
        date: impl Into<DayKey>,
    ) -> Result<Vec<TimetableEntry>, CacheError> {
        let day = date.into();
        let rows = self.query_day(from, to, day)?;

        if rows.skipped > 0 {
            warn!(
                %from, %to, %day,
                skipped = rows.skipped,
                kept = rows.entries.len(),
                "skipped unreadable timetable rows"
            );
            self.stats.record_skipped(rows.skipped);
        }

        if rows.entries.is_empty() {
            debug!(%from, %to, %day, "timetable cache miss");
            self.stats.record_miss();
            return Err(CacheError::Miss {
                from: from.clone(),
                to: to.clone(),
                date: day,
            });
        }

        debug!(%from, %to, %day, entries = rows.entries.len(), "timetable cache hit");
        self.stats.record_hit();
        Ok(rows.entries)
    }

    fn query_day(
        &self,
        from: &StationId,
        to: &StationId,
        day: DayKey,
    ) -> Result<DayRows, StorageError> {
        let codec = self.version.codec();
        let conn = self.gateway.readable_handle()?;
        let mut stmt = conn.prepare_cached(&codec.select_sql())?;

        let mask = day.mask();
        let mut rows = stmt.query(params![from.as_str(), to.as_str(), mask])?;

        let mut out = DayRows {
            entries: Vec::new(),
            skipped: 0,
        };

        while let Some(row) = rows.next()? {
            match codec.decode(row) {
                Ok(entry) if day.contains(&entry.departure_time) => out.entries.push(entry),
                Ok(entry) => {
                    debug!(departure = %entry.departure_time, %day, "row outside requested day");
                    out.skipped += 1;
                }
                Err(e) => {
                    debug!(error = %e, "undecodable timetable row");
                    out.skipped += 1;
                }
            }
        }

        Ok(out)
    }

    /// Store the timetable for trains from `from` to `to` departing on the
    /// Moscow calendar day of `date`.
    ///
    /// All rows commit in one transaction; if any insert fails, none persist.
    /// Existing rows for the key are kept, so storing the same key twice
    /// returns both lists from [`get`](Self::get). An empty timetable writes
    /// nothing, and a later lookup misses.
    ///
    /// # Errors
    ///
    /// [`CacheError::Write`] if the transaction fails, or
    /// [`CacheError::Storage`] if the writer connection is unavailable.
    pub fn put(
        &self,
        from: &StationId,
        to: &StationId,
        date: impl Into<DayKey>,
        timetable: &[TimetableEntry],
    ) -> Result<(), CacheError> {
        let day = date.into();

        if timetable.is_empty() {
            debug!(%from, %to, %day, "empty timetable, nothing cached");
            return Ok(());
        }

        let codec = self.version.codec();
        let mut conn = self.gateway.writable_handle()?;
        let tx = conn.transaction().map_err(CacheError::Write)?;

        {
            let mut stmt = tx
                .prepare_cached(&codec.insert_sql())
                .map_err(CacheError::Write)?;

            for entry in timetable {
                if entry.departure_station_id != *from
                    || entry.arrival_station_id != *to
                    || !day.contains(&entry.departure_time)
                {
                    debug!(
                        %from, %to, %day,
                        departure_station = %entry.departure_station_id,
                        arrival_station = %entry.arrival_station_id,
                        departure = %entry.departure_time,
                        "entry does not match its cache key"
                    );
                }

                stmt.execute(params_from_iter(codec.encode(entry)))
                    .map_err(CacheError::Write)?;
            }
        }

        tx.commit().map_err(CacheError::Write)?;

        let written = timetable.len() as u64;
        self.stats.record_written(written);
        debug!(%from, %to, %day, rows = written, version = %self.version, "cached timetable");

        Ok(())
    }

    /// The schema version this cache reads and writes.
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// The shared storage handle.
    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    /// Number of rows in the shared store (for monitoring).
    pub fn entry_count(&self) -> Result<u64, CacheError> {
        Ok(self.gateway.row_count()?)
    }

    /// Counters for this cache instance.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}
