//! Versioned table layout and row codecs.
//!
//! Every schema version has its own column list and codec. Callers obtain a
//! codec with [`SchemaVersion::codec`], which looks it up in a static table.
//! Nothing else in the crate branches on the version.
//!
//! The physical version of a database file is kept in `PRAGMA user_version`.
//! Tables only migrate upward. An older façade keeps working on a newer table
//! because every statement names its columns explicitly.

use std::fmt;
use std::str::FromStr;

use rusqlite::{Connection, Row, TransactionBehavior};
use tracing::info;

use crate::domain::{StationId, TimetableEntry, decode_timestamp, encode_timestamp};

use super::error::{DecodeError, StorageError};

/// Name of the physical table holding timetable rows.
pub const TABLE_NAME: &str = "timetable";

/// Text stored in `train_name` when the train has no name.
///
/// Only the codec ever sees this value; entries use `None`.
pub const TRAIN_NAME_NULL: &str = "NULL";

pub const DEPARTURE_STATION_ID: &str = "departure_station_id";
pub const DEPARTURE_STATION_NAME: &str = "departure_station_name";
pub const DEPARTURE_TIME: &str = "departure_time";
pub const ARRIVAL_STATION_ID: &str = "arrival_station_id";
pub const ARRIVAL_STATION_NAME: &str = "arrival_station_name";
pub const ARRIVAL_TIME: &str = "arrival_time";
pub const TRAIN_ROUTE_ID: &str = "train_route_id";
pub const ROUTE_START_STATION_NAME: &str = "route_start_station_name";
pub const ROUTE_END_STATION_NAME: &str = "route_end_station_name";
pub const TRAIN_NAME: &str = "train_name";

const V1_COLUMNS: &[&str] = &[
    DEPARTURE_STATION_ID,
    DEPARTURE_STATION_NAME,
    DEPARTURE_TIME,
    ARRIVAL_STATION_ID,
    ARRIVAL_STATION_NAME,
    ARRIVAL_TIME,
    TRAIN_ROUTE_ID,
    ROUTE_START_STATION_NAME,
    ROUTE_END_STATION_NAME,
];

const V2_COLUMNS: &[&str] = &[
    DEPARTURE_STATION_ID,
    DEPARTURE_STATION_NAME,
    DEPARTURE_TIME,
    ARRIVAL_STATION_ID,
    ARRIVAL_STATION_NAME,
    ARRIVAL_TIME,
    TRAIN_ROUTE_ID,
    ROUTE_START_STATION_NAME,
    ROUTE_END_STATION_NAME,
    TRAIN_NAME,
];

/// Statements that upgrade a table to the paired version from the one before.
const MIGRATIONS: &[(SchemaVersion, &str)] = &[(
    SchemaVersion::V2,
    "ALTER TABLE timetable ADD COLUMN train_name TEXT NOT NULL DEFAULT 'NULL'",
)];

/// Error returned for a schema version number or name this build doesn't know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schema version: {0}")]
pub struct UnknownSchemaVersion(String);

/// Layout of stored timetable rows.
///
/// The order of the variants is the upgrade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// Nine columns, no train name.
    V1,
    /// Adds a trailing `train_name` column.
    V2,
}

impl SchemaVersion {
    /// All versions, oldest first.
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::V1, SchemaVersion::V2];

    /// The newest version this build writes.
    pub fn latest() -> Self {
        SchemaVersion::V2
    }

    /// The number stored in `PRAGMA user_version`.
    pub fn number(self) -> u32 {
        match self {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
        }
    }

    /// The row codec for this version.
    pub fn codec(self) -> &'static RowCodec {
        &CODECS[self as usize]
    }
}

impl TryFrom<u32> for SchemaVersion {
    type Error = UnknownSchemaVersion;

    fn try_from(number: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|v| v.number() == number)
            .ok_or_else(|| UnknownSchemaVersion(number.to_string()))
    }
}

impl FromStr for SchemaVersion {
    type Err = UnknownSchemaVersion;

    /// Accepts `"v2"`, `"V2"` or `"2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(['v', 'V']).unwrap_or(s);
        digits
            .parse::<u32>()
            .ok()
            .and_then(|n| Self::try_from(n).ok())
            .ok_or_else(|| UnknownSchemaVersion(s.to_string()))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.number())
    }
}

/// Ordered column names for a version. `train_name` is present for V2 and up.
pub fn column_list(version: SchemaVersion) -> &'static [&'static str] {
    version.codec().columns
}

/// Converts entries to and from the rows of one schema version.
pub struct RowCodec {
    version: SchemaVersion,
    columns: &'static [&'static str],
    encode_extra: fn(&TimetableEntry, &mut Vec<String>),
    decode_extra: fn(&Row<'_>, &mut TimetableEntry) -> Result<(), DecodeError>,
}

/// Indexed by `SchemaVersion as usize`.
static CODECS: [RowCodec; 2] = [
    RowCodec {
        version: SchemaVersion::V1,
        columns: V1_COLUMNS,
        encode_extra: encode_nothing,
        decode_extra: decode_nothing,
    },
    RowCodec {
        version: SchemaVersion::V2,
        columns: V2_COLUMNS,
        encode_extra: encode_train_name,
        decode_extra: decode_train_name,
    },
];

impl RowCodec {
    /// The version this codec reads and writes.
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Ordered column names.
    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    /// Lookup by departure station (`?1`), arrival station (`?2`) and day mask (`?3`).
    pub fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {TABLE_NAME} \
             WHERE {DEPARTURE_STATION_ID} = ?1 AND {ARRIVAL_STATION_ID} = ?2 \
             AND {DEPARTURE_TIME} LIKE ?3",
            self.columns.join(", ")
        )
    }

    /// Insert of one row, with values bound in column order.
    pub fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {TABLE_NAME} ({}) VALUES ({})",
            self.columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// `CREATE TABLE` plus the route index, for a fresh database.
    fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|&column| {
                if column == TRAIN_NAME {
                    format!("{column} TEXT NOT NULL DEFAULT '{TRAIN_NAME_NULL}'")
                } else {
                    format!("{column} TEXT NOT NULL")
                }
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} ({});
             CREATE INDEX IF NOT EXISTS {TABLE_NAME}_route
                 ON {TABLE_NAME} ({DEPARTURE_STATION_ID}, {ARRIVAL_STATION_ID});",
            columns.join(", ")
        )
    }

    /// Column values for `entry`, in column order.
    pub fn encode(&self, entry: &TimetableEntry) -> Vec<String> {
        let mut values = Vec::with_capacity(self.columns.len());
        values.push(entry.departure_station_id.to_string());
        values.push(entry.departure_station_name.clone());
        values.push(encode_timestamp(&entry.departure_time));
        values.push(entry.arrival_station_id.to_string());
        values.push(entry.arrival_station_name.clone());
        values.push(encode_timestamp(&entry.arrival_time));
        values.push(entry.train_route_id.clone());
        values.push(entry.route_start_station_name.clone());
        values.push(entry.route_end_station_name.clone());
        (self.encode_extra)(entry, &mut values);
        values
    }

    /// Build an entry from a row selected with [`select_sql`](Self::select_sql).
    pub fn decode(&self, row: &Row<'_>) -> Result<TimetableEntry, DecodeError> {
        let mut entry = TimetableEntry {
            departure_station_id: station_column(row, 0, DEPARTURE_STATION_ID)?,
            departure_station_name: text_column(row, 1, DEPARTURE_STATION_NAME)?,
            departure_time: time_column(row, 2, DEPARTURE_TIME)?,
            arrival_station_id: station_column(row, 3, ARRIVAL_STATION_ID)?,
            arrival_station_name: text_column(row, 4, ARRIVAL_STATION_NAME)?,
            arrival_time: time_column(row, 5, ARRIVAL_TIME)?,
            train_route_id: text_column(row, 6, TRAIN_ROUTE_ID)?,
            train_name: None,
            route_start_station_name: text_column(row, 7, ROUTE_START_STATION_NAME)?,
            route_end_station_name: text_column(row, 8, ROUTE_END_STATION_NAME)?,
        };
        (self.decode_extra)(row, &mut entry)?;
        Ok(entry)
    }
}

impl fmt::Debug for RowCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCodec")
            .field("version", &self.version)
            .field("columns", &self.columns)
            .finish()
    }
}

fn encode_nothing(_entry: &TimetableEntry, _values: &mut Vec<String>) {}

fn decode_nothing(_row: &Row<'_>, _entry: &mut TimetableEntry) -> Result<(), DecodeError> {
    Ok(())
}

fn encode_train_name(entry: &TimetableEntry, values: &mut Vec<String>) {
    let name = entry.train_name.as_deref().unwrap_or(TRAIN_NAME_NULL);
    values.push(name.to_string());
}

fn decode_train_name(row: &Row<'_>, entry: &mut TimetableEntry) -> Result<(), DecodeError> {
    let name: Option<String> = row.get(9).map_err(|source| DecodeError::Column {
        column: TRAIN_NAME,
        source,
    })?;
    entry.train_name = name.filter(|n| n != TRAIN_NAME_NULL);
    Ok(())
}

fn text_column(row: &Row<'_>, idx: usize, column: &'static str) -> Result<String, DecodeError> {
    row.get(idx)
        .map_err(|source| DecodeError::Column { column, source })
}

fn station_column(
    row: &Row<'_>,
    idx: usize,
    column: &'static str,
) -> Result<StationId, DecodeError> {
    let text = text_column(row, idx, column)?;
    StationId::parse(&text).map_err(|source| DecodeError::StationId { column, source })
}

fn time_column(
    row: &Row<'_>,
    idx: usize,
    column: &'static str,
) -> Result<chrono::DateTime<chrono::FixedOffset>, DecodeError> {
    let text = text_column(row, idx, column)?;
    decode_timestamp(&text).map_err(|source| DecodeError::Timestamp { column, source })
}

/// The physical version recorded in the database, if any table was created.
pub fn stored_version(conn: &Connection) -> Result<Option<SchemaVersion>, StorageError> {
    let stored: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if stored == 0 {
        return Ok(None);
    }
    SchemaVersion::try_from(stored)
        .map(Some)
        .map_err(|_| StorageError::UnknownSchema(stored))
}

/// Create or upgrade the table so it can serve `version`.
///
/// Returns the physical version afterwards, which is never lower than the
/// stored one. Runs in one immediate transaction, so concurrent callers
/// cannot both migrate.
pub fn ensure_schema(
    conn: &mut Connection,
    version: SchemaVersion,
) -> Result<SchemaVersion, StorageError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let physical = match stored_version(&tx)? {
        None => {
            tx.execute_batch(&version.codec().create_sql())?;
            info!(%version, "created timetable table");
            version
        }
        Some(current) if current < version => {
            for (target, sql) in MIGRATIONS {
                if *target > current && *target <= version {
                    tx.execute_batch(sql)?;
                    info!(from = %current, to = %target, "migrated timetable table");
                }
            }
            version
        }
        Some(current) => current,
    };

    tx.pragma_update(None, "user_version", physical.number())?;
    tx.commit()?;

    Ok(physical)
}
