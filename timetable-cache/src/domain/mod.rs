//! Domain types for the timetable cache.
//!
//! Value types shared by the storage layer and the cache façade. Types
//! validate their invariants at construction time, so the storage code can
//! bind them without further checks.

mod entry;
mod station;
mod time;

pub use entry::TimetableEntry;
pub use station::{InvalidStationId, StationId};
pub use time::{
    DayKey, MSK_OFFSET_SECS, TIMESTAMP_FORMAT, TimeError, decode_timestamp, encode_timestamp, msk,
};
