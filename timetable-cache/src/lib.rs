//! Persistent cache for train timetable query results.
//!
//! Timetables are stored in SQLite, keyed by departure station, arrival
//! station and Moscow calendar day, so a client can answer repeat queries
//! without contacting the timetable service. Stored rows carry a schema
//! version, and data written by older versions stays readable after an
//! upgrade.

pub mod cache;
pub mod domain;
pub mod storage;
