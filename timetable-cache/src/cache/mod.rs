//! Persistent timetable cache.
//!
//! [`TimetableCache`] stores and looks up timetable lists by route and day.
//! [`CachedTimetableClient`] puts it in front of a [`TimetableSource`], so
//! the source is only queried on a miss.

mod client;
mod error;
mod stats;
mod timetable;


pub use client::{CachedTimetableClient, ClientError, TimetableSource};
pub use error::CacheError;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use timetable::TimetableCache;
