//! Station identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid station identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station id: {reason}")]
pub struct InvalidStationId {
    reason: &'static str,
}

impl InvalidStationId {
    /// Why the identifier was rejected.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// A station identifier as issued by the timetable service (e.g. `2000000`).
///
/// Identifiers are opaque strings. This type only guarantees that they are
/// non-empty and carry no surrounding whitespace, so they compare exactly
/// against the values stored in the cache.
///
/// # Examples
///
/// ```
/// use timetable_cache::domain::StationId;
///
/// let moscow = StationId::parse("2000000").unwrap();
/// assert_eq!(moscow.as_str(), "2000000");
///
/// // Empty and padded identifiers are rejected
/// assert!(StationId::parse("").is_err());
/// assert!(StationId::parse(" 2000000").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Parse a station identifier from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidStationId> {
        if s.trim().is_empty() {
            return Err(InvalidStationId {
                reason: "must not be empty",
            });
        }

        if s.trim() != s {
            return Err(InvalidStationId {
                reason: "must not have leading or trailing whitespace",
            });
        }

        Ok(StationId(s.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StationId {
    type Error = InvalidStationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
