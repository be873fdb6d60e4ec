//! Timetable entry: one scheduled train leg between two stations.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::StationId;

/// One train leg from a timetable query result.
///
/// Entries are plain values. The cache stores copies of them and builds fresh
/// ones on every lookup, so a returned list is never shared or mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub departure_station_id: StationId,
    pub departure_station_name: String,
    pub departure_time: DateTime<FixedOffset>,

    pub arrival_station_id: StationId,
    pub arrival_station_name: String,
    pub arrival_time: DateTime<FixedOffset>,

    /// Route identifier, e.g. `"752А"`.
    pub train_route_id: String,

    /// Branded train name, e.g. `"Sapsan"`. Most trains have none.
    pub train_name: Option<String>,

    /// First and last stations of the whole route, not just this leg.
    pub route_start_station_name: String,
    pub route_end_station_name: String,
}

impl TimetableEntry {
    /// Create an entry without a train name.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        departure_station_id: StationId,
        departure_station_name: impl Into<String>,
        departure_time: DateTime<FixedOffset>,
        arrival_station_id: StationId,
        arrival_station_name: impl Into<String>,
        arrival_time: DateTime<FixedOffset>,
        train_route_id: impl Into<String>,
        route_start_station_name: impl Into<String>,
        route_end_station_name: impl Into<String>,
    ) -> Self {
        Self {
            departure_station_id,
            departure_station_name: departure_station_name.into(),
            departure_time,
            arrival_station_id,
            arrival_station_name: arrival_station_name.into(),
            arrival_time,
            train_route_id: train_route_id.into(),
            train_name: None,
            route_start_station_name: route_start_station_name.into(),
            route_end_station_name: route_end_station_name.into(),
        }
    }

    /// Set the train name.
    pub fn with_train_name(mut self, name: impl Into<String>) -> Self {
        self.train_name = Some(name.into());
        self
    }

    /// Time from departure to arrival.
    pub fn duration(&self) -> chrono::Duration {
        self.arrival_time.signed_duration_since(self.departure_time)
    }
}
