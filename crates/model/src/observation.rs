use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bus::Direction;

/// People waiting at a stop, as observed at `time`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeopleCount {
    pub stop_id: String,
    pub time: DateTime<Utc>,
    pub count: u32,
    /// Routes serving this stop. Must be non-empty.
    pub line_ids: Vec<String>,
}

impl PeopleCount {
    pub fn validate(&self) -> Result<(), String> {
        if self.line_ids.is_empty() {
            return Err(format!(
                "people count for stop {}: line_ids must not be empty",
                self.stop_id
            ));
        }
        Ok(())
    }
}

/// Which kind of entity a `SensorReading` describes. Modeled as a tagged
/// variant (per the teacher's "inheritance in data classes" guidance) rather
/// than an all-optional struct, so a stop reading cannot carry CO2/door
/// fields even by construction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "entityType", rename_all = "snake_case")]
pub enum SensorEntity {
    Bus {
        co2_ppm: u32,
        door_status: DoorStatus,
    },
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DoorStatus {
    Open,
    Closed,
}

impl From<bool> for DoorStatus {
    fn from(at_stop: bool) -> Self {
        if at_stop {
            DoorStatus::Open
        } else {
            DoorStatus::Closed
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub entity_id: String,
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    #[serde(flatten)]
    pub entity: SensorEntity,
}

impl SensorReading {
    pub fn validate(&self) -> Result<(), String> {
        if self.entity_id.trim().is_empty() {
            return Err("entity_id must not be empty".to_owned());
        }
        if !(-50.0..=60.0).contains(&self.temperature_c) {
            return Err(format!(
                "sensor {}: temperature {} out of range [-50, 60]",
                self.entity_id, self.temperature_c
            ));
        }
        if !(0.0..=100.0).contains(&self.humidity_percent) {
            return Err(format!(
                "sensor {}: humidity {} out of range [0, 100]",
                self.entity_id, self.humidity_percent
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusPosition {
    pub bus_id: String,
    pub line_id: String,
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub passenger_count: u32,
    pub next_stop_id: Option<String>,
    pub distance_to_next_stop_m: f64,
    pub speed: f64,
    pub direction: Direction,
    /// Whether this tick's motion reached a stop (§4.4: `door_status = open
    /// ⇔ bus_state.at_stop`). Carried on the wire row rather than re-derived
    /// from `distance_to_next_stop_m`, since after a stop is crossed
    /// `next_stop_id` already points past it.
    pub at_stop: bool,
}

impl BusPosition {
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!(
                "bus {}: latitude {} out of range [-90, 90]",
                self.bus_id, self.latitude
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "bus {}: longitude {} out of range [-180, 180]",
                self.bus_id, self.longitude
            ));
        }
        if self.distance_to_next_stop_m < 0.0 {
            return Err(format!(
                "bus {}: distance_to_next_stop_m must be non-negative",
                self.bus_id
            ));
        }
        Ok(())
    }
}

/// A bus reaching a stop: ephemeral in-memory record, also the event payload
/// published on the `bus.arrival` subject (§6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusArrival {
    pub bus_id: String,
    pub line_id: String,
    pub stop_id: String,
    pub time: DateTime<Utc>,
    pub passengers_boarding: u32,
    pub passengers_alighting: u32,
    pub bus_passenger_count_after: u32,
    pub stop_people_count_after: u32,
}

/// The three tables observations are written to (X1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    PeopleCount,
    SensorData,
    BusPosition,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::PeopleCount => "people_count",
            Table::SensorData => "sensor_data",
            Table::BusPosition => "bus_position",
        }
    }
}
