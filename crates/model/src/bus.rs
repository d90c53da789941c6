use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

/// Outbound (first stop → last stop) or inbound (reverse traversal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[repr(u8)]
pub enum Direction {
    Outbound = 0,
    Inbound = 1,
}

impl Direction {
    pub fn toggle(self) -> Self {
        match self {
            Direction::Outbound => Direction::Inbound,
            Direction::Inbound => Direction::Outbound,
        }
    }
}

/// Live state of one bus. Mutated only by the Bus-Position feeder; lifetime
/// equals the feeder process's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusState {
    pub bus_id: String,
    pub line_id: String,
    pub capacity: u32,
    pub passenger_count: u32,
    pub position_on_route: f64,
    /// Speed in km/h.
    pub speed: f64,
    pub at_stop: bool,
    pub direction: Direction,
}

impl HasId for BusState {
    type IdType = String;
}

impl BusState {
    pub fn new(bus_id: String, line_id: String, capacity: u32, initial_position: f64) -> Self {
        Self {
            bus_id,
            line_id,
            capacity,
            passenger_count: 0,
            position_on_route: initial_position,
            speed: 30.0,
            at_stop: false,
            direction: Direction::Outbound,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bus_id.trim().is_empty() {
            return Err("bus_id must not be empty".to_owned());
        }
        if self.capacity == 0 {
            return Err(format!("bus {}: capacity must be positive", self.bus_id));
        }
        if self.passenger_count > self.capacity {
            return Err(format!(
                "bus {}: passenger_count ({}) exceeds capacity ({})",
                self.bus_id, self.passenger_count, self.capacity
            ));
        }
        if !(0.0..=1.0).contains(&self.position_on_route) {
            return Err(format!(
                "bus {}: position_on_route {} out of range [0, 1]",
                self.bus_id, self.position_on_route
            ));
        }
        if self.speed < 0.0 {
            return Err(format!("bus {}: speed must be non-negative", self.bus_id));
        }
        Ok(())
    }

    pub fn available_capacity(&self) -> u32 {
        self.capacity - self.passenger_count
    }
}

/// How many people are waiting at each stop. Owned exclusively by the
/// People-Count feeder; never read by another feeder process.
#[derive(Debug, Clone, Default)]
pub struct StopCountState {
    counts: std::collections::HashMap<String, u32>,
}

impl StopCountState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stop_id: &str) -> u32 {
        self.counts.get(stop_id).copied().unwrap_or(0)
    }

    pub fn set(&mut self, stop_id: &str, count: u32) {
        self.counts.insert(stop_id.to_owned(), count);
    }

    /// Subtracts `amount` from the stop's waiting count, never going below zero.
    pub fn drain(&mut self, stop_id: &str, amount: u32) {
        let entry = self.counts.entry(stop_id.to_owned()).or_insert(0);
        *entry = entry.saturating_sub(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_toggles() {
        assert_eq!(Direction::Outbound.toggle(), Direction::Inbound);
        assert_eq!(Direction::Inbound.toggle(), Direction::Outbound);
    }

    #[test]
    fn rejects_passenger_count_above_capacity() {
        let mut bus = BusState::new("B1".to_owned(), "L1".to_owned(), 10, 0.0);
        bus.passenger_count = 11;
        assert!(bus.validate().is_err());
    }

    #[test]
    fn stop_count_never_goes_negative() {
        let mut counts = StopCountState::new();
        counts.set("S1", 3);
        counts.drain("S1", 10);
        assert_eq!(counts.get("S1"), 0);
    }
}
