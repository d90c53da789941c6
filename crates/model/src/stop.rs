use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

/// A bus stop on a route. Immutable after the simulation is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub stop_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_terminal: bool,
    /// People arriving per minute, before the daily-pattern multiplier.
    pub base_arrival_rate: f64,
}

impl HasId for Stop {
    type IdType = String;
}

impl Stop {
    pub fn validate(&self) -> Result<(), String> {
        if self.stop_id.trim().is_empty() {
            return Err("stop_id must not be empty".to_owned());
        }
        if self.name.trim().is_empty() {
            return Err(format!("stop {}: name must not be empty", self.stop_id));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!(
                "stop {}: latitude {} out of range [-90, 90]",
                self.stop_id, self.latitude
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "stop {}: longitude {} out of range [-180, 180]",
                self.stop_id, self.longitude
            ));
        }
        if self.base_arrival_rate < 0.0 {
            return Err(format!(
                "stop {}: base_arrival_rate must be non-negative, got {}",
                self.stop_id, self.base_arrival_rate
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Stop {
        Stop {
            stop_id: "S001".to_owned(),
            name: "Plaza Mayor".to_owned(),
            latitude: 40.415,
            longitude: -3.707,
            is_terminal: false,
            base_arrival_rate: 2.5,
        }
    }

    #[test]
    fn accepts_valid_stop() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let mut stop = valid();
        stop.latitude = 95.0;
        assert!(stop.validate().is_err());
    }

    #[test]
    fn rejects_negative_arrival_rate() {
        let mut stop = valid();
        stop.base_arrival_rate = -1.0;
        assert!(stop.validate().is_err());
    }
}
