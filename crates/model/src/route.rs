use std::collections::HashSet;
use std::sync::OnceLock;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo::haversine_distance_m;
use utility::id::HasId;

use crate::stop::Stop;

/// A bus line: an ordered sequence of stops plus the derived segment/total
/// distances, memoised lazily the first time they're needed (mirrors the
/// original `_ensure_distances_calculated` laziness and the teacher's
/// "lazily-initialised, read-only-after-init" pattern for cached data).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub line_id: String,
    pub name: String,
    pub stops: Vec<Stop>,

    #[serde(skip)]
    #[schemars(skip)]
    distances: OnceLock<Distances>,
}

impl HasId for Route {
    type IdType = String;
}

#[derive(Debug, Clone)]
struct Distances {
    segments: Vec<f64>,
    total: f64,
}

impl Route {
    pub fn new(line_id: String, name: String, stops: Vec<Stop>) -> Self {
        Self {
            line_id,
            name,
            stops,
            distances: OnceLock::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.line_id.trim().is_empty() {
            return Err("line_id must not be empty".to_owned());
        }
        if self.stops.len() < 2 {
            return Err(format!(
                "line {}: route must have at least 2 stops, got {}",
                self.line_id,
                self.stops.len()
            ));
        }
        for stop in &self.stops {
            stop.validate()?;
        }
        let mut seen = HashSet::new();
        for stop in &self.stops {
            if !seen.insert(&stop.stop_id) {
                return Err(format!(
                    "line {}: duplicate stop_id {}",
                    self.line_id, stop.stop_id
                ));
            }
        }
        if !self.stops.iter().any(|stop| stop.is_terminal) {
            return Err(format!(
                "line {}: route must have at least one terminal stop",
                self.line_id
            ));
        }
        Ok(())
    }

    fn distances(&self) -> &Distances {
        self.distances.get_or_init(|| {
            let segments: Vec<f64> = self
                .stops
                .windows(2)
                .map(|pair| {
                    haversine_distance_m(
                        pair[0].latitude,
                        pair[0].longitude,
                        pair[1].latitude,
                        pair[1].longitude,
                    )
                })
                .collect();
            let total = segments.iter().sum();
            Distances { segments, total }
        })
    }

    /// Total route distance in meters (C1, §4.1).
    pub fn total_distance(&self) -> f64 {
        self.distances().total
    }

    /// Per-segment (consecutive stop pair) distances in meters, in route order.
    pub fn segment_distances(&self) -> &[f64] {
        &self.distances().segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_terminals() -> Route {
        Route::new(
            "L1".to_owned(),
            "Line 1".to_owned(),
            vec![
                Stop {
                    stop_id: "A".to_owned(),
                    name: "A".to_owned(),
                    latitude: 40.00,
                    longitude: -3.00,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
                Stop {
                    stop_id: "B".to_owned(),
                    name: "B".to_owned(),
                    latitude: 40.10,
                    longitude: -3.10,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
            ],
        )
    }

    #[test]
    fn validates_minimal_route() {
        assert!(two_terminals().validate().is_ok());
    }

    #[test]
    fn rejects_single_stop_route() {
        let mut route = two_terminals();
        route.stops.truncate(1);
        assert!(route.validate().is_err());
    }

    #[test]
    fn rejects_route_without_terminal() {
        let mut route = two_terminals();
        for stop in &mut route.stops {
            stop.is_terminal = false;
        }
        assert!(route.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_stop_ids() {
        let mut route = two_terminals();
        route.stops[1].stop_id = route.stops[0].stop_id.clone();
        assert!(route.validate().is_err());
    }

    #[test]
    fn total_distance_is_memoised() {
        let route = two_terminals();
        let first = route.total_distance();
        let second = route.total_distance();
        assert_eq!(first, second);
        assert!(first > 0.0);
    }
}
