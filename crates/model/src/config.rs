use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bus::BusState;
use crate::route::Route;
use crate::stop::Stop;

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default)]
    lines: Vec<RawLine>,
    #[serde(default)]
    buses: Vec<RawBus>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLine {
    line_id: String,
    name: String,
    stops: Vec<RawStop>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStop {
    stop_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    is_terminal: bool,
    base_arrival_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct RawBus {
    bus_id: String,
    line_id: String,
    capacity: u32,
    #[serde(default)]
    initial_position: f64,
}

/// Every violation found while loading a configuration, collected rather
/// than reported one-at-a-time — friendlier when a hand-written TOML file
/// has several mistakes at once.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub violations: Vec<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invalid simulation configuration:")?;
        for violation in &self.violations {
            writeln!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// Fully loaded and validated simulation configuration: routes (with their
/// stops) and the buses operating on each.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationConfig {
    pub routes: Vec<Route>,
    pub buses: Vec<BusState>,
}

impl SimulationConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(raw).map_err(|why| ConfigError {
            violations: vec![format!("failed to parse TOML: {why}")],
        })?;
        Self::from_raw(raw)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|why| ConfigError {
            violations: vec![format!("failed to read {}: {why}", path.display())],
        })?;
        Self::from_toml_str(&contents)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut violations = Vec::new();

        if raw.lines.is_empty() {
            violations.push("configuration must contain at least one line".to_owned());
            return Err(ConfigError { violations });
        }

        let mut routes = Vec::new();
        let mut line_ids_seen = HashSet::new();

        for line in &raw.lines {
            if !line_ids_seen.insert(line.line_id.clone()) {
                violations.push(format!("duplicate line_id: {}", line.line_id));
            }

            let stops: Vec<Stop> = line
                .stops
                .iter()
                .map(|stop| Stop {
                    stop_id: stop.stop_id.clone(),
                    name: stop.name.clone(),
                    latitude: stop.latitude,
                    longitude: stop.longitude,
                    is_terminal: stop.is_terminal,
                    base_arrival_rate: stop.base_arrival_rate,
                })
                .collect();

            let route = Route::new(line.line_id.clone(), line.name.clone(), stops);
            if let Err(why) = route.validate() {
                violations.push(why);
            }

            routes.push(route);
        }

        let known_lines: HashSet<&str> =
            routes.iter().map(|route| route.line_id.as_str()).collect();

        let mut buses = Vec::new();
        let mut buses_per_line: HashMap<&str, u32> = HashMap::new();

        for bus in &raw.buses {
            if !known_lines.contains(bus.line_id.as_str()) {
                violations.push(format!(
                    "bus {}: references unknown line_id {}",
                    bus.bus_id, bus.line_id
                ));
                continue;
            }
            *buses_per_line.entry(bus.line_id.as_str()).or_insert(0) += 1;

            let state = BusState::new(
                bus.bus_id.clone(),
                bus.line_id.clone(),
                bus.capacity,
                bus.initial_position,
            );
            if let Err(why) = state.validate() {
                violations.push(why);
            }
            buses.push(state);
        }

        for line_id in &line_ids_seen {
            if buses_per_line.get(line_id.as_str()).copied().unwrap_or(0) == 0 {
                violations.push(format!("line {line_id}: must have at least one bus"));
            }
        }

        if !violations.is_empty() {
            return Err(ConfigError { violations });
        }

        Ok(Self { routes, buses })
    }

    /// Maps every `stop_id` to the `line_id`s that serve it.
    pub fn lines_by_stop(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for route in &self.routes {
            for stop in &route.stops {
                map.entry(stop.stop_id.clone())
                    .or_default()
                    .push(route.line_id.clone());
            }
        }
        map
    }
}
