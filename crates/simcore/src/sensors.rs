//! Sensor synthesis (C4): ambient temperature curve plus per-entity
//! temperature/humidity/CO2 readings and door status.

use rand_distr::{Distribution, Normal};

/// Peak hour of the ambient temperature curve; the trough falls twelve
/// hours later, at 03:00. Fixed here so nobody silently moves it later.
const PEAK_HOUR: f64 = 15.0;

/// Ambient temperature for the hour of day (may carry a fractional part for
/// sub-hour precision), before sensor noise.
pub fn ambient_temperature(hour_with_minutes: f64) -> f64 {
    21.5 + 6.5 * (2.0 * std::f64::consts::PI * (hour_with_minutes - PEAK_HOUR) / 24.0).cos()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub co2_ppm: Option<u32>,
    pub door_status: Option<&'static str>,
}

/// A reading for a stop entity: no CO2 or door status.
pub fn stop_reading(hour_with_minutes: f64, rng: &mut impl rand::Rng) -> SensorReading {
    let (temperature_c, humidity_pct) = temperature_and_humidity(hour_with_minutes, rng);
    SensorReading {
        temperature_c,
        humidity_pct,
        co2_ppm: None,
        door_status: None,
    }
}

/// A reading for a bus entity: carries CO2 (driven by passenger load) and
/// door status (derived from `at_stop`).
pub fn bus_reading(
    hour_with_minutes: f64,
    passenger_count: u32,
    at_stop: bool,
    rng: &mut impl rand::Rng,
) -> SensorReading {
    let (temperature_c, humidity_pct) = temperature_and_humidity(hour_with_minutes, rng);

    let co2_noise = Normal::new(0.0, 50.0).unwrap().sample(rng);
    let co2 = 400.0 + 50.0 * passenger_count as f64 + co2_noise;
    let co2_ppm = Some(co2.round().max(0.0) as u32);

    let door_status = Some(if at_stop { "open" } else { "closed" });

    SensorReading {
        temperature_c,
        humidity_pct,
        co2_ppm,
        door_status,
    }
}

fn temperature_and_humidity(hour_with_minutes: f64, rng: &mut impl rand::Rng) -> (f64, f64) {
    let temperature_noise = Normal::new(0.0, 1.5).unwrap().sample(rng);
    let temperature_c = ambient_temperature(hour_with_minutes) + temperature_noise;

    let humidity_noise = Normal::new(0.0, 5.0).unwrap().sample(rng);
    let humidity_raw = 70.0 - 2.0 * (temperature_c - 20.0) + humidity_noise;
    let humidity_pct = humidity_raw.clamp(20.0, 90.0);

    (temperature_c, humidity_pct)
}
