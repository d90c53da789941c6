//! Passenger dynamics (C3): alighting, boarding and the stop-count
//! generator built on the daily-pattern Poisson sampler.

use std::fmt;

use rand::Rng;

use crate::daily_pattern::{poisson_sample, time_multiplier};

#[derive(Debug, Clone, PartialEq)]
pub enum PassengerError {
    NonPositiveInterval(f64),
}

impl fmt::Display for PassengerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassengerError::NonPositiveInterval(minutes) => {
                write!(f, "interval_minutes must be positive, got {minutes}")
            }
        }
    }
}

impl std::error::Error for PassengerError {}

/// Passengers disembarking at a stop. Terminal stops always fully drain the
/// bus; otherwise a uniform random fraction in `[0.20, 0.40]` alights.
pub fn alighting(passengers_on_bus: u32, is_terminal: bool, rng: &mut impl Rng) -> u32 {
    if is_terminal {
        return passengers_on_bus;
    }
    let fraction = rng.gen_range(0.20..=0.40);
    (passengers_on_bus as f64 * fraction).floor() as u32
}

/// Passengers that can board given what's waiting and the bus's remaining
/// capacity after alighting.
pub fn boarding(waiting_at_stop: u32, available_capacity: u32) -> u32 {
    waiting_at_stop.min(available_capacity)
}

/// Next waiting count for a stop: natural Poisson arrivals since the last
/// tick, minus everyone who boarded during the interval, floored at zero.
pub fn generate_stop_count(
    prev_count: u32,
    hour: u32,
    base_rate: f64,
    interval_minutes: f64,
    boardings_in_interval: u32,
    rng: &mut impl Rng,
) -> Result<u32, PassengerError> {
    if interval_minutes <= 0.0 {
        return Err(PassengerError::NonPositiveInterval(interval_minutes));
    }
    let mu = base_rate * time_multiplier(hour) * interval_minutes;
    let arrivals = poisson_sample(mu, rng);
    let total = prev_count as i64 + arrivals as i64 - boardings_in_interval as i64;
    Ok(total.max(0) as u32)
}
