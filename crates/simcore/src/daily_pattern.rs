//! Daily arrival pattern (C2): the time-of-day demand multiplier and Poisson
//! sampling of stop arrivals over an interval.

use rand::Rng;

/// Demand multiplier for the hour of day, mirroring the commute-peaked
/// step function of the original simulator.
pub fn time_multiplier(hour: u32) -> f64 {
    match hour {
        6..=8 => 1.5,
        9..=11 => 0.6,
        12..=14 => 1.2,
        15..=17 => 0.8,
        18..=20 => 1.4,
        _ => 0.2,
    }
}

/// Samples a Poisson(mu) count using Knuth's algorithm.
///
/// `mu` must be non-negative; `mu == 0.0` always returns 0 without touching
/// `rng`, matching the original's early-out.
pub fn poisson_sample(mu: f64, rng: &mut impl Rng) -> u32 {
    if mu <= 0.0 {
        return 0;
    }
    let l = (-mu).exp();
    let mut k: u32 = 0;
    let mut p = 1.0;
    loop {
        k += 1;
        p *= rng.gen::<f64>();
        if p <= l {
            break;
        }
    }
    k - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn morning_peak_multiplier() {
        assert_eq!(time_multiplier(7), 1.5);
    }

    #[test]
    fn midday_lull_multiplier() {
        assert_eq!(time_multiplier(10), 0.6);
    }

    #[test]
    fn early_afternoon_multiplier() {
        assert_eq!(time_multiplier(13), 1.2);
    }

    #[test]
    fn late_afternoon_multiplier() {
        assert_eq!(time_multiplier(16), 0.8);
    }

    #[test]
    fn evening_peak_multiplier() {
        assert_eq!(time_multiplier(19), 1.4);
    }

    #[test]
    fn overnight_multiplier() {
        assert_eq!(time_multiplier(2), 0.2);
        assert_eq!(time_multiplier(23), 0.2);
        assert_eq!(time_multiplier(5), 0.2);
    }

    #[test]
    fn zero_mean_is_always_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(poisson_sample(0.0, &mut rng), 0);
        }
    }

    #[test]
    fn sample_mean_converges_to_mu() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mu = 4.0;
        let n = 20_000;
        let total: u64 = (0..n).map(|_| poisson_sample(mu, &mut rng) as u64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - mu).abs() < 0.1, "mean was {mean}");
    }
}
