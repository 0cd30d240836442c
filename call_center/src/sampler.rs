//! Random streams for inter-arrival gaps and service durations
//!
//! The engine only sees [`Sampler::sample`]; which distribution sits behind it is
//! decided when the run is configured. Every value the engine consumes goes through
//! [`checked_sample`], so a misbehaving sampler aborts the run instead of corrupting
//! the clock.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};

use crate::config::DistributionKind;
use crate::error::{CallCenterError, Result};

pub trait Sampler {
    fn sample(&mut self) -> f64;
}

/// Exponentially distributed values with the given rate (mean = 1 / rate)
pub struct Exponential {
    rng: StdRng,
    distribution: Exp<f64>,
}

impl Exponential {
    pub fn new(rate: f64, seed: Option<u64>) -> Result<Self> {
        let distribution = Exp::new(rate).map_err(|e| {
            CallCenterError::invalid_config(format!("exponential rate {}: {}", rate, e))
        })?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Exponential { rng, distribution })
    }

    pub fn with_mean(mean: f64, seed: Option<u64>) -> Result<Self> {
        Self::new(1.0 / mean, seed)
    }
}

impl Sampler for Exponential {
    fn sample(&mut self) -> f64 {
        self.distribution.sample(&mut self.rng)
    }
}

/// The same value every time
pub struct Fixed(pub f64);

impl Sampler for Fixed {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Replays a recorded sequence, wrapping around at the end
///
/// An empty sequence yields NaN, which the engine rejects as an invalid sample.
pub struct Empirical {
    values: Vec<f64>,
    next: usize,
}

impl Empirical {
    pub fn new(values: Vec<f64>) -> Self {
        Empirical { values, next: 0 }
    }
}

impl Sampler for Empirical {
    fn sample(&mut self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        let value = self.values[self.next];
        self.next = (self.next + 1) % self.values.len();
        value
    }
}

/// Draw one value and make sure it is a usable duration
pub fn checked_sample(sampler: &mut dyn Sampler, stream: &'static str) -> Result<f64> {
    let value = sampler.sample();
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CallCenterError::InvalidSample { stream, value })
    }
}

/// Build a sampler with the given mean
pub fn from_kind(
    kind: DistributionKind,
    mean: f64,
    seed: Option<u64>,
) -> Result<Box<dyn Sampler>> {
    Ok(match kind {
        DistributionKind::Exponential => Box::new(Exponential::with_mean(mean, seed)?),
        DistributionKind::Fixed => Box::new(Fixed(mean)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn seeded_exponential_is_reproducible() {
        let mut a = Exponential::new(0.5, Some(7)).unwrap();
        let mut b = Exponential::new(0.5, Some(7)).unwrap();
        for _ in 0..100 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn exponential_mean_is_close_to_configured_mean() {
        let mut sampler = Exponential::with_mean(5.0, Some(42)).unwrap();
        let n = 20_000;
        let mean = (0..n).map(|_| sampler.sample()).sum::<f64>() / n as f64;
        assert_relative_eq!(mean, 5.0, max_relative = 0.05);
    }

    #[test]
    fn exponential_rejects_negative_rate() {
        assert!(Exponential::new(-1.0, Some(1)).is_err());
    }

    #[test]
    fn empirical_wraps_around() {
        let mut sampler = Empirical::new(vec![1.0, 2.0]);
        let drawn: Vec<f64> = (0..5).map(|_| sampler.sample()).collect();
        assert_eq!(drawn, vec![1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn checked_sample_rejects_negative_and_nan() {
        let mut negative = Fixed(-0.5);
        let err = checked_sample(&mut negative, "service").unwrap_err();
        assert!(matches!(
            err,
            CallCenterError::InvalidSample { stream: "service", value } if value == -0.5
        ));

        let mut empty = Empirical::new(vec![]);
        assert!(checked_sample(&mut empty, "inter-arrival").is_err());
    }

    #[test]
    fn checked_sample_accepts_zero() {
        let mut zero = Fixed(0.0);
        assert_eq!(checked_sample(&mut zero, "inter-arrival").unwrap(), 0.0);
    }

    #[test]
    fn fixed_kind_returns_the_mean() {
        let mut sampler = from_kind(DistributionKind::Fixed, 5.0, None).unwrap();
        assert_eq!(sampler.sample(), 5.0);
    }
}
