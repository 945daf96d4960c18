//! Pacing delays injected between relayed chunks
//!
//! Two shapes: a sampled inter-arrival time for obfs4 and a clock-driven
//! sine waveform for the custom obfuscator. Both formulas are kept exactly
//! as deployed peers expect them, including the simplified Pareto curve.

use crate::crypto::random_unit;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Bounds used when the distribution name is not recognised
pub const FALLBACK_IAT_RANGE: (u64, u64) = (5, 20);

/// Inter-arrival-time distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IatDistribution {
    /// `min + (max - min) * (1 - u)^2`
    Pareto,
    /// `min + floor(u * (max - min))`
    Uniform,
    /// Uniform over [`FALLBACK_IAT_RANGE`], ignoring the configured bounds
    Fallback,
}

impl IatDistribution {
    /// Map a configured name to a distribution; unknown names fall back
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pareto" => Self::Pareto,
            "uniform" => Self::Uniform,
            _ => Self::Fallback,
        }
    }

    /// Name for logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pareto => "pareto",
            Self::Uniform => "uniform",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for IatDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IAT sampler with its bounds in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IatSchedule {
    distribution: IatDistribution,
    min_ms: u64,
    max_ms: u64,
}

impl IatSchedule {
    /// Create a schedule; callers validate `min_ms <= max_ms`
    pub fn new(distribution: IatDistribution, min_ms: u64, max_ms: u64) -> Self {
        Self {
            distribution,
            min_ms,
            max_ms,
        }
    }

    /// Configured distribution
    pub fn distribution(&self) -> IatDistribution {
        self.distribution
    }

    /// Delay in milliseconds for a given `u` in `[0, 1)`
    pub fn sample_ms(&self, u: f64) -> u64 {
        let (min, max) = match self.distribution {
            IatDistribution::Fallback => FALLBACK_IAT_RANGE,
            _ => (self.min_ms, self.max_ms),
        };
        let span = max.saturating_sub(min) as f64;

        match self.distribution {
            IatDistribution::Pareto => (min as f64 + span * (1.0 - u) * (1.0 - u)) as u64,
            IatDistribution::Uniform | IatDistribution::Fallback => min + (u * span) as u64,
        }
    }

    /// Sample a delay from the OS CSPRNG
    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(self.sample_ms(random_unit()))
    }
}

/// Sine-wave jitter for a wall-clock instant, in milliseconds
///
/// `floor(|sin(now_ms / 1000) * jitter_ms|)`
pub fn sine_jitter_ms(now_ms: u64, jitter_ms: u64) -> u64 {
    ((now_ms as f64 / 1000.0).sin() * jitter_ms as f64).abs() as u64
}

/// Sine-wave jitter for the current time, `None` when it rounds to zero
pub fn sine_jitter(jitter_ms: u64) -> Option<Duration> {
    if jitter_ms == 0 {
        return None;
    }
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    match sine_jitter_ms(now_ms, jitter_ms) {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distribution_names() {
        assert_eq!(IatDistribution::from_name("pareto"), IatDistribution::Pareto);
        assert_eq!(IatDistribution::from_name(" Uniform "), IatDistribution::Uniform);
        assert_eq!(IatDistribution::from_name("gaussian"), IatDistribution::Fallback);
    }

    #[test]
    fn test_pareto_formula() {
        let iat = IatSchedule::new(IatDistribution::Pareto, 10, 100);
        assert_eq!(iat.sample_ms(0.0), 100);
        assert_eq!(iat.sample_ms(0.5), 32); // 10 + 90 * 0.25 = 32.5
        assert_eq!(iat.sample_ms(0.999_999), 10);
    }

    #[test]
    fn test_uniform_formula() {
        let iat = IatSchedule::new(IatDistribution::Uniform, 10, 100);
        assert_eq!(iat.sample_ms(0.0), 10);
        assert_eq!(iat.sample_ms(0.5), 55);
        assert_eq!(iat.sample_ms(0.999_999), 99);
    }

    #[test]
    fn test_fallback_ignores_bounds() {
        let iat = IatSchedule::new(IatDistribution::Fallback, 500, 900);
        assert_eq!(iat.sample_ms(0.0), 5);
        assert_eq!(iat.sample_ms(0.999_999), 19);
    }

    #[test]
    fn test_degenerate_bounds() {
        let iat = IatSchedule::new(IatDistribution::Pareto, 40, 40);
        assert_eq!(iat.sample_ms(0.3), 40);
        assert_eq!(iat.next_delay(), Duration::from_millis(40));
    }

    #[test]
    fn test_sine_jitter_waveform() {
        assert_eq!(sine_jitter_ms(0, 50), 0);
        // sin(pi/2) = 1
        assert_eq!(sine_jitter_ms(1571, 50), 49);
        // sin(-pi/2 + 2pi) = -1, the magnitude is what counts
        assert_eq!(sine_jitter_ms(4712, 50), 49);
        assert_eq!(sine_jitter_ms(123_456, 0), 0);
        assert!(sine_jitter(0).is_none());
    }

    proptest! {
        #[test]
        fn prop_samples_within_bounds(min in 0u64..1000, extra in 0u64..1000, u in 0.0f64..1.0) {
            let max = min + extra;
            for dist in [IatDistribution::Pareto, IatDistribution::Uniform] {
                let ms = IatSchedule::new(dist, min, max).sample_ms(u);
                prop_assert!(ms >= min && ms <= max);
            }
            let fallback = IatSchedule::new(IatDistribution::Fallback, min, max).sample_ms(u);
            prop_assert!((5..20).contains(&fallback));
        }

        #[test]
        fn prop_sine_jitter_bounded(now in any::<u32>(), jitter in 0u64..10_000) {
            prop_assert!(sine_jitter_ms(now as u64, jitter) <= jitter);
        }
    }
}
