// Path: crates/workers/src/sim.rs

//! The Bernoulli failure simulator.

use rand::Rng;
use thiserror::Error;

/// The error injected by the simulator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("simulated failure")]
pub struct SimulatedFailure;

/// A uniform Bernoulli trial with a configured failure probability.
///
/// Wrapped around selected sources for chaos injection; a rate outside
/// `[0, 1]` is clamped.
#[derive(Debug, Clone, Copy)]
pub struct FailureSimulator {
    failure_rate: f64,
}

impl FailureSimulator {
    /// Builds a simulator failing with probability `failure_rate`.
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    /// Fails with the configured probability.
    pub fn maybe_fail(&self) -> Result<(), SimulatedFailure> {
        if self.failure_rate > 0.0 && rand::thread_rng().gen::<f64>() < self.failure_rate {
            return Err(SimulatedFailure);
        }
        Ok(())
    }

    /// The configured failure probability.
    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_zero_never_fails() {
        let sim = FailureSimulator::new(0.0);
        assert!((0..1000).all(|_| sim.maybe_fail().is_ok()));
    }

    #[test]
    fn rate_one_always_fails() {
        let sim = FailureSimulator::new(1.0);
        assert!((0..1000).all(|_| sim.maybe_fail().is_err()));
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        assert_eq!(FailureSimulator::new(7.5).failure_rate(), 1.0);
        assert_eq!(FailureSimulator::new(-1.0).failure_rate(), 0.0);
    }
}
