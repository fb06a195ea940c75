//! Viewer traffic model.
//!
//! Watches arrive as a Poisson process: inter-arrival gaps are exponential
//! with mean `1 / watches_per_hour` hours.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};

use crate::error::SimError;

const SECS_PER_HOUR: f64 = 3600.0;

pub struct Audience {
    rng: ChaCha8Rng,
    gaps: Exp<f64>,
}

impl Audience {
    pub fn new(seed: u64, watches_per_hour: f64) -> Result<Self, SimError> {
        if !(watches_per_hour.is_finite() && watches_per_hour > 0.0) {
            return Err(SimError::InvalidRate(watches_per_hour));
        }
        let gaps = Exp::new(watches_per_hour).map_err(|_| SimError::InvalidRate(watches_per_hour))?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            gaps,
        })
    }

    /// Time until the next watch.
    pub fn next_gap(&mut self) -> Duration {
        let hours: f64 = self.gaps.sample(&mut self.rng);
        Duration::from_secs_f64(hours * SECS_PER_HOUR)
    }

    /// Watch offsets from now, in order, up to `horizon`.
    pub fn arrivals_until(&mut self, horizon: Duration) -> Vec<Duration> {
        let mut arrivals = Vec::new();
        let mut at = Duration::ZERO;
        loop {
            at += self.next_gap();
            if at > horizon {
                return arrivals;
            }
            arrivals.push(at);
        }
    }
}
