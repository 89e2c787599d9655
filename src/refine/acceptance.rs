//! Acceptance test and temperature control for the random walk.
//!
//! The acceptance test is a one-sided Metropolis criterion scaled by the current
//! weighted R-factor, so the same temperature stays meaningful as the fit improves:
//! a worse proposal is accepted with probability
//! `exp(-(new - current) / (current * T))`.

use crate::goodness::GoodnessOfFit;
use rand::Rng;
use tracing::debug;

/// Proposals with a weighted R-factor above this are always rejected.
pub const DEGENERATE_CEILING: f64 = 1.0 - 1.0e-9;

/// Lowest temperature the annealer settles at.
pub const MIN_TEMPERATURE: f64 = f64::MIN_POSITIVE;

/// Highest temperature the annealer settles at.
pub const MAX_TEMPERATURE: f64 = f64::MAX / 2.0;

/// Probability of accepting a move from `current` to `proposed`
pub fn acceptance_probability(current: &GoodnessOfFit, proposed: &GoodnessOfFit, temperature: f64) -> f64 {
    if proposed.rwp < current.rwp {
        1.0
    } else if proposed.rwp > DEGENERATE_CEILING {
        0.0
    } else if proposed.rwp == current.rwp {
        1.0
    } else {
        (-(proposed.rwp - current.rwp) / (current.rwp * temperature)).exp()
    }
}

/// Decide whether `proposed` replaces `current`
///
/// Improvements are accepted without drawing a random number; degenerate fits are
/// rejected without drawing either.
///
/// # Examples
///
/// ```
/// use lebail_rs::goodness::GoodnessOfFit;
/// use lebail_rs::refine::acceptance::accept;
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut rng = ChaCha8Rng::seed_from_u64(7);
/// let current = GoodnessOfFit::new(0.5, 0.5);
/// assert!(accept(&current, &GoodnessOfFit::new(0.3, 0.3), 1.0, &mut rng));
/// assert!(!accept(&current, &GoodnessOfFit::new(1.0 - 1e-10, 0.9), 1.0, &mut rng));
/// ```
pub fn accept<R: Rng>(
    current: &GoodnessOfFit,
    proposed: &GoodnessOfFit,
    temperature: f64,
    rng: &mut R,
) -> bool {
    if proposed.rwp < current.rwp {
        return true;
    }
    if proposed.rwp > DEGENERATE_CEILING {
        debug!("Rwp {:.6} above degenerate ceiling, rejected", proposed.rwp);
        return false;
    }

    let bar = acceptance_probability(current, proposed, temperature);
    let dice: f64 = rng.gen();
    dice < bar
}

/// Adapts the temperature to the acceptance rate over fixed windows of proposals.
///
/// At the end of each window, an acceptance rate of at most 20 % doubles the
/// temperature and a rate of at least 80 % halves it. The temperature is kept
/// within [`MIN_TEMPERATURE`, `MAX_TEMPERATURE`] so it can always recover.
#[derive(Debug, Clone, PartialEq)]
pub struct Annealer {
    temperature: f64,
    window: usize,
    enabled: bool,
    attempts: usize,
    accepted: usize,
}

impl Annealer {
    /// Create an annealer; the sign of `temperature` is ignored
    pub fn new(temperature: f64, window: usize, enabled: bool) -> Self {
        Self {
            temperature: temperature.abs().clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
            window: window.max(1),
            enabled,
            attempts: 0,
            accepted: 0,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Record the outcome of one evaluated proposal
    ///
    /// Returns the new temperature when it changed.
    pub fn record(&mut self, accepted: bool) -> Option<f64> {
        self.attempts += 1;
        if accepted {
            self.accepted += 1;
        }
        if self.attempts < self.window {
            return None;
        }

        let accepted = self.accepted;
        self.attempts = 0;
        self.accepted = 0;
        if !self.enabled {
            return None;
        }

        // accepted / window <= 0.2 and >= 0.8, in integers
        let previous = self.temperature;
        let adjusted = if accepted * 5 <= self.window {
            previous * 2.0
        } else if accepted * 5 >= self.window * 4 {
            previous * 0.5
        } else {
            return None;
        };
        self.temperature = adjusted.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
        if self.temperature == previous {
            return None;
        }
        debug!(
            "Annealing: {} of {} accepted, temperature {:.4e} -> {:.4e}",
            accepted, self.window, previous, self.temperature
        );
        Some(self.temperature)
    }
}
