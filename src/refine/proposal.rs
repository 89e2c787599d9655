//! Random-walk proposals for one parameter group.

use crate::error::{LeBailError, Result};
use crate::goodness::GoodnessOfFit;
use crate::parameters::{BoundaryPolicy, MoveStatistics, ParameterGroup, ParameterSet};
use crate::refine::config::WalkStyle;
use ndarray::Array1;
use rand::Rng;
use tracing::debug;

/// Drunken walk: draws below this step against the preferred direction.
const AGAINST_THRESHOLD: f64 = 0.1;

/// Drunken walk: draws at or above this step along the preferred direction.
const ALONG_THRESHOLD: f64 = 0.4;

/// A proposed snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Full snapshot; parameters outside the group keep their current values
    pub values: Array1<f64>,

    /// Whether any parameter of the group was refinable
    pub any_proposed: bool,
}

/// Proposes new values for the members of a parameter group.
///
/// The step for a parameter with value `v` is
/// `damping * Rwp * (v * a1 + a0) * r` with `r` uniform in `[-1, 1]`, so poor fits
/// take large steps and good fits small ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalEngine {
    pub damping: f64,
    pub walk_style: WalkStyle,
    pub boundary_policy: BoundaryPolicy,
}

impl ProposalEngine {
    pub fn new(damping: f64, walk_style: WalkStyle, boundary_policy: BoundaryPolicy) -> Self {
        Self {
            damping,
            walk_style,
            boundary_policy,
        }
    }

    /// Propose new values for `group` starting from the `current` snapshot
    ///
    /// `current` is never modified. Movement statistics of every proposed parameter
    /// are recorded in `stats`, which is indexed like `params`.
    ///
    /// # Arguments
    ///
    /// * `group` - The group to perturb
    /// * `params` - Parameter records (bounds, coefficients, flags)
    /// * `current` - Current snapshot
    /// * `fit` - Goodness of fit of the current snapshot
    /// * `stats` - Per-parameter movement statistics
    /// * `previous_improved` - Whether the previous evaluated proposal improved the fit
    /// * `rng` - Random number generator
    #[allow(clippy::too_many_arguments)]
    pub fn propose<R: Rng>(
        &self,
        group: &ParameterGroup,
        params: &ParameterSet,
        current: &Array1<f64>,
        fit: &GoodnessOfFit,
        stats: &mut [MoveStatistics],
        previous_improved: bool,
        rng: &mut R,
    ) -> Result<Proposal> {
        if current.len() != params.len() || stats.len() != params.len() {
            return Err(LeBailError::DimensionMismatch(format!(
                "snapshot ({}) and statistics ({}) must match the parameter set ({})",
                current.len(),
                stats.len(),
                params.len()
            )));
        }

        let mut values = current.clone();
        let mut any_proposed = false;

        for &index in &group.members {
            let param = params
                .at(index)
                .ok_or_else(|| LeBailError::Other(format!("group member {} out of range", index)))?;
            if !param.refine {
                continue;
            }
            any_proposed = true;

            let value = current[index];
            let r: f64 = rng.gen_range(-1.0..=1.0);
            let mut step = self.damping * fit.rwp * (value * param.a1 + param.a0) * r;

            if self.walk_style == WalkStyle::Drunken {
                let preferred = f64::from(stats[index].last_direction) * if previous_improved { 1.0 } else { -1.0 };
                let u: f64 = rng.gen();
                if u < AGAINST_THRESHOLD {
                    step = -step.abs() * preferred;
                } else if u >= ALONG_THRESHOLD {
                    step = step.abs() * preferred;
                }
            }

            let mut new_value = value + step;
            if !new_value.is_finite() {
                new_value = value;
            }
            if param.non_negative && new_value < 0.0 {
                new_value = new_value.abs();
            }
            let bounds = param.effective_bounds()?;
            new_value = self.boundary_policy.limit(&bounds, value, new_value, rng);

            stats[index].record(new_value - value, new_value);
            values[index] = new_value;

            debug!(
                "Proposed {} = {:.6e} (from {:.6e}, step {:.4e}, Rwp {:.6})",
                param.name, new_value, value, step, fit.rwp
            );
        }

        Ok(Proposal { values, any_proposed })
    }
}
