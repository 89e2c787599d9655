//! Goodness-of-fit metrics for diffraction patterns.
//!
//! Two R-factors are computed from observed values, calculated values and the
//! uncertainties of the observations:
//!
//! - the weighted profile factor `Rwp = sqrt(Σ w (obs - calc)² / Σ w obs²)` with
//!   `w = 1/σ²` (or 1 when `σ` is essentially zero), and
//! - the profile factor `Rp = Σ |obs - calc| / Σ |obs|`.
//!
//! Lower is better for both.

use crate::error::{LeBailError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uncertainties at or below this are treated as unweighted points.
const MIN_SIGMA: f64 = 1.0e-5;

/// A pair of R-factors describing the agreement between model and data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFit {
    /// Weighted profile R-factor
    pub rwp: f64,

    /// Unweighted profile R-factor
    pub rp: f64,
}

impl GoodnessOfFit {
    /// Sentinel for states that could not be evaluated; worse than any finite fit.
    pub const INVALID: GoodnessOfFit = GoodnessOfFit {
        rwp: f64::MAX,
        rp: f64::MAX,
    };

    pub fn new(rwp: f64, rp: f64) -> Self {
        Self { rwp, rp }
    }

    /// Compute both R-factors
    ///
    /// A non-finite result (for example when every observation is zero) yields
    /// [`GoodnessOfFit::INVALID`].
    ///
    /// # Errors
    ///
    /// Returns [`LeBailError::DimensionMismatch`] if the arrays differ in length.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::goodness::GoodnessOfFit;
    /// use ndarray::array;
    ///
    /// let obs = array![10.0, 20.0];
    /// let calc = array![10.0, 20.0];
    /// let err = array![1.0, 1.0];
    /// let fit = GoodnessOfFit::compute(&obs, &calc, &err).unwrap();
    /// assert_eq!(fit.rwp, 0.0);
    /// assert_eq!(fit.rp, 0.0);
    /// ```
    pub fn compute(observed: &Array1<f64>, calculated: &Array1<f64>, errors: &Array1<f64>) -> Result<Self> {
        if observed.len() != calculated.len() || observed.len() != errors.len() {
            return Err(LeBailError::DimensionMismatch(format!(
                "observed ({}), calculated ({}) and errors ({}) must have the same length",
                observed.len(),
                calculated.len(),
                errors.len()
            )));
        }

        let mut weighted_residual = 0.0;
        let mut weighted_observed = 0.0;
        let mut abs_residual = 0.0;
        let mut abs_observed = 0.0;

        for ((&obs, &calc), &sigma) in observed.iter().zip(calculated.iter()).zip(errors.iter()) {
            let weight = if sigma > MIN_SIGMA { 1.0 / (sigma * sigma) } else { 1.0 };
            let diff = obs - calc;
            weighted_residual += weight * diff * diff;
            weighted_observed += weight * obs * obs;
            abs_residual += diff.abs();
            abs_observed += obs.abs();
        }

        let rwp = (weighted_residual / weighted_observed).sqrt();
        let rp = abs_residual / abs_observed;

        if rwp.is_finite() && rp.is_finite() {
            Ok(Self { rwp, rp })
        } else {
            Ok(Self::INVALID)
        }
    }

    /// Whether this is the invalid sentinel (or at least as bad)
    pub fn is_invalid(&self) -> bool {
        self.rwp >= f64::MAX || !self.rwp.is_finite()
    }

    /// Strictly lower weighted R-factor than `other`
    pub fn is_better_than(&self, other: &GoodnessOfFit) -> bool {
        self.rwp < other.rwp
    }
}

impl Default for GoodnessOfFit {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for GoodnessOfFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Rwp = invalid, Rp = invalid")
        } else {
            write!(f, "Rwp = {:.6}, Rp = {:.6}", self.rwp, self.rp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_weighted_and_unweighted() {
        let obs = array![10.0, 20.0, 30.0];
        let calc = array![11.0, 18.0, 30.0];
        let err = array![1.0, 2.0, 0.0];

        let fit = GoodnessOfFit::compute(&obs, &calc, &err).unwrap();

        // Weights 1, 1/4 and 1 (zero sigma is unweighted)
        let expected_rwp = ((1.0 + 0.25 * 4.0) / (100.0 + 0.25 * 400.0 + 900.0_f64)).sqrt();
        assert_relative_eq!(fit.rwp, expected_rwp, epsilon = 1e-12);
        assert_relative_eq!(fit.rp, 3.0 / 60.0, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let result = GoodnessOfFit::compute(&array![1.0, 2.0], &array![1.0], &array![1.0, 1.0]);
        assert!(matches!(result, Err(LeBailError::DimensionMismatch(_))));
    }

    #[test]
    fn test_all_zero_observations_are_invalid() {
        let fit = GoodnessOfFit::compute(&array![0.0, 0.0], &array![1.0, 1.0], &array![1.0, 1.0]).unwrap();
        assert!(fit.is_invalid());
        assert_eq!(fit, GoodnessOfFit::INVALID);
    }

    #[test]
    fn test_ordering() {
        let good = GoodnessOfFit::new(0.1, 0.2);
        let bad = GoodnessOfFit::new(0.3, 0.1);
        assert!(good.is_better_than(&bad));
        assert!(!bad.is_better_than(&good));
        assert!(bad.is_better_than(&GoodnessOfFit::INVALID));
        assert!(!GoodnessOfFit::INVALID.is_better_than(&GoodnessOfFit::INVALID));
        assert!(format!("{}", good).contains("Rwp = 0.100000"));
        assert!(format!("{}", GoodnessOfFit::INVALID).contains("invalid"));
    }
}
