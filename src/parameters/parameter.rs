//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the fundamental building block of the
//! parameter system. A parameter carries its current value, bounds, the step-control
//! coefficients used by the random walk and flags telling the walk whether (and how)
//! it may move the value.

use crate::parameters::bounds::{Bounds, BoundsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{name}' is defined more than once")]
    DuplicateName { name: String },

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Invalid value {value} for parameter '{name}'")]
    InvalidValue { name: String, value: f64 },
}

fn default_step() -> f64 {
    1.0
}

fn default_refine() -> bool {
    true
}

/// A refinable model parameter
///
/// The step coefficients control the magnitude of random-walk proposals: a proposal
/// for a parameter with value `v` is scaled by `v * a1 + a0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    pub name: String,

    /// Current value of the parameter
    value: f64,

    /// Minimum and maximum bounds for the parameter value
    #[serde(default)]
    bounds: Bounds,

    /// Nominal step size, kept for configuration round trips
    #[serde(default = "default_step")]
    pub step: f64,

    /// Additive step coefficient
    #[serde(default)]
    pub a0: f64,

    /// Multiplicative step coefficient, relative to the current value
    #[serde(default)]
    pub a1: f64,

    /// Proposed values below zero are folded back to their absolute value
    #[serde(default)]
    pub non_negative: bool,

    /// Whether the random walk may move this parameter
    #[serde(default = "default_refine")]
    pub refine: bool,
}

impl Parameter {
    /// Create a new parameter with the given name and value
    ///
    /// The parameter is refined, uses the default bounds `[-1e10, 1e10]`, a step of
    /// 1.0 and zero step coefficients.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::parameters::parameter::Parameter;
    ///
    /// let param = Parameter::new("Dtt1", 2000.0);
    /// assert_eq!(param.name(), "Dtt1");
    /// assert_eq!(param.value(), 2000.0);
    /// assert!(param.refine);
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            bounds: Bounds::default(),
            step: default_step(),
            a0: 0.0,
            a1: 0.0,
            non_negative: false,
            refine: true,
        }
    }

    /// Create a new parameter with the given name, value and bounds
    ///
    /// # Errors
    ///
    /// Returns an error if `min > max` or if `value` lies outside `[min, max]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::parameters::parameter::Parameter;
    ///
    /// let param = Parameter::with_bounds("Sig1", 10.0, 0.0, 100.0).unwrap();
    /// assert_eq!(param.min(), 0.0);
    /// assert_eq!(param.max(), 100.0);
    /// assert!(Parameter::with_bounds("Sig1", 200.0, 0.0, 100.0).is_err());
    /// ```
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let mut param = Self::new(name, value);
        param.bounds = Bounds::new(min, max)?;
        param.validate()?;
        Ok(param)
    }

    /// Set the step coefficients
    pub fn with_step_coefficients(mut self, a0: f64, a1: f64) -> Self {
        self.a0 = a0;
        self.a1 = a1;
        self
    }

    /// Mark the parameter as non-negative
    pub fn with_non_negative(mut self, non_negative: bool) -> Self {
        self.non_negative = non_negative;
        self
    }

    /// Set whether the random walk may move this parameter
    pub fn with_refine(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    /// Set the nominal step size
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter
    ///
    /// # Errors
    ///
    /// Returns an error (and leaves the value unchanged) if the new value is not
    /// finite or lies outside the bounds.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::InvalidValue {
                name: self.name.clone(),
                value,
            });
        }
        if !self.bounds.is_within_bounds(value) {
            return Err(BoundsError::ValueOutsideBounds {
                value,
                min: self.bounds.min,
                max: self.bounds.max,
            }
            .into());
        }
        self.value = value;
        Ok(())
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Replace the bounds, clamping the current value into them
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        let bounds = Bounds::new(min, max)?;
        self.bounds = bounds;
        self.value = bounds.clamp(self.value);
        Ok(())
    }

    /// Bounds used when proposing new values
    ///
    /// A non-negative parameter never goes below zero, so its lower bound is raised
    /// to `max(min, 0)`.
    pub fn effective_bounds(&self) -> Result<Bounds, ParameterError> {
        if self.non_negative {
            Ok(self.bounds.non_negative()?)
        } else {
            Ok(self.bounds)
        }
    }

    /// Check the parameter invariants
    ///
    /// The value must be finite and within the bounds; a non-negative parameter must
    /// have a non-negative value.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !self.value.is_finite() {
            return Err(ParameterError::InvalidValue {
                name: self.name.clone(),
                value: self.value,
            });
        }
        let bounds = self.effective_bounds()?;
        if !bounds.is_within_bounds(self.value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: self.value,
                min: bounds.min,
                max: bounds.max,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::bounds::{DEFAULT_MAX, DEFAULT_MIN};

    #[test]
    fn test_parameter_creation() {
        let param = Parameter::new("Zero", 0.0);
        assert_eq!(param.name(), "Zero");
        assert_eq!(param.value(), 0.0);
        assert_eq!(param.min(), DEFAULT_MIN);
        assert_eq!(param.max(), DEFAULT_MAX);
        assert_eq!(param.step, 1.0);
        assert!(param.refine);
        assert!(!param.non_negative);

        let param = Parameter::with_bounds("Sig0", 5.0, 0.0, 20.0)
            .unwrap()
            .with_step_coefficients(2.0, 0.1)
            .with_non_negative(true)
            .with_refine(false);
        assert_eq!(param.min(), 0.0);
        assert_eq!(param.max(), 20.0);
        assert_eq!(param.a0, 2.0);
        assert_eq!(param.a1, 0.1);
        assert!(param.non_negative);
        assert!(!param.refine);
    }

    #[test]
    fn test_parameter_value() {
        let mut param = Parameter::with_bounds("Dtt1", 10.0, 0.0, 20.0).unwrap();

        param.set_value(15.0).unwrap();
        assert_eq!(param.value(), 15.0);

        assert!(param.set_value(25.0).is_err());
        assert_eq!(param.value(), 15.0);

        assert!(param.set_value(f64::NAN).is_err());
        assert_eq!(param.value(), 15.0);
    }

    #[test]
    fn test_parameter_bounds() {
        let mut param = Parameter::new("Sig2", 50.0);
        param.set_bounds(0.0, 10.0).unwrap();
        assert_eq!(param.value(), 10.0);

        assert!(param.set_bounds(5.0, 1.0).is_err());
        assert_eq!(param.min(), 0.0);
    }

    #[test]
    fn test_effective_bounds() {
        let param = Parameter::with_bounds("Sig1", 1.0, -5.0, 5.0).unwrap();
        assert_eq!(param.effective_bounds().unwrap().min, -5.0);

        let param = param.with_non_negative(true);
        let bounds = param.effective_bounds().unwrap();
        assert_eq!(bounds.min, 0.0);
        assert_eq!(bounds.max, 5.0);
    }

    #[test]
    fn test_validate() {
        let param = Parameter::with_bounds("Sig1", -1.0, -5.0, 5.0)
            .unwrap()
            .with_non_negative(true);
        assert!(param.validate().is_err());

        let param = Parameter::with_bounds("Sig1", -1.0, -5.0, -2.0);
        assert!(param.is_err());
    }

    #[test]
    fn test_parameter_serialization() {
        let param = Parameter::with_bounds("Alph0", 1.5, 0.0, 10.0)
            .unwrap()
            .with_step_coefficients(0.5, 0.0);
        let json = serde_json::to_string(&param).unwrap();
        let restored: Parameter = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, param);

        // Omitted fields fall back to their defaults
        let restored: Parameter = serde_json::from_str(r#"{"name": "Beta0", "value": 2.0}"#).unwrap();
        assert_eq!(restored.value(), 2.0);
        assert_eq!(restored.step, 1.0);
        assert!(restored.refine);
        assert_eq!(restored.min(), DEFAULT_MIN);
    }
}
