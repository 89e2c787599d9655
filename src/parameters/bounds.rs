//! Parameter bounds and boundary policies
//!
//! This module provides the bounds attached to every refinable parameter and the
//! policies used to bring a proposed value that stepped outside its bounds back
//! into the allowed interval.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default lower bound when none is configured.
pub const DEFAULT_MIN: f64 = -1.0e10;

/// Default upper bound when none is configured.
pub const DEFAULT_MAX: f64 = 1.0e10;

/// Ranges wider than this are treated as unbounded, so excursions reflect
/// instead of wrapping around.
pub const UNBOUNDED_RANGE: f64 = 1.0e10;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Non-finite parameter value is not allowed")]
    NonFiniteValue,
}

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Bounds", 2)?;

        // JSON has no infinity, so open ends are written as null
        if self.min.is_finite() {
            state.serialize_field("min", &self.min)?;
        } else {
            state.serialize_field("min", &Option::<f64>::None)?;
        }

        if self.max.is_finite() {
            state.serialize_field("max", &self.max)?;
        } else {
            state.serialize_field("max", &Option::<f64>::None)?;
        }

        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<f64>,

            #[serde(default)]
            max: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;

        let min = helper.min.unwrap_or(DEFAULT_MIN);
        let max = helper.max.unwrap_or(DEFAULT_MAX);

        Bounds::new(min, max).map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint with min and max values
    ///
    /// # Arguments
    ///
    /// * `min` - Minimum allowed value for the parameter
    /// * `max` - Maximum allowed value for the parameter
    ///
    /// # Returns
    ///
    /// A new `Bounds` object if min <= max, or an error otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        // `!(min <= max)` also rejects NaN
        if !(min <= max) {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Width of the allowed interval.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Check if a value is within the bounds (inclusive)
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Whether the interval is so wide that it is treated as unbounded.
    pub fn is_effectively_unbounded(&self) -> bool {
        self.width() > UNBOUNDED_RANGE
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Bounds restricted to non-negative values.
    ///
    /// Fails when the whole interval lies below zero.
    pub fn non_negative(&self) -> Result<Self, BoundsError> {
        Bounds::new(self.min.max(0.0), self.max)
    }

    /// Mirror an out-of-bounds value back across the violated bound.
    ///
    /// Overshoots wider than the interval keep folding back and forth, so the
    /// result always lies inside the bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.reflect(12.0), 8.0);
    /// assert_eq!(bounds.reflect(-3.0), 3.0);
    /// ```
    pub fn reflect(&self, value: f64) -> f64 {
        if self.is_within_bounds(value) {
            return value;
        }

        let width = self.width();
        if width <= 0.0 {
            return self.min;
        }

        if !width.is_finite() {
            // Only one side can be violated
            let mirrored = if value > self.max {
                2.0 * self.max - value
            } else {
                2.0 * self.min - value
            };
            return self.clamp(mirrored);
        }

        let period = 2.0 * width;
        let mut offset = (value - self.min).rem_euclid(period);
        if offset > width {
            offset = period - offset;
        }
        self.clamp(self.min + offset)
    }

    /// Wrap an out-of-bounds value periodically, anchored at the opposite bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.wrap(12.0), 2.0);
    /// assert_eq!(bounds.wrap(-3.0), 7.0);
    /// ```
    pub fn wrap(&self, value: f64) -> f64 {
        if self.is_within_bounds(value) {
            return value;
        }

        let width = self.width();
        if width <= 0.0 || !width.is_finite() {
            return self.clamp(value);
        }

        if value > self.max {
            let cycles = (value - self.max) / width;
            self.clamp(self.min + width * (cycles - cycles.floor()))
        } else {
            let cycles = (self.min - value) / width;
            self.clamp(self.max - width * (cycles - cycles.floor()))
        }
    }

    /// Move halfway from `current` toward the bound that `value` violated.
    ///
    /// `current` is expected to lie inside the bounds.
    pub fn halfway(&self, current: f64, value: f64) -> f64 {
        let current = self.clamp(current);
        if value > self.max {
            current + 0.5 * (self.max - current)
        } else if value < self.min {
            self.min + 0.5 * (current - self.min)
        } else {
            value
        }
    }
}

/// Policy applied when a proposed value falls outside its bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Reflect when the range is effectively unbounded, wrap periodically otherwise
    #[default]
    RangeAdaptive,

    /// Always mirror the overshoot back across the violated bound
    Reflective,

    /// Always wrap around to the opposite bound
    Periodic,

    /// Move halfway from the current value toward the violated bound
    HalfDistance,

    /// Toss a coin between `HalfDistance` and `RangeAdaptive` on every excursion
    CoinFlip,
}

impl BoundaryPolicy {
    /// Bring `proposed` back into `bounds`.
    ///
    /// Values already inside the bounds are returned unchanged. The generator is
    /// only consumed by [`BoundaryPolicy::CoinFlip`].
    ///
    /// # Arguments
    ///
    /// * `bounds` - The bounds of the parameter
    /// * `current` - The value the proposal started from
    /// * `proposed` - The proposed value
    /// * `rng` - Random number generator
    pub fn limit<R: Rng>(&self, bounds: &Bounds, current: f64, proposed: f64, rng: &mut R) -> f64 {
        if bounds.is_within_bounds(proposed) {
            return proposed;
        }

        match self {
            BoundaryPolicy::RangeAdaptive => Self::range_adaptive(bounds, proposed),
            BoundaryPolicy::Reflective => bounds.reflect(proposed),
            BoundaryPolicy::Periodic => bounds.wrap(proposed),
            BoundaryPolicy::HalfDistance => bounds.halfway(current, proposed),
            BoundaryPolicy::CoinFlip => {
                if rng.gen::<bool>() {
                    bounds.halfway(current, proposed)
                } else {
                    Self::range_adaptive(bounds, proposed)
                }
            }
        }
    }

    fn range_adaptive(bounds: &Bounds, proposed: f64) -> f64 {
        if bounds.is_effectively_unbounded() {
            bounds.reflect(proposed)
        } else {
            bounds.wrap(proposed)
        }
    }
}
