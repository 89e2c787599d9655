//! Configuration options for random-walk and background refinement.

use crate::error::{LeBailError, Result};
use crate::parameters::{BoundaryPolicy, GroupSetupEntry};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Direction policy for random-walk proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkStyle {
    /// Steps take the sign of the random draw
    #[default]
    Random,

    /// Steps are biased toward the direction that last improved the fit
    Drunken,
}

impl FromStr for WalkStyle {
    type Err = LeBailError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
        match key.to_ascii_lowercase().as_str() {
            "random" | "randomwalk" => Ok(WalkStyle::Random),
            "drunken" | "drunkenwalk" => Ok(WalkStyle::Drunken),
            _ => Err(LeBailError::UnknownWalkStyle(s.to_string())),
        }
    }
}

/// Where parameter groups come from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStrategy {
    /// Built-in grouping of time-of-flight profile parameters
    #[default]
    BuiltIn,

    /// Explicit setup table
    Table(Vec<GroupSetupEntry>),
}

/// Configuration options for the random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkConfig {
    /// Number of cycles; every cycle visits every group once. Default: 100
    pub max_cycles: usize,

    /// Scale of proposal steps. Default: 1.0
    pub damping: f64,

    /// Default: random
    pub walk_style: WalkStyle,

    /// Initial annealing temperature; the sign is ignored. Default: 1.0
    pub temperature: f64,

    /// Adapt the temperature to the acceptance rate. Default: true
    pub use_annealing: bool,

    /// Number of evaluated proposals per temperature adjustment. Default: 10
    pub annealing_window: usize,

    /// Seed of the run's random number generator. Default: 1
    pub random_seed: u64,

    /// Default: range adaptive
    pub boundary_policy: BoundaryPolicy,

    /// Default: built-in grouping
    pub groups: GroupStrategy,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            max_cycles: 100,
            damping: 1.0,
            walk_style: WalkStyle::Random,
            temperature: 1.0,
            use_annealing: true,
            annealing_window: 10,
            random_seed: 1,
            boundary_policy: BoundaryPolicy::default(),
            groups: GroupStrategy::BuiltIn,
        }
    }
}

impl RandomWalkConfig {
    /// Check that the configuration describes a runnable walk
    ///
    /// # Errors
    ///
    /// Returns [`LeBailError::InvalidConfig`] for zero cycles, a negative or
    /// non-finite damping factor, a zero or non-finite temperature, or an empty
    /// annealing window.
    pub fn validate(&self) -> Result<()> {
        if self.max_cycles == 0 {
            return Err(LeBailError::InvalidConfig(
                "max_cycles must be positive".to_string(),
            ));
        }
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(LeBailError::InvalidConfig(format!(
                "damping must be a non-negative number, got {}",
                self.damping
            )));
        }
        if !self.temperature.is_finite() || self.temperature == 0.0 {
            return Err(LeBailError::InvalidConfig(format!(
                "temperature must be finite and non-zero, got {}",
                self.temperature
            )));
        }
        if self.annealing_window == 0 {
            return Err(LeBailError::InvalidConfig(
                "annealing_window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a configuration from JSON; omitted fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Configuration options for background refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundRefineConfig {
    /// Number of steps; each perturbs one coefficient. Default: 100
    pub steps: usize,

    /// Step scale of the constant coefficient. Default: 0.01
    pub initial_step: f64,

    /// Ratio between the step scales of consecutive coefficients. Default: 1e-4
    pub step_decay: f64,

    /// Annealing temperature used by the acceptance test. Default: 1.0
    pub temperature: f64,

    /// Default: 1
    pub random_seed: u64,
}

impl Default for BackgroundRefineConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            initial_step: 0.01,
            step_decay: 1.0e-4,
            temperature: 1.0,
            random_seed: 1,
        }
    }
}

impl BackgroundRefineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(LeBailError::InvalidConfig("steps must be positive".to_string()));
        }
        if !self.initial_step.is_finite() || self.initial_step <= 0.0 {
            return Err(LeBailError::InvalidConfig(format!(
                "initial_step must be positive, got {}",
                self.initial_step
            )));
        }
        if !self.step_decay.is_finite() || self.step_decay <= 0.0 {
            return Err(LeBailError::InvalidConfig(format!(
                "step_decay must be positive, got {}",
                self.step_decay
            )));
        }
        if !self.temperature.is_finite() || self.temperature == 0.0 {
            return Err(LeBailError::InvalidConfig(format!(
                "temperature must be finite and non-zero, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
