//! Run-mode dispatch of a Le Bail refinement.
//!
//! [`LeBailFit`] crops the observed pattern to the fit region and runs one of the
//! engines of [`crate::refine`] according to its [`RunMode`].

use crate::data::PatternData;
use crate::error::{LeBailError, Result};
use crate::model::ModelEvaluator;
use crate::models::Background;
use crate::parameters::ParameterSet;
use crate::refine::background::{BackgroundRefineResult, BackgroundRefinement};
use crate::refine::config::{BackgroundRefineConfig, RandomWalkConfig};
use crate::refine::pattern::{CalculatedPattern, PatternCalculator};
use crate::refine::random_walk::{RandomWalk, RandomWalkResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Calculate the pattern of the given parameters
    Calculation,

    /// Refine profile parameters
    #[default]
    Fit,

    /// Refine profile parameters; same engine as `Fit`
    MonteCarlo,

    /// Refine background coefficients with the profile fixed
    RefineBackground,
}

impl FromStr for RunMode {
    type Err = LeBailError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
        match key.to_ascii_lowercase().as_str() {
            "calculation" | "calculate" => Ok(RunMode::Calculation),
            "fit" | "lebailfit" => Ok(RunMode::Fit),
            "montecarlo" => Ok(RunMode::MonteCarlo),
            "refinebackground" | "calculatebackground" => Ok(RunMode::RefineBackground),
            _ => Err(LeBailError::UnknownRunMode(s.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Calculation => "calculation",
            RunMode::Fit => "fit",
            RunMode::MonteCarlo => "monte carlo",
            RunMode::RefineBackground => "background refinement",
        };
        f.write_str(name)
    }
}

/// Configuration of a Le Bail run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeBailConfig {
    /// Default: fit
    pub mode: RunMode,

    /// Inclusive x range to refine over; `None` uses the whole pattern
    pub fit_region: Option<(f64, f64)>,

    pub random_walk: RandomWalkConfig,

    pub background: BackgroundRefineConfig,
}

impl LeBailConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Outcome of a run, by the mode that actually ran
#[derive(Debug, Clone)]
pub enum LeBailOutcome {
    Calculated(CalculatedPattern),
    Refined(RandomWalkResult),
    BackgroundRefined(BackgroundRefineResult),
}

impl LeBailOutcome {
    /// Pattern of the reported state
    pub fn pattern(&self) -> &CalculatedPattern {
        match self {
            LeBailOutcome::Calculated(pattern) => pattern,
            LeBailOutcome::Refined(result) => &result.pattern,
            LeBailOutcome::BackgroundRefined(result) => &result.pattern,
        }
    }
}

/// Le Bail refinement of a peak model against one observed pattern.
///
/// # Examples
///
/// ```
/// use lebail_rs::lebail::{LeBailConfig, LeBailFit, LeBailOutcome, RunMode};
/// use lebail_rs::models::{Background, GaussianPeakPattern};
/// use lebail_rs::parameters::ParameterSet;
/// use lebail_rs::data::PatternData;
/// use ndarray::Array1;
///
/// let mut params = ParameterSet::new();
/// for (name, value) in [("Dtt1", 2000.0), ("Zero", 0.0), ("Sig0", 100.0), ("Sig1", 400.0), ("Sig2", 0.0)] {
///     params.add_param(name, value).unwrap();
/// }
/// let x = Array1::linspace(2500.0, 3500.0, 201);
/// let data = PatternData::with_poisson_errors(x, Array1::from_elem(201, 10.0)).unwrap();
///
/// let config = LeBailConfig { mode: RunMode::Calculation, ..Default::default() };
/// let fit = LeBailFit::new(GaussianPeakPattern::new(vec![1.5]), config);
/// let outcome = fit.run(&params, &data, &Background::polynomial(vec![10.0])).unwrap();
/// assert!(matches!(outcome, LeBailOutcome::Calculated(_)));
/// ```
#[derive(Debug, Clone)]
pub struct LeBailFit<M> {
    model: M,
    config: LeBailConfig,
}

impl<M: ModelEvaluator> LeBailFit<M> {
    pub fn new(model: M, config: LeBailConfig) -> Self {
        Self { model, config }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &LeBailConfig {
        &self.config
    }

    /// Run the configured mode
    ///
    /// A refining mode whose starting parameters are unphysical falls back to
    /// calculation and returns [`LeBailOutcome::Calculated`].
    pub fn run(&self, params: &ParameterSet, data: &PatternData, background: &Background) -> Result<LeBailOutcome> {
        let data = match self.config.fit_region {
            Some((x_min, x_max)) => data.crop(x_min, x_max)?,
            None => data.clone(),
        };
        info!("Le Bail {} over {} points", self.config.mode, data.len());

        let mut mode = self.config.mode;
        if matches!(mode, RunMode::Fit | RunMode::MonteCarlo) && !self.is_physical(params, &data, background)? {
            warn!(
                "Starting profile parameters are unphysical; running calculation instead of {}",
                mode
            );
            mode = RunMode::Calculation;
        }

        match mode {
            RunMode::Calculation => Ok(LeBailOutcome::Calculated(self.calculate(params, &data, background)?)),
            RunMode::Fit | RunMode::MonteCarlo => {
                Ok(LeBailOutcome::Refined(self.refine_profile(params, &data, background)?))
            }
            RunMode::RefineBackground => Ok(LeBailOutcome::BackgroundRefined(
                BackgroundRefinement::new(&self.model, self.config.background.clone()).run(params, &data, background)?,
            )),
        }
    }

    /// Pattern of the given parameters and background
    pub fn calculate(&self, params: &ParameterSet, data: &PatternData, background: &Background) -> Result<CalculatedPattern> {
        let calculator = PatternCalculator::new(&self.model, data, background.eval(data.x()))?;
        let pattern = calculator.pattern(params, &params.values())?;
        if pattern.valid {
            info!("Calculated pattern: {}", pattern.fit);
        } else {
            warn!("Profile parameters are unphysical; calculated peaks are zero");
        }
        Ok(pattern)
    }

    /// Random-walk refinement of the profile parameters
    pub fn refine_profile(
        &self,
        params: &ParameterSet,
        data: &PatternData,
        background: &Background,
    ) -> Result<RandomWalkResult> {
        RandomWalk::new(&self.model, self.config.random_walk.clone()).run(params, data, background)
    }

    fn is_physical(&self, params: &ParameterSet, data: &PatternData, background: &Background) -> Result<bool> {
        if let Some(missing) = self.model.parameter_names().into_iter().find(|name| !params.contains(name)) {
            return Err(LeBailError::ParameterNotFound(missing));
        }
        let calculator = PatternCalculator::new(&self.model, data, background.eval(data.x()))?;
        let values = params.values();
        Ok(calculator.is_valid(params, &values) && calculator.score(params, &values)?.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_names() {
        assert_eq!("Calculation".parse::<RunMode>().unwrap(), RunMode::Calculation);
        assert_eq!("LeBailFit".parse::<RunMode>().unwrap(), RunMode::Fit);
        assert_eq!("MonteCarlo".parse::<RunMode>().unwrap(), RunMode::MonteCarlo);
        assert_eq!("Refine Background".parse::<RunMode>().unwrap(), RunMode::RefineBackground);
        assert_eq!("CalculateBackground".parse::<RunMode>().unwrap(), RunMode::RefineBackground);
        assert!(matches!("Simplex".parse::<RunMode>(), Err(LeBailError::UnknownRunMode(_))));
    }

    #[test]
    fn test_partial_config_json() {
        let config = LeBailConfig::from_json(r#"{"mode": "monte_carlo", "random_walk": {"max_cycles": 5}}"#).unwrap();
        assert_eq!(config.mode, RunMode::MonteCarlo);
        assert_eq!(config.random_walk.max_cycles, 5);
        assert_eq!(config.random_walk.damping, 1.0);
        assert_eq!(config.fit_region, None);

        let back = LeBailConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
