//! Monte Carlo refinement of background coefficients.
//!
//! The profile parameters stay fixed. Each step perturbs a single coefficient,
//! chosen round-robin, by `step[i] * r` with `r` uniform in `[-1, 1]`; the step
//! scale shrinks by `step_decay` from one coefficient to the next because higher
//! order terms need much finer moves. Proposals go through the same acceptance
//! test as the profile random walk, and the best coefficients are restored at the
//! end.

use crate::data::PatternData;
use crate::error::{LeBailError, Result};
use crate::goodness::GoodnessOfFit;
use crate::model::ModelEvaluator;
use crate::models::Background;
use crate::parameters::ParameterSet;
use crate::refine::acceptance::accept;
use crate::refine::config::BackgroundRefineConfig;
use crate::refine::pattern::{CalculatedPattern, PatternCalculator};
use crate::refine::trace::FitTrace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use tracing::{debug, info};

/// Step scales of `count` coefficients, each `decay` times the previous
///
/// # Examples
///
/// ```
/// use lebail_rs::refine::background::step_sizes;
///
/// let steps = step_sizes(3, 0.01, 1e-4);
/// assert_eq!(steps.len(), 3);
/// assert!((steps[1] - 1e-6).abs() < 1e-18);
/// ```
pub fn step_sizes(count: usize, initial: f64, decay: f64) -> Vec<f64> {
    let mut steps = Vec::with_capacity(count);
    let mut step = initial;
    for _ in 0..count {
        steps.push(step);
        step *= decay;
    }
    steps
}

/// Result of a background refinement
#[derive(Debug, Clone)]
pub struct BackgroundRefineResult {
    /// Background holding the best coefficients
    pub background: Background,

    pub start_fit: GoodnessOfFit,
    pub best_fit: GoodnessOfFit,

    /// Fit of the last accepted coefficients
    pub final_fit: GoodnessOfFit,

    /// Step in which the best coefficients were found; 0 is the start
    pub best_step: usize,

    pub steps: usize,
    pub accepted_moves: usize,

    /// Step scale of each coefficient
    pub step_sizes: Vec<f64>,

    pub trace: FitTrace,

    /// Pattern with the best background
    pub pattern: CalculatedPattern,
}

impl fmt::Display for BackgroundRefineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Background Refinement Result:")?;
        writeln!(f, "  Steps: {}", self.steps)?;
        writeln!(f, "  Accepted: {}", self.accepted_moves)?;
        writeln!(f, "  Best step: {}", self.best_step)?;
        writeln!(f, "  Starting: {}", self.start_fit)?;
        writeln!(f, "  Best:     {}", self.best_fit)?;
        for (name, value) in self
            .background
            .parameter_names()
            .iter()
            .zip(self.background.coefficients())
        {
            writeln!(f, "    {:<4} = {:.6e}", name, value)?;
        }
        Ok(())
    }
}

/// Refines background coefficients with fixed profile parameters.
#[derive(Debug, Clone)]
pub struct BackgroundRefinement<'a, M> {
    model: &'a M,
    config: BackgroundRefineConfig,
}

impl<'a, M: ModelEvaluator> BackgroundRefinement<'a, M> {
    pub fn new(model: &'a M, config: BackgroundRefineConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &BackgroundRefineConfig {
        &self.config
    }

    /// Run with a generator seeded from the configuration
    pub fn run(&self, params: &ParameterSet, data: &PatternData, background: &Background) -> Result<BackgroundRefineResult> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_seed);
        self.run_with_rng(params, data, background, &mut rng)
    }

    /// Run drawing from the given generator
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the background has no coefficients.
    pub fn run_with_rng<R: Rng>(
        &self,
        params: &ParameterSet,
        data: &PatternData,
        background: &Background,
        rng: &mut R,
    ) -> Result<BackgroundRefineResult> {
        self.config.validate()?;
        let count = background.coefficients().len();
        if count == 0 {
            return Err(LeBailError::InvalidConfig("background has no coefficients".to_string()));
        }

        let steps = step_sizes(count, self.config.initial_step, self.config.step_decay);
        let values = params.values();
        let temperature = self.config.temperature.abs();

        let mut current = background.coefficients().to_vec();
        let mut current_fit = self.score(params, data, background, &current)?;
        let start_fit = current_fit;
        let mut best = current.clone();
        let mut best_fit = current_fit;
        let mut best_step = 0;
        let mut accepted_moves = 0;

        info!("Background refinement starting {}, coefficients {:?}", start_fit, current);

        let mut trace = FitTrace::with_capacity(self.config.steps + 1);
        trace.record(0, current_fit, best_fit);

        for step in 1..=self.config.steps {
            let index = (step - 1) % count;
            let r: f64 = rng.gen_range(-1.0..=1.0);
            let mut proposed = current.clone();
            proposed[index] += r * steps[index];

            let fit = self.score(params, data, background, &proposed)?;
            debug!("Background A{} -> {:.6e}: {}", index, proposed[index], fit);

            if accept(&current_fit, &fit, temperature, rng) {
                current = proposed;
                current_fit = fit;
                accepted_moves += 1;
                if current_fit.is_better_than(&best_fit) {
                    best.copy_from_slice(&current);
                    best_fit = current_fit;
                    best_step = step;
                    debug!("New best background at step {}: {:?}", step, best);
                }
            }
            trace.record(step, current_fit, best_fit);
        }

        let mut refined = background.clone();
        refined.set_coefficients(&best)?;
        let calculator = PatternCalculator::new(self.model, data, refined.eval(data.x()))?;
        let pattern = calculator.pattern(params, &values)?;

        info!(
            "Background refinement finished: best step {}, {} of {} accepted, best {}, coefficients {:?}",
            best_step, accepted_moves, self.config.steps, best_fit, best
        );

        Ok(BackgroundRefineResult {
            background: refined,
            start_fit,
            best_fit,
            final_fit: current_fit,
            best_step,
            steps: self.config.steps,
            accepted_moves,
            step_sizes: steps,
            trace,
            pattern,
        })
    }

    fn score(
        &self,
        params: &ParameterSet,
        data: &PatternData,
        background: &Background,
        coefficients: &[f64],
    ) -> Result<GoodnessOfFit> {
        let values = background.eval_with(coefficients, data.x());
        let calculator = PatternCalculator::new(self.model, data, values)?;
        Ok(calculator.score(params, &params.values())?.fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Evaluation;
    use crate::parameters::ParameterView;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    /// No peaks at all: the fit depends on the background only
    struct NoPeaks;

    impl ModelEvaluator for NoPeaks {
        fn is_valid(&self, _params: &ParameterView) -> bool {
            true
        }

        fn evaluate(&self, _params: &ParameterView, x: &Array1<f64>, _signal: &Array1<f64>) -> Result<Evaluation> {
            Ok(Evaluation::valid(Array1::zeros(x.len())))
        }
    }

    #[test]
    fn test_step_sizes() {
        let steps = step_sizes(3, 0.01, 1e-4);
        assert_relative_eq!(steps[0], 0.01);
        assert_relative_eq!(steps[1], steps[0] * 1e-4);
        assert_relative_eq!(steps[2], steps[1] * 1e-4);
        assert!(step_sizes(0, 0.01, 1e-4).is_empty());
    }

    #[test]
    fn test_constant_background_improves() {
        let x = Array1::linspace(0.0, 10.0, 50);
        let data = PatternData::new(x, Array1::from_elem(50, 10.0), Array1::ones(50)).unwrap();
        let config = BackgroundRefineConfig {
            steps: 300,
            initial_step: 1.0,
            ..Default::default()
        };

        let result = BackgroundRefinement::new(&NoPeaks, config)
            .run(&ParameterSet::new(), &data, &Background::polynomial(vec![9.0]))
            .unwrap();

        assert_relative_eq!(result.start_fit.rwp, 0.1, epsilon = 1e-12);
        assert!(result.best_fit.rwp < result.start_fit.rwp);
        assert!((result.background.coefficients()[0] - 10.0).abs() < 0.5);
        assert_eq!(result.trace.len(), 301);
        assert!(result.best_step > 0);
        assert_relative_eq!(result.pattern.fit.rwp, result.best_fit.rwp, epsilon = 1e-12);
    }

    #[test]
    fn test_round_robin_keeps_coefficient_count() {
        let x = Array1::linspace(0.0, 1.0, 10);
        let data = PatternData::new(x, Array1::from_elem(10, 2.0), Array1::ones(10)).unwrap();
        let result = BackgroundRefinement::new(&NoPeaks, BackgroundRefineConfig::default())
            .run(&ParameterSet::new(), &data, &Background::chebyshev(vec![1.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(result.background.coefficients().len(), 3);
        assert_eq!(result.step_sizes.len(), 3);
        assert!(result.best_fit.rwp <= result.start_fit.rwp);
    }

    #[test]
    fn test_empty_background_rejected() {
        let x = Array1::linspace(0.0, 1.0, 10);
        let data = PatternData::new(x, Array1::ones(10), Array1::ones(10)).unwrap();
        let result = BackgroundRefinement::new(&NoPeaks, BackgroundRefineConfig::default()).run(
            &ParameterSet::new(),
            &data,
            &Background::polynomial(vec![]),
        );
        assert!(result.is_err());
    }
}
