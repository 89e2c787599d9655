//! Monte Carlo random-walk refinement.
//!
//! A run goes through three phases:
//!
//! 1. **Initializing**: groups are set up, the starting snapshot is checked for
//!    physical validity (an unphysical start is fatal) and scored.
//! 2. **Cycling**: every cycle visits every group once. Each visit proposes new
//!    values for the group, scores them and applies the acceptance test; the
//!    annealer sees every evaluated proposal. The best snapshot so far is kept.
//! 3. **Finalizing**: the best snapshot is written back into the parameters and its
//!    pattern is recomputed for reporting.
//!
//! There is no convergence test; a run always performs exactly `max_cycles` cycles.

use crate::data::PatternData;
use crate::error::{LeBailError, Result};
use crate::goodness::GoodnessOfFit;
use crate::model::ModelEvaluator;
use crate::models::Background;
use crate::parameters::{MoveStatistics, ParameterGroups, ParameterSet};
use crate::refine::acceptance::{accept, Annealer};
use crate::refine::config::{GroupStrategy, RandomWalkConfig};
use crate::refine::pattern::{CalculatedPattern, PatternCalculator};
use crate::refine::proposal::ProposalEngine;
use crate::refine::trace::FitTrace;
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use tracing::{debug, info};

/// Movement statistics of one refined parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSummary {
    pub name: String,
    pub statistics: MoveStatistics,
}

/// Result of a random-walk refinement
#[derive(Debug, Clone)]
pub struct RandomWalkResult {
    /// Parameters holding the best snapshot, with the step coefficients used
    pub parameters: ParameterSet,

    /// Fit of the starting snapshot
    pub start_fit: GoodnessOfFit,

    /// Fit of the best snapshot
    pub best_fit: GoodnessOfFit,

    /// Fit of the last accepted snapshot
    pub final_fit: GoodnessOfFit,

    /// Cycle in which the best snapshot was found; 0 is the start
    pub best_cycle: usize,

    /// Number of cycles run
    pub cycles: usize,

    /// Proposals that were scored
    pub evaluated_moves: usize,

    /// Proposals that were accepted
    pub accepted_moves: usize,

    /// Proposals rejected because the model reported them unphysical
    pub invalid_moves: usize,

    /// Temperature at the end of the run
    pub final_temperature: f64,

    /// Statistics of every refined group member, in parameter order
    pub summaries: Vec<ParameterSummary>,

    pub trace: FitTrace,

    /// Pattern of the best snapshot
    pub pattern: CalculatedPattern,
}

impl RandomWalkResult {
    /// Accepted share of the evaluated proposals
    pub fn acceptance_ratio(&self) -> f64 {
        if self.evaluated_moves == 0 {
            0.0
        } else {
            self.accepted_moves as f64 / self.evaluated_moves as f64
        }
    }

    /// Best value of a parameter
    pub fn value(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).map(|p| p.value())
    }
}

impl fmt::Display for RandomWalkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Random Walk Result:")?;
        writeln!(f, "  Cycles: {}", self.cycles)?;
        writeln!(f, "  Best cycle: {}", self.best_cycle)?;
        writeln!(
            f,
            "  Acceptance: {} of {} ({:.3})",
            self.accepted_moves,
            self.evaluated_moves,
            self.acceptance_ratio()
        )?;
        writeln!(f, "  Invalid moves: {}", self.invalid_moves)?;
        writeln!(f, "  Final temperature: {:.4e}", self.final_temperature)?;
        writeln!(f, "  Starting: {}", self.start_fit)?;
        writeln!(f, "  Best:     {}", self.best_fit)?;
        writeln!(f, "  Ending:   {}", self.final_fit)?;
        writeln!(f, "  Parameters:")?;
        for param in self.parameters.iter() {
            writeln!(f, "    {:<10} = {:.6e}", param.name, param.value())?;
        }
        if !self.summaries.is_empty() {
            writeln!(f, "  Moves:")?;
            for summary in &self.summaries {
                let stats = &summary.statistics;
                write!(
                    f,
                    "    {:<10}: mean step {:.4e}, max step {:.4e}, +{} / -{} / 0 {}",
                    summary.name,
                    stats.mean_abs_step(),
                    stats.max_abs_step,
                    stats.positive_moves,
                    stats.negative_moves,
                    stats.no_moves
                )?;
                if let Some((lo, hi)) = stats.value_range() {
                    write!(f, ", tried [{:.6e}, {:.6e}]", lo, hi)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Working set of a run
struct RunState {
    current: Array1<f64>,
    current_fit: GoodnessOfFit,
    best: Array1<f64>,
    best_fit: GoodnessOfFit,
    best_cycle: usize,
    start_fit: GoodnessOfFit,
    annealer: Annealer,
    statistics: Vec<MoveStatistics>,
    previous_improved: bool,
    evaluated: usize,
    accepted: usize,
    invalid: usize,
    trace: FitTrace,
}

/// Random-walk refinement of a model's profile parameters.
///
/// # Examples
///
/// ```no_run
/// use lebail_rs::data::PatternData;
/// use lebail_rs::models::{Background, GaussianPeakPattern};
/// use lebail_rs::parameters::ParameterSet;
/// use lebail_rs::refine::{RandomWalk, RandomWalkConfig};
///
/// # fn main() -> lebail_rs::Result<()> {
/// let data: PatternData = unimplemented!();
/// let params = ParameterSet::load_json("profile.json")?;
/// let model = GaussianPeakPattern::new(vec![1.0, 1.5, 2.2]);
///
/// let config = RandomWalkConfig { max_cycles: 500, ..Default::default() };
/// let result = RandomWalk::new(&model, config).run(&params, &data, &Background::default())?;
/// println!("{}", result);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RandomWalk<'a, M> {
    model: &'a M,
    config: RandomWalkConfig,
}

impl<'a, M: ModelEvaluator> RandomWalk<'a, M> {
    pub fn new(model: &'a M, config: RandomWalkConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &RandomWalkConfig {
        &self.config
    }

    /// Run the refinement with a generator seeded from the configuration
    ///
    /// # Errors
    ///
    /// Fails without partial results if the configuration is invalid, a group
    /// names an unknown parameter, a parameter the model needs is missing, or the
    /// starting parameters are unphysical.
    pub fn run(&self, params: &ParameterSet, data: &PatternData, background: &Background) -> Result<RandomWalkResult> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_seed);
        self.run_with_rng(params, data, background, &mut rng)
    }

    /// Run the refinement drawing from the given generator
    pub fn run_with_rng<R: Rng>(
        &self,
        params: &ParameterSet,
        data: &PatternData,
        background: &Background,
        rng: &mut R,
    ) -> Result<RandomWalkResult> {
        self.config.validate()?;

        let mut params = params.clone();
        let groups = match &self.config.groups {
            GroupStrategy::BuiltIn => ParameterGroups::builtin(&mut params)?,
            GroupStrategy::Table(entries) => ParameterGroups::from_setup(entries, &mut params)?,
        };
        for name in self.model.parameter_names() {
            if !params.contains(&name) {
                return Err(LeBailError::ParameterNotFound(name));
            }
        }

        let calculator = PatternCalculator::new(self.model, data, background.eval(data.x()))?;
        let mut state = self.initialize(&params, &calculator)?;

        let engine = ProposalEngine::new(self.config.damping, self.config.walk_style, self.config.boundary_policy);
        for cycle in 1..=self.config.max_cycles {
            self.cycle(cycle, &params, &groups, &engine, &calculator, &mut state, rng)?;
        }

        self.finalize(params, &groups, &calculator, state)
    }

    fn initialize(&self, params: &ParameterSet, calculator: &PatternCalculator<'_, M>) -> Result<RunState> {
        for param in params.iter() {
            param.validate()?;
        }

        let start = params.values();
        if !calculator.is_valid(params, &start) {
            return Err(LeBailError::UnphysicalStart(
                "starting profile parameters generate peaks with unphysical parameter values".to_string(),
            ));
        }
        let score = calculator.score(params, &start)?;
        if !score.valid {
            return Err(LeBailError::UnphysicalStart(
                "starting profile parameters generate peaks with unphysical intensities".to_string(),
            ));
        }

        info!("Random walk starting {}", score.fit);

        let mut trace = FitTrace::with_capacity(self.config.max_cycles + 1);
        trace.record(0, score.fit, score.fit);

        Ok(RunState {
            best: start.clone(),
            current: start,
            current_fit: score.fit,
            best_fit: score.fit,
            best_cycle: 0,
            start_fit: score.fit,
            annealer: Annealer::new(
                self.config.temperature,
                self.config.annealing_window,
                self.config.use_annealing,
            ),
            statistics: vec![MoveStatistics::new(); params.len()],
            previous_improved: true,
            evaluated: 0,
            accepted: 0,
            invalid: 0,
            trace,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn cycle<R: Rng>(
        &self,
        cycle: usize,
        params: &ParameterSet,
        groups: &ParameterGroups,
        engine: &ProposalEngine,
        calculator: &PatternCalculator<'_, M>,
        state: &mut RunState,
        rng: &mut R,
    ) -> Result<()> {
        for group in groups.iter() {
            let proposal = engine.propose(
                group,
                params,
                &state.current,
                &state.current_fit,
                &mut state.statistics,
                state.previous_improved,
                rng,
            )?;
            if !proposal.any_proposed {
                continue;
            }

            let score = calculator.score(params, &proposal.values)?;
            state.evaluated += 1;

            let accepted = if score.valid {
                state.previous_improved = score.fit.is_better_than(&state.current_fit);
                accept(&state.current_fit, &score.fit, state.annealer.temperature(), rng)
            } else {
                state.invalid += 1;
                state.previous_improved = false;
                false
            };

            debug!(
                "Cycle {} group {}: {} accepted = {}",
                cycle, group.id, score.fit, accepted
            );

            if accepted {
                state.current = proposal.values;
                state.current_fit = score.fit;
                state.accepted += 1;

                if state.current_fit.is_better_than(&state.best_fit) {
                    state.best.assign(&state.current);
                    state.best_fit = state.current_fit;
                    state.best_cycle = cycle;
                    debug!("New best at cycle {}: {}", cycle, state.best_fit);
                }
            }

            state.annealer.record(accepted);
        }

        state.trace.record(cycle, state.current_fit, state.best_fit);
        if cycle % 10 == 0 {
            debug!(
                "Random walk cycle {}/{}: current {}, best {}",
                cycle, self.config.max_cycles, state.current_fit, state.best_fit
            );
        }
        Ok(())
    }

    fn finalize(
        &self,
        mut params: ParameterSet,
        groups: &ParameterGroups,
        calculator: &PatternCalculator<'_, M>,
        state: RunState,
    ) -> Result<RandomWalkResult> {
        params.apply(&state.best)?;
        let pattern = calculator.pattern(&params, &state.best)?;

        let mut members: Vec<usize> = groups.iter().flat_map(|g| g.members.iter().copied()).collect();
        members.sort_unstable();
        members.dedup();
        let summaries: Vec<ParameterSummary> = members
            .into_iter()
            .filter_map(|i| {
                let param = params.at(i)?;
                param.refine.then(|| ParameterSummary {
                    name: param.name.clone(),
                    statistics: state.statistics[i].clone(),
                })
            })
            .collect();

        let acceptance = if state.evaluated == 0 {
            0.0
        } else {
            state.accepted as f64 / state.evaluated as f64
        };
        info!(
            "Random walk finished: best cycle {}, acceptance ratio {:.3}, invalid moves {}",
            state.best_cycle, acceptance, state.invalid
        );
        info!("Rwp: starting {:.6}, best {:.6}, ending {:.6}", state.start_fit.rwp, state.best_fit.rwp, state.current_fit.rwp);
        info!("Rp : starting {:.6}, best {:.6}, ending {:.6}", state.start_fit.rp, state.best_fit.rp, state.current_fit.rp);
        for summary in &summaries {
            let stats = &summary.statistics;
            info!(
                "{:>10}: mean step {:.4e}, max step {:.4e}, moves +{} -{} 0 {}, tried {:?}",
                summary.name,
                stats.mean_abs_step(),
                stats.max_abs_step,
                stats.positive_moves,
                stats.negative_moves,
                stats.no_moves,
                stats.value_range()
            );
        }

        Ok(RandomWalkResult {
            parameters: params,
            start_fit: state.start_fit,
            best_fit: state.best_fit,
            final_fit: state.current_fit,
            best_cycle: state.best_cycle,
            cycles: self.config.max_cycles,
            evaluated_moves: state.evaluated,
            accepted_moves: state.accepted,
            invalid_moves: state.invalid,
            final_temperature: state.annealer.temperature(),
            summaries,
            trace: state.trace,
            pattern,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Evaluation;
    use crate::parameters::{GroupSetupEntry, Parameter, ParameterView};
    use crate::refine::config::WalkStyle;

    /// Peak-only values `1 + (p - 3)` over a flat signal of ones, so Rwp = |p - 3|
    struct Offset;

    impl ModelEvaluator for Offset {
        fn parameter_names(&self) -> Vec<String> {
            vec!["p".to_string()]
        }

        fn is_valid(&self, params: &ParameterView) -> bool {
            params.get("p").map_or(false, |p| p < 9.0)
        }

        fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, _signal: &Array1<f64>) -> Result<Evaluation> {
            let p = params.value("p")?;
            Ok(Evaluation::valid(Array1::from_elem(x.len(), 1.0 + (p - 3.0))))
        }
    }

    fn flat_data() -> PatternData {
        let x = Array1::linspace(0.0, 1.0, 20);
        PatternData::new(x, Array1::ones(20), Array1::ones(20)).unwrap()
    }

    fn offset_params(start: f64) -> ParameterSet {
        let mut params = ParameterSet::new();
        params.add(Parameter::with_bounds("p", start, 0.0, 10.0).unwrap()).unwrap();
        params
    }

    fn table_config(cycles: usize) -> RandomWalkConfig {
        RandomWalkConfig {
            max_cycles: cycles,
            groups: GroupStrategy::Table(vec![GroupSetupEntry::new("p", 0, 1.0, 0.0, false)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_trace_shape_and_counts() {
        let data = flat_data();
        let result = RandomWalk::new(&Offset, table_config(50))
            .run(&offset_params(5.0), &data, &Background::default())
            .unwrap();

        assert_eq!(result.trace.len(), 51);
        assert_eq!(result.trace.entries()[0].cycle, 0);
        assert_eq!(result.evaluated_moves, 50);
        assert!(result.accepted_moves <= result.evaluated_moves);
        approx::assert_relative_eq!(result.start_fit.rwp, 2.0, epsilon = 1e-12);
        assert!(result.best_fit.rwp <= result.start_fit.rwp);
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].statistics.proposals(), 50);
        assert!(format!("{}", result).contains("Random Walk Result"));
    }

    #[test]
    fn test_invalid_region_counted() {
        // Values at or above 9 are unphysical; large steps from 8.5 often land there
        let data = flat_data();
        let config = RandomWalkConfig {
            walk_style: WalkStyle::Drunken,
            ..table_config(200)
        };
        let result = RandomWalk::new(&Offset, config)
            .run(&offset_params(8.5), &data, &Background::default())
            .unwrap();
        assert!(result.invalid_moves > 0);
        let best = result.value("p").unwrap();
        assert!(best < 9.0);
    }

    #[test]
    fn test_unphysical_start_is_fatal() {
        let data = flat_data();
        let result = RandomWalk::new(&Offset, table_config(10)).run(&offset_params(9.5), &data, &Background::default());
        assert!(matches!(result, Err(LeBailError::UnphysicalStart(_))));
    }

    #[test]
    fn test_missing_model_parameter_is_fatal() {
        let data = flat_data();
        let mut params = ParameterSet::new();
        params.add_param("q", 1.0).unwrap();
        let config = RandomWalkConfig {
            max_cycles: 10,
            ..Default::default()
        };
        let result = RandomWalk::new(&Offset, config).run(&params, &data, &Background::default());
        assert!(matches!(result, Err(LeBailError::ParameterNotFound(name)) if name == "p"));
    }

    #[test]
    fn test_no_refinable_group_skips_evaluation() {
        let data = flat_data();
        let mut params = offset_params(5.0);
        params.get_mut("p").unwrap().refine = false;
        let result = RandomWalk::new(&Offset, table_config(20))
            .run(&params, &data, &Background::default())
            .unwrap();
        assert_eq!(result.evaluated_moves, 0);
        assert_eq!(result.best_cycle, 0);
        assert_eq!(result.value("p"), Some(5.0));
        assert!(result.summaries.is_empty());
    }
}
