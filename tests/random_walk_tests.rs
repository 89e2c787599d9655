//! Integration tests for the random-walk engine.
//!
//! The test models here are tiny closed-form evaluators whose goodness of fit is
//! known analytically, so convergence and invariants can be checked exactly.

use approx::assert_relative_eq;
use lebail_rs::data::PatternData;
use lebail_rs::error::{LeBailError, Result};
use lebail_rs::model::{Evaluation, ModelEvaluator};
use lebail_rs::models::Background;
use lebail_rs::parameters::{BoundaryPolicy, GroupSetupEntry, Parameter, ParameterSet, ParameterView};
use lebail_rs::refine::{GroupStrategy, RandomWalk, RandomWalkConfig, WalkStyle, MIN_TEMPERATURE};
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;

/// Flat model `1 + (p - target)` over observations of ones: Rwp = |p - target|
struct Shifted {
    target: f64,
}

impl ModelEvaluator for Shifted {
    fn parameter_names(&self) -> Vec<String> {
        vec!["p".to_string()]
    }

    fn is_valid(&self, params: &ParameterView) -> bool {
        params.get("p").is_some()
    }

    fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, _signal: &Array1<f64>) -> Result<Evaluation> {
        let p = params.value("p")?;
        Ok(Evaluation::valid(Array1::from_elem(x.len(), 1.0 + (p - self.target))))
    }
}

/// Records every snapshot it is asked to evaluate
struct Recording<M> {
    inner: M,
    seen: RefCell<Vec<Vec<f64>>>,
}

impl<M: ModelEvaluator> ModelEvaluator for Recording<M> {
    fn parameter_names(&self) -> Vec<String> {
        self.inner.parameter_names()
    }

    fn is_valid(&self, params: &ParameterView) -> bool {
        self.inner.is_valid(params)
    }

    fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, signal: &Array1<f64>) -> Result<Evaluation> {
        self.seen.borrow_mut().push(params.values().to_vec());
        self.inner.evaluate(params, x, signal)
    }
}

/// Flat model `1 + |a - 2| + |b - 3|` over observations of ones
struct TwoParameter;

impl ModelEvaluator for TwoParameter {
    fn parameter_names(&self) -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    fn is_valid(&self, _params: &ParameterView) -> bool {
        true
    }

    fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, _signal: &Array1<f64>) -> Result<Evaluation> {
        let a = params.value("a")?;
        let b = params.value("b")?;
        Ok(Evaluation::valid(Array1::from_elem(x.len(), 1.0 + (a - 2.0).abs() + (b - 3.0).abs())))
    }
}

/// Flat model `1.5` whatever the parameters: every proposal fits equally well
struct Insensitive;

impl ModelEvaluator for Insensitive {
    fn parameter_names(&self) -> Vec<String> {
        vec!["p".to_string()]
    }

    fn is_valid(&self, _params: &ParameterView) -> bool {
        true
    }

    fn evaluate(&self, _params: &ParameterView, x: &Array1<f64>, _signal: &Array1<f64>) -> Result<Evaluation> {
        Ok(Evaluation::valid(Array1::from_elem(x.len(), 1.5)))
    }
}

fn flat_data() -> PatternData {
    let x = Array1::linspace(0.0, 1.0, 25);
    PatternData::new(x, Array1::ones(25), Array1::ones(25)).unwrap()
}

fn single(start: f64, min: f64, max: f64) -> ParameterSet {
    let mut params = ParameterSet::new();
    params.add(Parameter::with_bounds("p", start, min, max).unwrap()).unwrap();
    params
}

/// Table grouping with step coefficient `a0` for every entry
fn table_with_step(entries: &[(&str, i32)], a0: f64, cycles: usize) -> RandomWalkConfig {
    RandomWalkConfig {
        max_cycles: cycles,
        groups: GroupStrategy::Table(
            entries
                .iter()
                .map(|&(name, group)| GroupSetupEntry::new(name, group, a0, 0.0, false))
                .collect(),
        ),
        ..Default::default()
    }
}

fn table(entries: &[(&str, i32)], cycles: usize) -> RandomWalkConfig {
    table_with_step(entries, 1.0, cycles)
}

#[test]
fn test_converges_to_target() {
    let data = flat_data();
    let model = Shifted { target: 3.0 };
    let config = RandomWalkConfig {
        random_seed: 42,
        ..table(&[("p", 0)], 300)
    };

    let result = RandomWalk::new(&model, config)
        .run(&single(5.0, 0.0, 10.0), &data, &Background::default())
        .unwrap();

    assert_relative_eq!(result.start_fit.rwp, 2.0, epsilon = 1e-12);
    let best = result.value("p").unwrap();
    assert!((best - 3.0).abs() < 1e-3, "best p = {}", best);
    assert!(result.best_fit.rwp < 1e-3);
    assert_relative_eq!(result.pattern.fit.rwp, result.best_fit.rwp, epsilon = 1e-12);
}

#[test]
fn test_drunken_walk_converges() {
    let data = flat_data();
    let model = Shifted { target: 3.0 };
    let config = RandomWalkConfig {
        walk_style: WalkStyle::Drunken,
        random_seed: 7,
        ..table(&[("p", 0)], 300)
    };

    let result = RandomWalk::new(&model, config)
        .run(&single(5.0, 0.0, 10.0), &data, &Background::default())
        .unwrap();
    assert!(result.best_fit.rwp < 0.01, "best {}", result.best_fit);
}

#[test]
fn test_same_seed_same_run() {
    let data = flat_data();
    let model = Shifted { target: 3.0 };
    let params = single(5.0, 0.0, 10.0);
    let walk = RandomWalk::new(&model, table(&[("p", 0)], 60));

    let first = walk.run(&params, &data, &Background::default()).unwrap();
    let second = walk.run(&params, &data, &Background::default()).unwrap();

    assert_eq!(first.value("p"), second.value("p"));
    assert_eq!(first.trace, second.trace);
    assert_eq!(first.accepted_moves, second.accepted_moves);
    assert_eq!(first.final_temperature, second.final_temperature);

    let other = RandomWalk::new(
        &model,
        RandomWalkConfig {
            random_seed: 2,
            ..table(&[("p", 0)], 60)
        },
    )
    .run(&params, &data, &Background::default())
    .unwrap();
    assert_ne!(first.trace, other.trace);
}

#[test]
fn test_external_generator() {
    let data = flat_data();
    let model = Shifted { target: 3.0 };
    let params = single(5.0, 0.0, 10.0);
    let walk = RandomWalk::new(&model, table(&[("p", 0)], 40));

    let seeded = walk.run(&params, &data, &Background::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let external = walk.run_with_rng(&params, &data, &Background::default(), &mut rng).unwrap();
    assert_eq!(seeded.trace, external.trace);
}

#[test]
fn test_every_evaluation_within_bounds() {
    let data = flat_data();
    for policy in [
        BoundaryPolicy::RangeAdaptive,
        BoundaryPolicy::Reflective,
        BoundaryPolicy::Periodic,
        BoundaryPolicy::HalfDistance,
        BoundaryPolicy::CoinFlip,
    ] {
        let model = Recording {
            inner: Shifted { target: 3.0 },
            seen: RefCell::new(Vec::new()),
        };
        let config = RandomWalkConfig {
            boundary_policy: policy,
            ..table_with_step(&[("p", 0)], 50.0, 100)
        };

        // Steps of up to 25 against a range of 2
        RandomWalk::new(&model, config)
            .run(&single(2.5, 2.0, 4.0), &data, &Background::default())
            .unwrap();

        // Start, one proposal per cycle, and the final pattern
        let seen = model.seen.borrow();
        assert_eq!(seen.len(), 102);
        for snapshot in seen.iter() {
            assert!((2.0..=4.0).contains(&snapshot[0]), "{:?}: p = {}", policy, snapshot[0]);
        }
    }
}

#[test]
fn test_best_fit_never_worsens() {
    let data = flat_data();
    let mut params = ParameterSet::new();
    params.add_param_with_bounds("a", 0.0, -10.0, 10.0).unwrap();
    params.add_param_with_bounds("b", 0.0, -10.0, 10.0).unwrap();
    let config = RandomWalkConfig {
        temperature: 5.0,
        ..table(&[("a", 0), ("b", 1)], 150)
    };

    let result = RandomWalk::new(&TwoParameter, config)
        .run(&params, &data, &Background::default())
        .unwrap();

    assert_eq!(result.trace.len(), 151);
    let entries = result.trace.entries();
    for pair in entries.windows(2) {
        assert!(pair[1].best.rwp <= pair[0].best.rwp);
        assert_eq!(pair[1].cycle, pair[0].cycle + 1);
    }
    for entry in entries {
        if let Some(fit) = entry.fit {
            assert!(entry.best.rwp <= fit.rwp);
        }
    }
    assert_eq!(entries.last().unwrap().best, result.best_fit);
    assert_eq!(result.evaluated_moves, 300);
    assert_eq!(result.summaries.len(), 2);
    assert_eq!(result.summaries[0].name, "a");
}

#[test]
fn test_annealing_disabled_keeps_temperature() {
    let data = flat_data();
    let model = Shifted { target: 3.0 };
    let config = RandomWalkConfig {
        temperature: -2.5,
        use_annealing: false,
        ..table(&[("p", 0)], 50)
    };
    let result = RandomWalk::new(&model, config)
        .run(&single(5.0, 0.0, 10.0), &data, &Background::default())
        .unwrap();
    assert_eq!(result.final_temperature, 2.5);
}

#[test]
fn test_long_annealing_keeps_positive_temperature() {
    let data = flat_data();
    let result = RandomWalk::new(&Insensitive, table(&[("p", 0)], 12_000))
        .run(&single(5.0, 0.0, 10.0), &data, &Background::default())
        .unwrap();

    // Equal fits are always accepted, so every window halves the temperature
    assert_eq!(result.accepted_moves, 12_000);
    assert!(result.final_temperature > 0.0);
    assert_eq!(result.final_temperature, MIN_TEMPERATURE);
}

#[test]
fn test_background_is_added_to_peaks() {
    // Observations of 11 with a constant background of 10 leave a signal of ones
    let x = Array1::linspace(0.0, 1.0, 25);
    let data = PatternData::new(x, Array1::from_elem(25, 11.0), Array1::ones(25)).unwrap();
    let model = Shifted { target: 3.0 };

    let result = RandomWalk::new(&model, table(&[("p", 0)], 10))
        .run(&single(3.0, 0.0, 10.0), &data, &Background::polynomial(vec![10.0]))
        .unwrap();

    assert_eq!(result.start_fit.rwp, 0.0);
    assert_eq!(result.pattern.background[0], 10.0);
    assert_eq!(result.pattern.calculated[0], 11.0);
}

#[test]
fn test_fatal_preconditions() {
    let data = flat_data();
    let model = Shifted { target: 3.0 };
    let params = single(5.0, 0.0, 10.0);

    let zero_cycles = RandomWalk::new(&model, table(&[("p", 0)], 0)).run(&params, &data, &Background::default());
    assert!(matches!(zero_cycles, Err(LeBailError::InvalidConfig(_))));

    let zero_temperature = RandomWalk::new(
        &model,
        RandomWalkConfig {
            temperature: 0.0,
            ..table(&[("p", 0)], 10)
        },
    )
    .run(&params, &data, &Background::default());
    assert!(matches!(zero_temperature, Err(LeBailError::InvalidConfig(_))));

    let unknown = RandomWalk::new(&model, table(&[("p", 0), ("q", 1)], 10)).run(&params, &data, &Background::default());
    assert!(matches!(unknown, Err(LeBailError::ParameterNotFound(name)) if name == "q"));
}
