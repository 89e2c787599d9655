//! Model evaluator interface.
//!
//! The refinement engine is generic over [`ModelEvaluator`], the capability of turning
//! a parameter snapshot into peak-only model values over the observation domain.
//! Background is handled separately by the engine: evaluators receive the
//! background-subtracted signal and return peak contributions only.

use crate::error::Result;
use crate::parameters::ParameterView;
use ndarray::Array1;

/// Model values produced for one parameter snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Peak-only model values, one per observation point
    pub values: Array1<f64>,

    /// Whether the derived physical quantities (e.g. peak heights) are acceptable
    pub valid: bool,
}

impl Evaluation {
    pub fn valid(values: Array1<f64>) -> Self {
        Self { values, valid: true }
    }

    /// An evaluation flagged as unphysical
    pub fn invalid(len: usize) -> Self {
        Self {
            values: Array1::zeros(len),
            valid: false,
        }
    }
}

/// A model that can be refined by the random walk.
///
/// Implementations must be deterministic for a given snapshot; the engine relies on
/// this for reproducible runs.
pub trait ModelEvaluator {
    /// Names of the parameters this model reads, for validation and reporting.
    ///
    /// An empty list (the default) disables the check.
    fn parameter_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the snapshot describes a physically meaningful model
    /// (for example, every peak has a positive width).
    fn is_valid(&self, params: &ParameterView) -> bool;

    /// Evaluate the model
    ///
    /// # Arguments
    ///
    /// * `params` - Parameter snapshot to evaluate
    /// * `x` - Observation positions
    /// * `signal` - Observed values with the background removed
    ///
    /// # Errors
    ///
    /// Errors are reserved for programming faults such as mismatched array lengths;
    /// unphysical results are reported through [`Evaluation::valid`].
    fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, signal: &Array1<f64>) -> Result<Evaluation>;
}

impl<M: ModelEvaluator + ?Sized> ModelEvaluator for &M {
    fn parameter_names(&self) -> Vec<String> {
        (**self).parameter_names()
    }

    fn is_valid(&self, params: &ParameterView) -> bool {
        (**self).is_valid(params)
    }

    fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, signal: &Array1<f64>) -> Result<Evaluation> {
        (**self).evaluate(params, x, signal)
    }
}

impl<M: ModelEvaluator + ?Sized> ModelEvaluator for Box<M> {
    fn parameter_names(&self) -> Vec<String> {
        (**self).parameter_names()
    }

    fn is_valid(&self, params: &ParameterView) -> bool {
        (**self).is_valid(params)
    }

    fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, signal: &Array1<f64>) -> Result<Evaluation> {
        (**self).evaluate(params, x, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterSet;

    /// Flat model whose level is a single parameter
    struct Level;

    impl ModelEvaluator for Level {
        fn is_valid(&self, params: &ParameterView) -> bool {
            params.get("level").is_some()
        }

        fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, _signal: &Array1<f64>) -> Result<Evaluation> {
            let level = params.value("level")?;
            Ok(Evaluation::valid(Array1::from_elem(x.len(), level)))
        }
    }

    #[test]
    fn test_evaluator_through_references() {
        let mut params = ParameterSet::new();
        params.add_param("level", 3.0).unwrap();
        let snapshot = params.values();
        let view = params.view(&snapshot);
        let x = Array1::linspace(0.0, 1.0, 4);

        let boxed: Box<dyn ModelEvaluator> = Box::new(Level);
        let by_ref = &Level;

        assert!(boxed.is_valid(&view));
        let a = boxed.evaluate(&view, &x, &x).unwrap();
        let b = by_ref.evaluate(&view, &x, &x).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.values.to_vec(), vec![3.0; 4]);
        assert!(boxed.parameter_names().is_empty());
    }

    #[test]
    fn test_invalid_evaluation() {
        let eval = Evaluation::invalid(3);
        assert!(!eval.valid);
        assert_eq!(eval.values.len(), 3);
    }
}
