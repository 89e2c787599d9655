//! Scoring of parameter snapshots against observed data.

use crate::data::PatternData;
use crate::error::{LeBailError, Result};
use crate::goodness::GoodnessOfFit;
use crate::model::ModelEvaluator;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use std::io::{self, Write};
use tracing::debug;

/// Model, data and a fixed background evaluated together
pub(crate) struct PatternCalculator<'a, M> {
    model: &'a M,
    data: &'a PatternData,
    background: Array1<f64>,
    signal: Array1<f64>,
}

/// Result of scoring one snapshot
#[derive(Debug, Clone)]
pub(crate) struct Score {
    pub peaks: Array1<f64>,
    pub fit: GoodnessOfFit,
    /// False when the model reported unphysical parameters or peaks
    pub valid: bool,
}

impl<'a, M: ModelEvaluator> PatternCalculator<'a, M> {
    pub fn new(model: &'a M, data: &'a PatternData, background: Array1<f64>) -> Result<Self> {
        if background.len() != data.len() {
            return Err(LeBailError::DimensionMismatch(format!(
                "background has {} points, data has {}",
                background.len(),
                data.len()
            )));
        }
        let signal = data.y() - &background;
        Ok(Self {
            model,
            data,
            background,
            signal,
        })
    }

    /// Whether the model accepts the snapshot as physical
    pub fn is_valid(&self, params: &ParameterSet, values: &Array1<f64>) -> bool {
        self.model.is_valid(&params.view(values))
    }

    /// Evaluate the model for a snapshot and score peaks plus background
    pub fn score(&self, params: &ParameterSet, values: &Array1<f64>) -> Result<Score> {
        let view = params.view(values);
        if !self.model.is_valid(&view) {
            debug!("Proposed profile parameters are unphysical");
            return Ok(self.invalid());
        }

        let evaluation = self.model.evaluate(&view, self.data.x(), &self.signal)?;
        if !evaluation.valid {
            debug!("Proposed profile parameters give unphysical peak intensities");
            return Ok(self.invalid());
        }
        if evaluation.values.len() != self.data.len() {
            return Err(LeBailError::FunctionEvaluation(format!(
                "model returned {} values for {} data points",
                evaluation.values.len(),
                self.data.len()
            )));
        }

        let calculated = &evaluation.values + &self.background;
        let fit = GoodnessOfFit::compute(self.data.y(), &calculated, self.data.e())?;
        Ok(Score {
            peaks: evaluation.values,
            fit,
            valid: true,
        })
    }

    fn invalid(&self) -> Score {
        Score {
            peaks: Array1::zeros(self.data.len()),
            fit: GoodnessOfFit::INVALID,
            valid: false,
        }
    }

    /// Full calculated pattern of a snapshot
    pub fn pattern(&self, params: &ParameterSet, values: &Array1<f64>) -> Result<CalculatedPattern> {
        let score = self.score(params, values)?;
        Ok(CalculatedPattern::new(self.data, score.peaks, self.background.clone(), score.fit, score.valid))
    }
}

/// Observed and calculated pattern of a parameter snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedPattern {
    pub x: Array1<f64>,
    pub observed: Array1<f64>,

    /// Peaks plus background
    pub calculated: Array1<f64>,

    /// Observed minus calculated
    pub difference: Array1<f64>,
    pub peaks: Array1<f64>,
    pub background: Array1<f64>,
    pub fit: GoodnessOfFit,

    /// False when the snapshot was unphysical; `peaks` is then all zero
    pub valid: bool,
}

impl CalculatedPattern {
    pub(crate) fn new(
        data: &PatternData,
        peaks: Array1<f64>,
        background: Array1<f64>,
        fit: GoodnessOfFit,
        valid: bool,
    ) -> Self {
        let calculated = &peaks + &background;
        let difference = data.y() - &calculated;
        Self {
            x: data.x().clone(),
            observed: data.y().clone(),
            calculated,
            difference,
            peaks,
            background,
            fit,
            valid,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Write `x observed calculated difference peaks background` columns
    pub fn write_table<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for i in 0..self.x.len() {
            writeln!(
                writer,
                "{:.6e} {:.6e} {:.6e} {:.6e} {:.6e} {:.6e}",
                self.x[i], self.observed[i], self.calculated[i], self.difference[i], self.peaks[i], self.background[i]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Evaluation;
    use crate::parameters::ParameterView;
    use ndarray::array;

    /// Returns the signal scaled by a parameter; invalid for negative scales
    struct Scaled;

    impl ModelEvaluator for Scaled {
        fn is_valid(&self, params: &ParameterView) -> bool {
            params.value_or("scale", -1.0) >= 0.0
        }

        fn evaluate(&self, params: &ParameterView, _x: &Array1<f64>, signal: &Array1<f64>) -> Result<Evaluation> {
            let scale = params.value("scale")?;
            Ok(Evaluation::valid(signal * scale))
        }
    }

    /// Drops the last point of the signal
    struct Short;

    impl ModelEvaluator for Short {
        fn is_valid(&self, _params: &ParameterView) -> bool {
            true
        }

        fn evaluate(&self, _params: &ParameterView, x: &Array1<f64>, _signal: &Array1<f64>) -> Result<Evaluation> {
            Ok(Evaluation::valid(Array1::zeros(x.len() - 1)))
        }
    }

    fn data() -> PatternData {
        PatternData::new(array![1.0, 2.0, 3.0], array![12.0, 14.0, 16.0], array![1.0, 1.0, 1.0]).unwrap()
    }

    #[test]
    fn test_score_adds_background() {
        let data = data();
        let mut params = ParameterSet::new();
        params.add_param("scale", 1.0).unwrap();
        let calculator = PatternCalculator::new(&Scaled, &data, Array1::from_elem(3, 10.0)).unwrap();

        let score = calculator.score(&params, &params.values()).unwrap();
        assert!(score.valid);
        assert_eq!(score.peaks.to_vec(), vec![2.0, 4.0, 6.0]);
        assert_eq!(score.fit.rwp, 0.0);

        let pattern = calculator.pattern(&params, &array![0.5]).unwrap();
        assert_eq!(pattern.calculated.to_vec(), vec![11.0, 12.0, 13.0]);
        assert_eq!(pattern.difference.to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(pattern.fit.rwp > 0.0);

        let mut buffer = Vec::new();
        pattern.write_table(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_unphysical_snapshot() {
        let data = data();
        let mut params = ParameterSet::new();
        params.add_param("scale", 1.0).unwrap();
        let calculator = PatternCalculator::new(&Scaled, &data, Array1::zeros(3)).unwrap();

        let score = calculator.score(&params, &array![-1.0]).unwrap();
        assert!(!score.valid);
        assert_eq!(score.fit, GoodnessOfFit::INVALID);
        assert!(!calculator.is_valid(&params, &array![-1.0]));
    }

    #[test]
    fn test_wrong_model_length_is_evaluation_error() {
        let data = data();
        let params = ParameterSet::new();
        let calculator = PatternCalculator::new(&Short, &data, Array1::zeros(3)).unwrap();
        let result = calculator.score(&params, &params.values());
        assert!(matches!(result, Err(LeBailError::FunctionEvaluation(_))));
    }

    #[test]
    fn test_background_length_checked() {
        let data = data();
        assert!(PatternCalculator::new(&Scaled, &data, Array1::zeros(2)).is_err());
    }
}
