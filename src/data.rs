//! Observed diffraction data.

use crate::error::{LeBailError, Result};
use ndarray::Array1;

/// One observed spectrum: positions, intensities and their uncertainties.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternData {
    x: Array1<f64>,
    y: Array1<f64>,
    e: Array1<f64>,
}

impl PatternData {
    /// Create a pattern from positions, intensities and uncertainties
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty or the arrays differ in length.
    pub fn new(x: Array1<f64>, y: Array1<f64>, e: Array1<f64>) -> Result<Self> {
        if x.is_empty() {
            return Err(LeBailError::InvalidInput("pattern has no data points".to_string()));
        }
        if x.len() != y.len() || x.len() != e.len() {
            return Err(LeBailError::DimensionMismatch(format!(
                "x ({}), y ({}) and e ({}) must have the same length",
                x.len(),
                y.len(),
                e.len()
            )));
        }
        Ok(Self { x, y, e })
    }

    /// Create a pattern with counting-statistics uncertainties
    ///
    /// Each uncertainty is `sqrt(y)` for counts above one and 1 otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::data::PatternData;
    /// use ndarray::array;
    ///
    /// let data = PatternData::with_poisson_errors(array![1.0, 2.0], array![16.0, 0.5]).unwrap();
    /// assert_eq!(data.e().to_vec(), vec![4.0, 1.0]);
    /// ```
    pub fn with_poisson_errors(x: Array1<f64>, y: Array1<f64>) -> Result<Self> {
        let e = y.mapv(|v| if v > 1.0 { v.sqrt() } else { 1.0 });
        Self::new(x, y, e)
    }

    /// Restrict the pattern to `x_min <= x <= x_max`
    ///
    /// # Errors
    ///
    /// Returns an error if the region is inverted or contains no data points.
    pub fn crop(&self, x_min: f64, x_max: f64) -> Result<Self> {
        if !(x_min <= x_max) {
            return Err(LeBailError::InvalidConfig(format!(
                "fit region [{}, {}] is inverted",
                x_min, x_max
            )));
        }

        let keep: Vec<usize> = self
            .x
            .iter()
            .enumerate()
            .filter(|(_, &x)| x >= x_min && x <= x_max)
            .map(|(i, _)| i)
            .collect();

        if keep.is_empty() {
            return Err(LeBailError::InvalidConfig(format!(
                "fit region [{}, {}] contains no data points",
                x_min, x_max
            )));
        }

        let pick = |a: &Array1<f64>| keep.iter().map(|&i| a[i]).collect::<Array1<f64>>();
        Self::new(pick(&self.x), pick(&self.y), pick(&self.e))
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn e(&self) -> &Array1<f64> {
        &self.e
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}
