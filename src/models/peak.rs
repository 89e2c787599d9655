//! Peak pattern models for time-of-flight diffraction.
//!
//! [`GaussianPeakPattern`] places one Gaussian peak per reflection (given by its
//! d-spacing) using the instrument geometry and width parameters:
//!
//! - centre: `Zero + Dtt1 * d`
//! - width: `sigma^2 = Sig0 + Sig1 * d^2 + Sig2 * d^4`
//!
//! Peak intensities are not parameters. They are extracted from the observed,
//! background-subtracted signal Le Bail style: every point is shared among the
//! peaks overlapping it in proportion to their profiles.

use crate::error::{LeBailError, Result};
use crate::model::{Evaluation, ModelEvaluator};
use crate::parameters::ParameterView;
use ndarray::Array1;
use std::f64::consts::PI;

/// FWHM of a Gaussian in units of sigma: 2 * sqrt(2 * ln 2)
const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_4;

/// Parameters read by [`GaussianPeakPattern`]
pub const PEAK_PARAMETERS: [&str; 5] = ["Dtt1", "Zero", "Sig0", "Sig1", "Sig2"];

#[derive(Debug, Clone, Copy)]
struct PeakShape {
    centre: f64,
    sigma: f64,
    half_window: f64,
}

impl PeakShape {
    /// Unit-area Gaussian, zero outside the peak window
    fn profile(&self, x: f64) -> f64 {
        let dx = x - self.centre;
        if dx.abs() > self.half_window {
            return 0.0;
        }
        (-0.5 * dx * dx / (self.sigma * self.sigma)).exp() / (self.sigma * (2.0 * PI).sqrt())
    }
}

/// A set of Gaussian reflections with shared profile parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianPeakPattern {
    d_spacings: Vec<f64>,
    peak_radius: f64,
}

impl GaussianPeakPattern {
    /// Create a pattern with one peak per d-spacing
    ///
    /// Peaks extend over 5 FWHM on each side of their centre by default.
    pub fn new(d_spacings: Vec<f64>) -> Self {
        Self {
            d_spacings,
            peak_radius: 5.0,
        }
    }

    /// Set the peak window half-width in units of FWHM
    pub fn with_peak_radius(mut self, peak_radius: f64) -> Self {
        self.peak_radius = peak_radius;
        self
    }

    pub fn d_spacings(&self) -> &[f64] {
        &self.d_spacings
    }

    pub fn peak_radius(&self) -> f64 {
        self.peak_radius
    }

    /// Peak centres for a parameter snapshot
    pub fn peak_centres(&self, params: &ParameterView) -> Result<Vec<f64>> {
        let dtt1 = params.value("Dtt1")?;
        let zero = params.value("Zero")?;
        Ok(self.d_spacings.iter().map(|d| zero + dtt1 * d).collect())
    }

    /// Peak shapes, or `None` if any peak is unphysical
    fn shapes(&self, params: &ParameterView) -> Result<Option<Vec<PeakShape>>> {
        let sig0 = params.value("Sig0")?;
        let sig1 = params.value("Sig1")?;
        let sig2 = params.value("Sig2")?;
        let centres = self.peak_centres(params)?;

        let mut shapes = Vec::with_capacity(self.d_spacings.len());
        for (&d, centre) in self.d_spacings.iter().zip(centres) {
            let d2 = d * d;
            let variance = sig0 + sig1 * d2 + sig2 * d2 * d2;
            if !(variance > 0.0) || !variance.is_finite() || !centre.is_finite() {
                return Ok(None);
            }
            let sigma = variance.sqrt();
            shapes.push(PeakShape {
                centre,
                sigma,
                half_window: self.peak_radius * FWHM_PER_SIGMA * sigma,
            });
        }
        Ok(Some(shapes))
    }

    fn pattern(shapes: &[PeakShape], x: &Array1<f64>, intensities: &[f64]) -> Array1<f64> {
        x.mapv(|xi| {
            shapes
                .iter()
                .zip(intensities)
                .map(|(shape, &intensity)| intensity * shape.profile(xi))
                .sum()
        })
    }

    /// Extract peak intensities from a background-subtracted signal
    ///
    /// Returns `None` if the profiles are unphysical.
    pub fn extract_intensities(
        &self,
        params: &ParameterView,
        x: &Array1<f64>,
        signal: &Array1<f64>,
    ) -> Result<Option<Vec<f64>>> {
        if x.len() != signal.len() {
            return Err(LeBailError::DimensionMismatch(format!(
                "x ({}) and signal ({}) must have the same length",
                x.len(),
                signal.len()
            )));
        }
        let Some(shapes) = self.shapes(params)? else {
            return Ok(None);
        };

        let widths = bin_widths(x);
        let mut intensities = vec![0.0; shapes.len()];
        let mut profiles = vec![0.0; shapes.len()];

        for ((&xi, &yi), &width) in x.iter().zip(signal.iter()).zip(widths.iter()) {
            let mut total = 0.0;
            for (p, shape) in profiles.iter_mut().zip(&shapes) {
                *p = shape.profile(xi);
                total += *p;
            }
            if total <= 0.0 {
                continue;
            }
            for (intensity, &p) in intensities.iter_mut().zip(&profiles) {
                *intensity += p / total * yi * width;
            }
        }

        Ok(Some(intensities))
    }

    /// Build a peak pattern from explicit intensities
    ///
    /// # Errors
    ///
    /// Returns an error if the number of intensities does not match the number of
    /// peaks or the profile parameters are unphysical.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::models::GaussianPeakPattern;
    /// use lebail_rs::parameters::ParameterSet;
    /// use ndarray::Array1;
    ///
    /// let mut params = ParameterSet::new();
    /// for (name, value) in [("Dtt1", 1000.0), ("Zero", 0.0), ("Sig0", 4.0), ("Sig1", 0.0), ("Sig2", 0.0)] {
    ///     params.add_param(name, value).unwrap();
    /// }
    /// let snapshot = params.values();
    ///
    /// let model = GaussianPeakPattern::new(vec![1.0]);
    /// let x = Array1::range(900.0, 1100.0, 0.5);
    /// let y = model.synthesize(&params.view(&snapshot), &x, &[100.0]).unwrap();
    ///
    /// // Unit-area profile times the intensity
    /// let area: f64 = y.sum() * 0.5;
    /// assert!((area - 100.0).abs() < 1e-6);
    /// ```
    pub fn synthesize(&self, params: &ParameterView, x: &Array1<f64>, intensities: &[f64]) -> Result<Array1<f64>> {
        if intensities.len() != self.d_spacings.len() {
            return Err(LeBailError::DimensionMismatch(format!(
                "{} intensities given for {} peaks",
                intensities.len(),
                self.d_spacings.len()
            )));
        }
        let shapes = self.shapes(params)?.ok_or_else(|| {
            LeBailError::InvalidParameter("peak profile parameters give a non-positive width".to_string())
        })?;
        Ok(Self::pattern(&shapes, x, intensities))
    }
}

impl ModelEvaluator for GaussianPeakPattern {
    fn parameter_names(&self) -> Vec<String> {
        PEAK_PARAMETERS.iter().map(|s| s.to_string()).collect()
    }

    fn is_valid(&self, params: &ParameterView) -> bool {
        matches!(self.shapes(params), Ok(Some(_)))
    }

    fn evaluate(&self, params: &ParameterView, x: &Array1<f64>, signal: &Array1<f64>) -> Result<Evaluation> {
        let Some(intensities) = self.extract_intensities(params, x, signal)? else {
            return Ok(Evaluation::invalid(x.len()));
        };
        if intensities.iter().any(|&i| !i.is_finite() || i < 0.0) {
            return Ok(Evaluation::invalid(x.len()));
        }
        let Some(shapes) = self.shapes(params)? else {
            return Ok(Evaluation::invalid(x.len()));
        };
        Ok(Evaluation::valid(Self::pattern(&shapes, x, &intensities)))
    }
}

/// Width of the bin around each point, from the midpoints to its neighbours
fn bin_widths(x: &Array1<f64>) -> Array1<f64> {
    let n = x.len();
    if n < 2 {
        return Array1::ones(n);
    }
    Array1::from_shape_fn(n, |i| {
        if i == 0 {
            (x[1] - x[0]).abs()
        } else if i == n - 1 {
            (x[n - 1] - x[n - 2]).abs()
        } else {
            0.5 * (x[i + 1] - x[i - 1]).abs()
        }
    })
}
