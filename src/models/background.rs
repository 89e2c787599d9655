//! Background models for diffraction patterns.
//!
//! A background is a linear combination of basis functions with coefficients
//! `A0..An`:
//!
//! - `Polynomial`: f(x) = A0 + A1*x + A2*x^2 + ... + An*x^n
//! - `Chebyshev`: f(x) = A0*T0(t) + A1*T1(t) + ... + An*Tn(t), where `t` maps the
//!   domain `[a, b]` onto `[-1, 1]`

use crate::error::{LeBailError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Basis of a background model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKind {
    #[default]
    Polynomial,
    Chebyshev,
}

impl FromStr for BackgroundKind {
    type Err = LeBailError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polynomial" => Ok(BackgroundKind::Polynomial),
            "chebyshev" => Ok(BackgroundKind::Chebyshev),
            other => Err(LeBailError::InvalidConfig(format!(
                "unrecognized background type '{}'",
                other
            ))),
        }
    }
}

/// A background model with its coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub kind: BackgroundKind,

    /// Coefficients `A0..An`
    coefficients: Vec<f64>,

    /// Chebyshev domain; the data range is used when absent
    #[serde(default)]
    domain: Option<(f64, f64)>,
}

impl Default for Background {
    fn default() -> Self {
        Self::polynomial(vec![0.0])
    }
}

impl Background {
    /// Polynomial background with the given coefficients
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::models::Background;
    /// use ndarray::array;
    ///
    /// let bkgd = Background::polynomial(vec![1.0, 2.0]);
    /// assert_eq!(bkgd.eval(&array![0.0, 1.0, 2.0]).to_vec(), vec![1.0, 3.0, 5.0]);
    /// ```
    pub fn polynomial(coefficients: Vec<f64>) -> Self {
        Self {
            kind: BackgroundKind::Polynomial,
            coefficients,
            domain: None,
        }
    }

    /// Chebyshev background with the given coefficients
    pub fn chebyshev(coefficients: Vec<f64>) -> Self {
        Self {
            kind: BackgroundKind::Chebyshev,
            coefficients,
            domain: None,
        }
    }

    /// Fix the Chebyshev domain instead of deriving it from the data
    pub fn with_domain(mut self, start: f64, end: f64) -> Self {
        self.domain = Some((start, end));
        self
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Replace the coefficients, keeping the order of the model
    pub fn set_coefficients(&mut self, coefficients: &[f64]) -> Result<()> {
        if coefficients.len() != self.coefficients.len() {
            return Err(LeBailError::DimensionMismatch(format!(
                "background of order {} expects {} coefficients, got {}",
                self.order(),
                self.coefficients.len(),
                coefficients.len()
            )));
        }
        self.coefficients.copy_from_slice(coefficients);
        Ok(())
    }

    /// Highest term index
    pub fn order(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Coefficient names `A0..An`
    pub fn parameter_names(&self) -> Vec<String> {
        (0..self.coefficients.len()).map(|i| format!("A{}", i)).collect()
    }

    /// Evaluate the background with its own coefficients
    pub fn eval(&self, x: &Array1<f64>) -> Array1<f64> {
        self.eval_with(&self.coefficients, x)
    }

    /// Evaluate the background basis with arbitrary coefficients
    pub fn eval_with(&self, coefficients: &[f64], x: &Array1<f64>) -> Array1<f64> {
        match self.kind {
            BackgroundKind::Polynomial => x.mapv(|xi| {
                // Horner's method
                coefficients.iter().rev().fold(0.0, |acc, &c| acc * xi + c)
            }),
            BackgroundKind::Chebyshev => {
                let (start, end) = self.domain.unwrap_or_else(|| data_range(x));
                let width = end - start;
                x.mapv(|xi| {
                    let t = if width.abs() > 0.0 {
                        (2.0 * xi - (start + end)) / width
                    } else {
                        0.0
                    };
                    chebyshev_sum(coefficients, t)
                })
            }
        }
    }
}

fn data_range(x: &Array1<f64>) -> (f64, f64) {
    x.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Sum of `c[k] * T_k(t)` by the three-term recurrence
fn chebyshev_sum(coefficients: &[f64], t: f64) -> f64 {
    let mut sum = 0.0;
    let (mut prev, mut curr) = (1.0, t);
    for (k, &c) in coefficients.iter().enumerate() {
        let tk = match k {
            0 => 1.0,
            1 => t,
            _ => {
                let next = 2.0 * t * curr - prev;
                prev = curr;
                curr = next;
                next
            }
        };
        sum += c * tk;
    }
    sum
}
