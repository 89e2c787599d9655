//! Built-in models for diffraction patterns.
//!
//! - [`Background`]: polynomial and Chebyshev backgrounds
//! - [`GaussianPeakPattern`]: Gaussian reflections with Le Bail intensity extraction,
//!   usable as a [`ModelEvaluator`](crate::model::ModelEvaluator)

mod background;
mod peak;

pub use background::{Background, BackgroundKind};
pub use peak::{GaussianPeakPattern, PEAK_PARAMETERS};
