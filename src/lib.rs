//! # lebail-rs
//!
//! `lebail-rs` refines the profile parameters of a powder diffraction pattern with a
//! Monte Carlo random walk, Le Bail style: peak positions and widths come from
//! shared instrument parameters while peak intensities are extracted from the
//! observed data.
//!
//! The library provides:
//! - Named, bounded parameters with step coefficients, grouping and JSON I/O
//! - A [`ModelEvaluator`] interface with a Gaussian time-of-flight peak model
//! - A random-walk engine with Metropolis-style acceptance and adaptive annealing
//! - Monte Carlo refinement of background coefficients
//! - Run-mode dispatch with calculation, fit and background modes
//!
//! ## Basic Usage
//!
//! ```no_run
//! use lebail_rs::data::PatternData;
//! use lebail_rs::lebail::{LeBailConfig, LeBailFit, LeBailOutcome};
//! use lebail_rs::models::{Background, GaussianPeakPattern};
//! use lebail_rs::parameters::ParameterSet;
//!
//! # fn main() -> lebail_rs::Result<()> {
//! let params = ParameterSet::load_json("profile.json")?;
//! let config = LeBailConfig::load_json("run.json")?;
//! let data: PatternData = unimplemented!();
//!
//! let fit = LeBailFit::new(GaussianPeakPattern::new(vec![1.0, 1.5, 2.2]), config);
//! if let LeBailOutcome::Refined(result) = fit.run(&params, &data, &Background::polynomial(vec![10.0]))? {
//!     println!("{}", result);
//!     result.trace.save(result.trace.default_file_name())?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod goodness;
pub mod lebail;
pub mod model;
pub mod models;
pub mod parameters;
pub mod refine;

// Re-exports for convenience
pub use data::PatternData;
pub use error::{LeBailError, Result};
pub use goodness::GoodnessOfFit;
pub use lebail::{LeBailConfig, LeBailFit, LeBailOutcome, RunMode};
pub use model::{Evaluation, ModelEvaluator};
pub use parameters::{Parameter, ParameterSet};
pub use refine::{BackgroundRefinement, RandomWalk, RandomWalkConfig, RandomWalkResult};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
