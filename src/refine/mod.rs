//! Monte Carlo refinement engines.
//!
//! Two engines share the acceptance test of [`acceptance`]:
//!
//! - [`RandomWalk`] refines profile parameters group by group, with optional
//!   annealing of the acceptance temperature.
//! - [`BackgroundRefinement`] refines background coefficients one at a time with
//!   the profile parameters held fixed.
//!
//! Both record a [`FitTrace`] and report the [`CalculatedPattern`] of their best
//! state.

pub mod acceptance;
pub mod background;
pub mod config;
pub mod pattern;
pub mod proposal;
pub mod random_walk;
pub mod trace;

pub use acceptance::{accept, acceptance_probability, Annealer, DEGENERATE_CEILING, MAX_TEMPERATURE, MIN_TEMPERATURE};
pub use background::{BackgroundRefineResult, BackgroundRefinement};
pub use config::{BackgroundRefineConfig, GroupStrategy, RandomWalkConfig, WalkStyle};
pub use pattern::CalculatedPattern;
pub use proposal::{Proposal, ProposalEngine};
pub use random_walk::{ParameterSummary, RandomWalk, RandomWalkResult};
pub use trace::{FitTrace, TraceEntry, TRACE_INVALID_RWP};
