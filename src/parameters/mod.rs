//! # Parameter System
//!
//! Named, bounded model parameters for random-walk refinement.
//!
//! ## Core Components
//!
//! - [`Parameter`]: one parameter with value, bounds, step coefficients and flags
//! - [`ParameterSet`]: an index-stable collection with JSON serialization
//! - [`ParameterView`]: a parameter set paired with a value snapshot
//! - [`Bounds`] and [`BoundaryPolicy`]: intervals and how out-of-bounds proposals
//!   are brought back inside
//! - [`ParameterGroups`]: which parameters are refined together
//! - [`MoveStatistics`]: per-parameter movement statistics of a run
//!
//! ## Example Usage
//!
//! ```rust
//! use lebail_rs::parameters::{ParameterGroups, ParameterSet};
//!
//! let mut params = ParameterSet::new();
//! params.add_param_with_bounds("Dtt1", 2000.0, 1900.0, 2100.0).unwrap();
//! params.add_param("Zero", 0.0).unwrap();
//! params.add_param_with_bounds("Sig1", 10.0, 0.0, 100.0).unwrap();
//!
//! // Built-in grouping: geometry first, then peak widths
//! let groups = ParameterGroups::builtin(&mut params).unwrap();
//! assert_eq!(groups.len(), 2);
//!
//! // Snapshots are plain arrays indexed like the set
//! let snapshot = params.values();
//! let view = params.view(&snapshot);
//! assert_eq!(view.get("Sig1"), Some(10.0));
//! ```

pub mod bounds;
pub mod groups;
pub mod parameter;
pub mod set;
pub mod stats;

pub use bounds::{BoundaryPolicy, Bounds, BoundsError};
pub use groups::{GroupSetupEntry, ParameterGroup, ParameterGroups};
pub use parameter::{Parameter, ParameterError};
pub use set::{ParameterSet, ParameterView, SerializationError};
pub use stats::MoveStatistics;
