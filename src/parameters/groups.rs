//! Parameter groups refined together in one random-walk sub-step
//!
//! Groups come either from an explicit setup table (one row per parameter with its
//! group id and step coefficients) or from the built-in grouping of time-of-flight
//! profile parameters.

use crate::error::{LeBailError, Result};
use crate::parameters::set::ParameterSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One row of an explicit group setup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSetupEntry {
    /// Parameter name
    pub name: String,

    /// Group id; groups are refined in order of first appearance
    pub group: i32,

    /// Additive step coefficient
    #[serde(default)]
    pub a0: f64,

    /// Multiplicative step coefficient
    #[serde(default)]
    pub a1: f64,

    #[serde(default)]
    pub non_negative: bool,
}

impl GroupSetupEntry {
    pub fn new(name: &str, group: i32, a0: f64, a1: f64, non_negative: bool) -> Self {
        Self {
            name: name.to_string(),
            group,
            a0,
            a1,
            non_negative,
        }
    }
}

/// An ordered set of parameter indices refined together
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    /// Group id
    pub id: i32,

    /// Member indices into the owning [`ParameterSet`]
    pub members: Vec<usize>,
}

/// The fixed group layout of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGroups {
    groups: Vec<ParameterGroup>,
}

/// Built-in grouping: `(group, name, a0, a1, non_negative)`
const BUILTIN_GROUPS: &[(i32, &str, f64, f64, bool)] = &[
    // Instrument geometry
    (0, "Dtt1", 5.0, 0.0, true),
    (0, "Dtt1t", 5.0, 0.0, true),
    (0, "Dtt2t", 0.1, 1.0, false),
    (0, "Zero", 5.0, 0.0, false),
    (0, "Zerot", 5.0, 0.0, false),
    (0, "Width", 0.0, 0.1, true),
    (0, "Tcross", 0.0, 1.0, true),
    // Rise
    (1, "Alph0", 0.05, 1.0, false),
    (1, "Alph1", 0.02, 1.0, false),
    (1, "Alph0t", 0.1, 1.0, false),
    (1, "Alph1t", 0.05, 1.0, false),
    // Decay
    (2, "Beta0", 0.5, 1.0, false),
    (2, "Beta1", 0.05, 1.0, false),
    (2, "Beta0t", 0.5, 1.0, false),
    (2, "Beta1t", 0.05, 1.0, false),
    // Width
    (3, "Sig0", 2.0, 1.0, true),
    (3, "Sig1", 2.0, 1.0, true),
    (3, "Sig2", 2.0, 1.0, true),
];

impl ParameterGroups {
    /// Build groups from an explicit setup table
    ///
    /// The step coefficients and non-negativity flags of the table are written into
    /// the parameter records.
    ///
    /// # Errors
    ///
    /// Returns [`LeBailError::ParameterNotFound`] if a row names a parameter that is
    /// not in `params`, and an error if a parameter is listed twice.
    pub fn from_setup(entries: &[GroupSetupEntry], params: &mut ParameterSet) -> Result<Self> {
        let mut groups: Vec<ParameterGroup> = Vec::new();
        let mut seen = vec![false; params.len()];

        for entry in entries {
            let index = params
                .index_of(&entry.name)
                .ok_or_else(|| LeBailError::ParameterNotFound(entry.name.clone()))?;
            if seen[index] {
                return Err(LeBailError::InvalidConfig(format!(
                    "parameter '{}' appears in more than one group entry",
                    entry.name
                )));
            }
            seen[index] = true;

            Self::configure(params, index, entry.a0, entry.a1, entry.non_negative)?;

            match groups.iter_mut().find(|g| g.id == entry.group) {
                Some(group) => group.members.push(index),
                None => groups.push(ParameterGroup {
                    id: entry.group,
                    members: vec![index],
                }),
            }
        }

        debug!("Set up {} parameter groups from table", groups.len());
        Ok(Self { groups })
    }

    /// Build the built-in grouping of time-of-flight profile parameters
    ///
    /// Names absent from `params` are skipped, and groups left empty are dropped.
    pub fn builtin(params: &mut ParameterSet) -> Result<Self> {
        let mut groups: Vec<ParameterGroup> = Vec::new();

        for &(id, name, a0, a1, non_negative) in BUILTIN_GROUPS {
            let Some(index) = params.index_of(name) else {
                continue;
            };
            Self::configure(params, index, a0, a1, non_negative)?;

            match groups.iter_mut().find(|g| g.id == id) {
                Some(group) => group.members.push(index),
                None => groups.push(ParameterGroup {
                    id,
                    members: vec![index],
                }),
            }
        }

        debug!("Set up {} built-in parameter groups", groups.len());
        Ok(Self { groups })
    }

    fn configure(params: &mut ParameterSet, index: usize, a0: f64, a1: f64, non_negative: bool) -> Result<()> {
        let param = params
            .at_mut(index)
            .ok_or_else(|| LeBailError::Other(format!("parameter index {} out of range", index)))?;
        param.a0 = a0;
        param.a1 = a1;
        param.non_negative = non_negative;
        // A non-negative parameter needs a non-empty range at or above zero
        param.effective_bounds()?;
        Ok(())
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over groups in refinement order
    pub fn iter(&self) -> impl Iterator<Item = &ParameterGroup> {
        self.groups.iter()
    }

    /// Group member names, for reporting
    pub fn member_names(&self, params: &ParameterSet) -> Vec<Vec<String>> {
        self.groups
            .iter()
            .map(|g| {
                g.members
                    .iter()
                    .filter_map(|&i| params.at(i).map(|p| p.name.clone()))
                    .collect()
            })
            .collect()
    }
}
