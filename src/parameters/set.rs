//! Ordered, index-stable parameter collections
//!
//! A [`ParameterSet`] owns the parameter records of a refinement in insertion order
//! together with a name-to-index lookup built once. The random walk works on plain
//! value arrays ("snapshots") indexed the same way, so copying the current, proposed
//! and best states is a cheap array clone.

use crate::parameters::parameter::{Parameter, ParameterError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A collection of parameters with stable indices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct ParameterSet {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the set
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter with the same name already exists or if the
    /// parameter violates its own bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::parameters::{Parameter, ParameterSet};
    ///
    /// let mut params = ParameterSet::new();
    /// params.add(Parameter::new("Dtt1", 2000.0)).unwrap();
    /// assert!(params.add(Parameter::new("Dtt1", 1.0)).is_err());
    /// assert_eq!(params.len(), 1);
    /// ```
    pub fn add(&mut self, param: Parameter) -> Result<(), ParameterError> {
        if self.index.contains_key(param.name()) {
            return Err(ParameterError::DuplicateName {
                name: param.name().to_string(),
            });
        }
        param.validate()?;
        self.index.insert(param.name().to_string(), self.params.len());
        self.params.push(param);
        Ok(())
    }

    /// Add a new parameter with the given name and value
    pub fn add_param(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        self.add(Parameter::new(name, value))
    }

    /// Add a new parameter with the given name, value and bounds
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ParameterError> {
        self.add(Parameter::with_bounds(name, value, min, max)?)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        match self.index.get(name) {
            Some(&i) => self.params.get_mut(i),
            None => None,
        }
    }

    /// Parameter at a given index
    pub fn at(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.params.get_mut(index)
    }

    /// Index of the named parameter
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over the parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Current values as a snapshot array, indexed like the set
    pub fn values(&self) -> Array1<f64> {
        self.params.iter().map(|p| p.value()).collect()
    }

    /// Write a snapshot back into the parameter records
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot length does not match or a value violates
    /// its parameter's bounds. On error the set may be partially updated.
    pub fn apply(&mut self, values: &Array1<f64>) -> Result<(), ParameterError> {
        if values.len() != self.params.len() {
            return Err(ParameterError::InvalidValue {
                name: format!("<snapshot of {} values>", values.len()),
                value: values.len() as f64,
            });
        }
        for (param, &value) in self.params.iter_mut().zip(values.iter()) {
            param.set_value(value)?;
        }
        Ok(())
    }

    /// Borrow the set together with a snapshot of values
    pub fn view<'a>(&'a self, values: &'a Array1<f64>) -> ParameterView<'a> {
        ParameterView { set: self, values }
    }
}

impl TryFrom<Vec<Parameter>> for ParameterSet {
    type Error = ParameterError;

    fn try_from(params: Vec<Parameter>) -> Result<Self, Self::Error> {
        let mut set = ParameterSet::new();
        for param in params {
            set.add(param)?;
        }
        Ok(set)
    }
}

impl From<ParameterSet> for Vec<Parameter> {
    fn from(set: ParameterSet) -> Self {
        set.params
    }
}

/// Read-only view pairing parameter names with a value snapshot
///
/// Model evaluators receive a view rather than the records themselves, so the same
/// evaluator can score the current, proposed and best snapshots.
#[derive(Debug, Clone, Copy)]
pub struct ParameterView<'a> {
    set: &'a ParameterSet,
    values: &'a Array1<f64>,
}

impl<'a> ParameterView<'a> {
    /// Value of the named parameter, if present
    pub fn get(&self, name: &str) -> Option<f64> {
        self.set.index_of(name).and_then(|i| self.values.get(i).copied())
    }

    /// Value of the named parameter
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::ParameterNotFound`] if the name is unknown.
    pub fn value(&self, name: &str) -> Result<f64, ParameterError> {
        self.get(name).ok_or_else(|| ParameterError::ParameterNotFound {
            name: name.to_string(),
        })
    }

    /// Value of the named parameter, or `default` when absent
    pub fn value_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn values(&self) -> &'a Array1<f64> {
        self.values
    }

    /// Iterate over `(name, value)` pairs in set order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.set
            .params
            .iter()
            .zip(self.values.iter())
            .map(|(p, &v)| (p.name.as_str(), v))
    }
}

/// Error that can occur during serialization/deserialization
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

impl ParameterSet {
    /// Save parameters to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SerializationError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Save parameters to a JSON string
    pub fn to_json(&self) -> Result<String, SerializationError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    /// Load parameters from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, SerializationError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// Load parameters from a JSON string
    ///
    /// The document is an array of parameter records; omitted fields take their
    /// defaults (bounds `[-1e10, 1e10]`, step 1.0, refined).
    ///
    /// # Examples
    ///
    /// ```
    /// use lebail_rs::parameters::ParameterSet;
    ///
    /// let json = r#"[
    ///   {"name": "Dtt1", "value": 2000.0, "bounds": {"min": 1900.0, "max": 2100.0}},
    ///   {"name": "Zero", "value": 0.0, "refine": false}
    /// ]"#;
    ///
    /// let params = ParameterSet::from_json(json).unwrap();
    /// assert_eq!(params.len(), 2);
    /// assert_eq!(params.get("Dtt1").unwrap().max(), 2100.0);
    /// assert!(!params.get("Zero").unwrap().refine);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        let params: Vec<Parameter> = serde_json::from_str(json)?;
        Ok(ParameterSet::try_from(params)?)
    }
}
