use thiserror::Error;

/// Error types for the lebail-rs library.
#[derive(Error, Debug)]
pub enum LeBailError {
    /// Error indicating a mismatch in array lengths.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for invalid parameter values.
    #[error("Invalid parameter value: {0}")]
    InvalidParameter(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Error for boundary constraint violations.
    #[error("Bounds error: {0}")]
    BoundsError(String),

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// The starting parameters generate peaks with unphysical profiles.
    #[error("Unphysical starting parameters: {0}")]
    UnphysicalStart(String),

    /// Error for invalid run configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unrecognized walk style name.
    #[error("Unrecognized walk style: {0}")]
    UnknownWalkStyle(String),

    /// Unrecognized run mode name.
    #[error("Unrecognized run mode: {0}")]
    UnknownRunMode(String),

    /// Error during function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error for cases that don't fit the other categories.
    #[error("Error: {0}")]
    Other(String),
}

impl From<crate::parameters::parameter::ParameterError> for LeBailError {
    fn from(err: crate::parameters::parameter::ParameterError) -> Self {
        match err {
            crate::parameters::parameter::ParameterError::ParameterNotFound { name } => {
                LeBailError::ParameterNotFound(name)
            }
            other => LeBailError::ParameterError(format!("{}", other)),
        }
    }
}

impl From<crate::parameters::bounds::BoundsError> for LeBailError {
    fn from(err: crate::parameters::bounds::BoundsError) -> Self {
        LeBailError::BoundsError(format!("{}", err))
    }
}

impl From<crate::parameters::set::SerializationError> for LeBailError {
    fn from(err: crate::parameters::set::SerializationError) -> Self {
        match err {
            crate::parameters::set::SerializationError::IoError(e) => LeBailError::IoError(e),
            crate::parameters::set::SerializationError::JsonError(e) => LeBailError::JsonError(e),
            other => LeBailError::ParameterError(format!("{}", other)),
        }
    }
}

/// Result type alias for lebail-rs operations.
pub type Result<T> = std::result::Result<T, LeBailError>;

impl From<String> for LeBailError {
    fn from(s: String) -> Self {
        LeBailError::Other(s)
    }
}

impl From<&str> for LeBailError {
    fn from(s: &str) -> Self {
        LeBailError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::parameter::ParameterError;

    #[test]
    fn test_error_display() {
        let err = LeBailError::DimensionMismatch("expected 10 points, got 9".to_string());
        assert!(format!("{}", err).contains("expected 10 points, got 9"));

        let err = LeBailError::UnphysicalStart("negative peak width".to_string());
        assert!(format!("{}", err).contains("negative peak width"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LeBailError = io_err.into();

        match err {
            LeBailError::IoError(_) => (),
            _ => panic!("Expected IoError variant"),
        }

        let str_err: LeBailError = "test error".into();
        match str_err {
            LeBailError::Other(s) => assert_eq!(s, "test error"),
            _ => panic!("Expected Other variant"),
        }

        let missing: LeBailError = ParameterError::ParameterNotFound {
            name: "Dtt1".to_string(),
        }
        .into();
        match missing {
            LeBailError::ParameterNotFound(name) => assert_eq!(name, "Dtt1"),
            _ => panic!("Expected ParameterNotFound variant"),
        }
    }
}
