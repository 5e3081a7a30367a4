//! Error types for lattice_planner

use thiserror::Error;

/// Main error type for the planner
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Jacobian was singular (or too close to it) to solve for an update
    #[error("Jacobian is not invertible at iteration {iteration}")]
    NonInvertibleJacobian { iteration: usize },

    /// Iteration budget exhausted with the residual still above threshold
    #[error("No convergence after {iterations} iterations (cost {cost})")]
    NoConvergence { iterations: usize, cost: f64 },

    /// Malformed lattice sampling parameters
    #[error("Bad sampling parameters: {0}")]
    BadSamplingParameters(String),

    /// Invalid optimizer, motion model or seed parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed lookup table row
    #[error("Lookup table error at line {line}: {reason}")]
    LookupTable { line: usize, reason: String },

    /// Configuration could not be parsed or serialized
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for PlannerError {
    fn from(e: toml::de::Error) -> Self {
        PlannerError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for PlannerError {
    fn from(e: toml::ser::Error) -> Self {
        PlannerError::Config(e.to_string())
    }
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::NonInvertibleJacobian { iteration: 3 };
        assert_eq!(format!("{}", err), "Jacobian is not invertible at iteration 3");

        let err = PlannerError::BadSamplingParameters("nxy must be >= 1".to_string());
        assert_eq!(format!("{}", err), "Bad sampling parameters: nxy must be >= 1");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PlannerError = io_err.into();
        assert!(matches!(err, PlannerError::Io(_)));
    }

    #[test]
    fn test_error_from_toml() {
        let parse: Result<toml::Table, _> = toml::from_str("k0 = [");
        let err: PlannerError = parse.unwrap_err().into();
        assert!(matches!(err, PlannerError::Config(_)));
    }
}
