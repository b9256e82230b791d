//! Error types for the RL core library

use thiserror::Error;

/// Core error type for RL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Invalid action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Table or space lookup outside its bounds
    #[error("Index {index} out of range for table of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `step` called before the first `reset`
    #[error("Environment must be reset before stepping")]
    ResetRequired,

    /// Render mode not supported by the environment
    #[error("Unsupported render mode: {0}")]
    UnsupportedRenderMode(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Actuator command failed
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Sensor feed failed
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RLError::OutOfRange { index: 4, len: 4 };
        assert_eq!(err.to_string(), "Index 4 out of range for table of length 4");

        let err = RLError::Config("missing environment variable VENTILATION_REST_URL".into());
        assert!(err.to_string().contains("VENTILATION_REST_URL"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: RLError = parse.unwrap_err().into();
        assert!(matches!(err, RLError::Serialization(_)));
    }
}
