//! Error types for the performance monitor.

use thiserror::Error;

/// Errors that can occur in the performance monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode or decode a profile or result
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No stored profile with this name
    #[error("Configuration profile not found: {0}")]
    ProfileNotFound(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom metric could not produce a value
    #[error("Sampling failed for metric '{metric}': {reason}")]
    Sampling { metric: String, reason: String },

    /// Writing a log, report or profile failed
    #[error("Failed to write {artifact}: {reason}")]
    Persistence { artifact: String, reason: String },

    /// The queued writer has been shut down
    #[error("Artifact writer has shut down")]
    SinkClosed,
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MonitorError::ProfileNotFound("Mobile".to_string());
        assert_eq!(err.to_string(), "Configuration profile not found: Mobile");

        let err = MonitorError::Sampling {
            metric: "draw_calls".to_string(),
            reason: "renderer unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sampling failed for metric 'draw_calls': renderer unavailable"
        );
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err: Result<(), serde_json::Error> = serde_json::from_str::<()>("invalid json");
        let err: MonitorError = json_err.unwrap_err().into();
        assert!(matches!(err, MonitorError::Serialization(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MonitorError = io.into();
        assert!(matches!(err, MonitorError::Io(_)));
    }
}
