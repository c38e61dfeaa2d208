use thiserror::Error;

/// Main error type for the GridPilot system
#[derive(Error, Debug)]
pub enum GpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for GridPilot operations
pub type GpResult<T> = Result<T, GpError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GpError::Config(format!($($arg)*))
    };
}

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::GpError::Validation(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GpError::Config("grid is empty".to_string());
        assert!(error.to_string().contains("Configuration error"));
        assert!(error.to_string().contains("grid is empty"));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let gp_err: GpError = io_err.into();
        match gp_err {
            GpError::Io(_) => (),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_macros() {
        let _config_err = config_error!("missing key: {}", "connectors");
        let _validation_err = validation_error!("need at least {} connectors", 2);
    }
}
