use thiserror::Error;

/// Top-level error type for Liga.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for LigaError` so that `?` works across crate
/// boundaries in the composition root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LigaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for LigaError {
    fn from(err: toml::de::Error) -> Self {
        LigaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LigaError {
    fn from(err: toml::ser::Error) -> Self {
        LigaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LigaError {
    fn from(err: serde_json::Error) -> Self {
        LigaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Liga operations.
pub type Result<T> = std::result::Result<T, LigaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LigaError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = LigaError::DataSource("workbook locked".to_string());
        assert_eq!(err.to_string(), "Data source error: workbook locked");

        let err = LigaError::Serialization("invalid json".to_string());
        assert_eq!(err.to_string(), "Serialization error: invalid json");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let liga_err: LigaError = io_err.into();
        assert!(matches!(liga_err, LigaError::Io(_)));
        assert!(liga_err.to_string().starts_with("I/O error:"));
        assert!(liga_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let err: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let liga_err: LigaError = err.unwrap_err().into();
        assert!(matches!(liga_err, LigaError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let liga_err: LigaError = err.unwrap_err().into();
        assert!(matches!(liga_err, LigaError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
