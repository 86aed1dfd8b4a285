//! Error types for tierio
//!
//! The selection algorithms themselves never fail; these errors come from
//! building policies and suites, parsing names, and loading configuration.

use thiserror::Error;

/// Common result type for tierio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for tierio
#[derive(Debug, Error)]
pub enum Error {
    // Policy definition errors
    #[error("invalid storage policy: {0}")]
    InvalidPolicy(String),

    #[error("storage policy not found: {0}")]
    PolicyNotFound(String),

    #[error("unknown storage type: {0}")]
    UnknownStorageType(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Create an invalid policy error
    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy(msg.into())
    }

    /// Create a policy not found error
    pub fn policy_not_found(name: impl Into<String>) -> Self {
        Self::PolicyNotFound(name.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this error was caused by caller input rather than by the
    /// environment
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPolicy(_) | Self::PolicyNotFound(_) | Self::UnknownStorageType(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_error() {
        assert!(Error::policy_not_found("FROZEN").is_user_error());
        assert!(Error::invalid_policy("empty storage types").is_user_error());
        assert!(Error::UnknownStorageType("TAPE".into()).is_user_error());
        assert!(!Error::configuration("missing default").is_user_error());
        assert!(!Error::Deserialization("bad toml".into()).is_user_error());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::policy_not_found("FROZEN").to_string(),
            "storage policy not found: FROZEN"
        );
        assert_eq!(
            Error::UnknownStorageType("TAPE".into()).to_string(),
            "unknown storage type: TAPE"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_user_error());
    }
}
