use thiserror::Error;

/// Errors produced by the cache and its collaborators
///
/// `Clone` so a single backend failure can be handed to every caller that
/// joined the same in-flight computation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Embedding error: {message}")]
    Embedding { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from the wrapped backend
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error() {
        let error = CacheError::backend("upstream timed out");
        assert_eq!(error.to_string(), "Backend error: upstream timed out");
        assert!(error.is_backend());
    }

    #[test]
    fn test_configuration_error() {
        let error = CacheError::configuration("similarity_threshold must be within [0, 1]");
        assert_eq!(
            error.to_string(),
            "Configuration error: similarity_threshold must be within [0, 1]"
        );
        assert!(!error.is_backend());
    }

    #[test]
    fn test_errors_are_cloneable() {
        let error = CacheError::embedding("model unavailable");
        assert_eq!(error.clone(), error);
    }
}
