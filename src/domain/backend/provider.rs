//! Backend trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::CacheError;

#[cfg(test)]
use mockall::automock;

/// The expensive, possibly slow service whose responses are cached
///
/// Failures and timeouts surface as [`CacheError::Backend`] and are never
/// cached.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Produce a response for the given request text
    async fn invoke(&self, request: &str) -> Result<String, CacheError>;
}
