//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::CacheError;

#[cfg(test)]
use mockall::automock;

/// Turns text into a fixed-length vector for similarity comparison
///
/// Timeouts are the implementation's responsibility and surface as
/// [`CacheError::Embedding`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Embedder: Send + Sync + Debug {
    /// Generate an embedding for the given text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CacheError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the embedding dimensions, if fixed
    fn dimensions(&self) -> Option<usize>;
}

#[cfg(test)]
pub mod fake {
    use std::collections::HashMap;

    use super::*;

    /// Embedder returning preset vectors per exact text
    ///
    /// Unknown texts fail, which exercises the exact-only degradation.
    #[derive(Debug, Default)]
    pub struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.into(), vector);
            self
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, CacheError> {
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| CacheError::embedding(format!("no vector for '{}'", text)))
        }

        fn provider_name(&self) -> &'static str {
            "table"
        }

        fn dimensions(&self) -> Option<usize> {
            self.vectors.values().next().map(Vec::len)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_table_embedder() {
            let embedder = TableEmbedder::new().with_vector("hello", vec![1.0, 0.0]);

            assert_eq!(embedder.embed("hello").await.unwrap(), vec![1.0, 0.0]);
            assert!(embedder.embed("missing").await.is_err());
            assert_eq!(embedder.dimensions(), Some(2));
        }

        #[tokio::test]
        async fn test_mock_embedder_error() {
            let mut embedder = MockEmbedder::new();
            embedder
                .expect_embed()
                .returning(|_| Err(CacheError::embedding("model unavailable")));

            let result = embedder.embed("Hello").await;

            assert!(matches!(result, Err(CacheError::Embedding { .. })));
        }
    }
}
