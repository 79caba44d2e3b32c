//! Local feature-hashing embedder

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::embedding::Embedder;
use crate::domain::CacheError;

const DEFAULT_DIMENSIONS: usize = 256;

/// Bag-of-words embedder that needs no model or network access
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets with a signed weight, and the result is L2-normalized. Texts
/// sharing most of their words land close together, which is enough to
/// exercise the semantic layer in demos and tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimensions` components
    ///
    /// A dimension of zero is raised to one.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);

        let hash = u64::from_le_bytes(bytes);
        let index = (hash % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };

        (index, sign)
    }

    fn vectorize(&self, text: &str) -> Option<Vec<f32>> {
        let lowered = text.to_lowercase();
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let (index, sign) = self.bucket(token);
            vector[index] += sign;
            tokens += 1;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

        if tokens == 0 || norm == 0.0 {
            return None;
        }

        vector.iter_mut().for_each(|v| *v /= norm);

        Some(vector)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CacheError> {
        self.vectorize(text)
            .ok_or_else(|| CacheError::embedding("Text has no embeddable tokens"))
    }

    fn provider_name(&self) -> &'static str {
        "hashing"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_embedding_is_normalized() {
        let embedder = HashingEmbedder::default();
        let vector = embedder.embed("What is the capital of France?").await.unwrap();

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

        assert_eq!(vector.len(), 256);
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let embedder = HashingEmbedder::new(64);

        let first = embedder.embed("hello world").await.unwrap();
        let second = embedder.embed("hello world").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_case_and_punctuation_do_not_matter() {
        let embedder = HashingEmbedder::default();

        let a = embedder.embed("What is the capital of France?").await.unwrap();
        let b = embedder.embed("what is the CAPITAL of france").await.unwrap();

        let similarity = cosine_similarity(&a, &b).unwrap();
        assert!((similarity - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_words_are_more_similar() {
        let embedder = HashingEmbedder::default();

        let base = embedder.embed("what is the capital of france").await.unwrap();
        let close = embedder.embed("tell me the capital of france").await.unwrap();
        let far = embedder.embed("how do i bake sourdough bread").await.unwrap();

        let close_similarity = cosine_similarity(&base, &close).unwrap();
        let far_similarity = cosine_similarity(&base, &far).unwrap();

        assert!(close_similarity > far_similarity);
    }

    #[tokio::test]
    async fn test_text_without_tokens_fails() {
        let embedder = HashingEmbedder::default();

        let result = embedder.embed("  ?! ").await;

        assert!(matches!(result, Err(CacheError::Embedding { .. })));
    }

    #[test]
    fn test_metadata() {
        let embedder = HashingEmbedder::new(0);

        assert_eq!(embedder.provider_name(), "hashing");
        assert_eq!(embedder.dimensions(), Some(1));
    }
}
