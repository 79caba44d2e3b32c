//! Cache key normalization

use std::fmt;

use sha2::{Digest, Sha256};

/// Stable exact-match key derived from a normalized request
///
/// Always 64 lowercase hex characters (SHA-256), independent of request length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the hex representation of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalizes request text into exact-match cache keys
///
/// Requests differing only in casing or incidental whitespace map to the same
/// key. Punctuation is significant.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyNormalizer;

impl CacheKeyNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Lower-cases, trims and collapses whitespace runs into single spaces
    pub fn canonicalize(&self, request_text: &str) -> String {
        request_text
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Produces the exact-match key for a request
    pub fn normalize(&self, request_text: &str) -> CacheKey {
        let canonical = self.canonicalize(request_text);
        let digest = Sha256::digest(canonical.as_bytes());

        CacheKey(hex::encode(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        let normalizer = CacheKeyNormalizer::new();

        assert_eq!(
            normalizer.canonicalize("  What IS\tthe \n capital  "),
            "what is the capital"
        );
        assert_eq!(normalizer.canonicalize(""), "");
        assert_eq!(normalizer.canonicalize("   \t\n"), "");
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let normalizer = CacheKeyNormalizer::new();

        let a = normalizer.normalize("What is the capital of France?");
        let b = normalizer.normalize("  what  is the\tCAPITAL of france?\n");

        assert_eq!(a, b);
    }

    #[test]
    fn test_punctuation_is_significant() {
        let normalizer = CacheKeyNormalizer::new();

        let a = normalizer.normalize("What is the capital of France?");
        let b = normalizer.normalize("what is the capital of france");

        assert_ne!(a, b);
    }

    #[test]
    fn test_fixed_size_key() {
        let normalizer = CacheKeyNormalizer::new();

        let short = normalizer.normalize("hi");
        let long = normalizer.normalize(&"lorem ipsum ".repeat(1000));

        assert_eq!(short.as_str().len(), 64);
        assert_eq!(long.as_str().len(), 64);
        assert!(short.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_non_ascii_lowercasing() {
        let normalizer = CacheKeyNormalizer::new();

        assert_eq!(
            normalizer.normalize("ÉCOLE Straße"),
            normalizer.normalize("école straße")
        );
    }
}
