//! Embedding collaborator and vector similarity

mod provider;
mod similarity;

pub use provider::Embedder;
pub use similarity::cosine_similarity;

#[cfg(test)]
pub use provider::fake::TableEmbedder;
#[cfg(test)]
pub use provider::MockEmbedder;
