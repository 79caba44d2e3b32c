//! Vector similarity

/// Cosine similarity between two vectors, clamped to [-1, 1]
///
/// Returns `None` for vectors that can never match: empty, of different
/// lengths, zero-norm or containing non-finite components.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let similarity = dot_product / (norm_a * norm_b);

    if !similarity.is_finite() {
        return None;
    }

    Some(similarity.clamp(-1.0, 1.0))
}
