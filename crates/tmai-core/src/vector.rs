//! Similarity math for retrieval.

/// Computes the cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction.
/// Higher is more similar. Zero-magnitude inputs score 0.
///
/// # Panics
///
/// Panics if the vectors have different dimensions.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let dot = dot_product(a, b);
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Computes the dot product between two vectors.
///
/// # Panics
///
/// Panics if the vectors have different dimensions.
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
