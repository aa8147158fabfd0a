//! Small numeric helpers over fixed-length `f64` slices.

/// Dot product of two equal-length vectors
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "dot product of mismatched vectors");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean length of a vector
pub fn magnitude(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine of the angle between two vectors.
///
/// Returns `None` when either vector is empty or has zero magnitude, since
/// the angle is undefined there.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let denominator = magnitude(a) * magnitude(b);
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some(dot(a, b) / denominator)
}

/// Concatenate vectors in order
pub fn join(vectors: &[&[f64]]) -> Vec<f64> {
    let mut joined = Vec::with_capacity(vectors.iter().map(|v| v.len()).sum());
    for v in vectors {
        joined.extend_from_slice(v);
    }
    joined
}
