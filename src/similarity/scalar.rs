//! Similarity kernels over sparse vectors.
//! All kernels are symmetric; higher means more similar.

use crate::vector::SparseVector;

/// Compute the cosine similarity between two sparse vectors.
///
/// Returns dot(a, b) / (||a|| * ||b||)
///
/// Range: [-1.0, 1.0] where 1.0 means identical direction. A zero vector
/// has similarity 0.0 with everything.
#[inline]
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        0.0
    } else {
        (a.dot(b) / denom).clamp(-1.0, 1.0)
    }
}

/// Compute the weighted Jaccard similarity between two sparse vectors.
///
/// Returns sum(min(a[i], b[i])) / sum(max(a[i], b[i])) over the union of
/// stored indices. Intended for non-negative weights such as counts.
///
/// Range: [0.0, 1.0]. Two empty vectors have similarity 0.0.
pub fn jaccard_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (ai, av) = (a.indices(), a.values());
    let (bi, bv) = (b.indices(), b.values());
    let (mut i, mut j) = (0, 0);
    let mut min_sum = 0.0;
    let mut max_sum = 0.0;

    while i < ai.len() || j < bi.len() {
        let take_a = j >= bi.len() || (i < ai.len() && ai[i] < bi[j]);
        let take_b = i >= ai.len() || (j < bi.len() && bi[j] < ai[i]);

        if take_a {
            max_sum += av[i].max(0.0);
            i += 1;
        } else if take_b {
            max_sum += bv[j].max(0.0);
            j += 1;
        } else {
            min_sum += av[i].min(bv[j]);
            max_sum += av[i].max(bv[j]);
            i += 1;
            j += 1;
        }
    }

    if max_sum == 0.0 {
        0.0
    } else {
        min_sum / max_sum
    }
}
