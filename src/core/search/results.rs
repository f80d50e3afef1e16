//! Ranking, score normalization and pagination of hits.

use std::cmp::Ordering;
use tantivy::DocAddress;

/// Sort hits by descending raw score, ties by ascending document address
pub fn rank(hits: &mut [(f32, DocAddress)]) {
    hits.sort_by(|a, b| match b.0.total_cmp(&a.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });
}

/// Divide every score by the batch maximum.
///
/// All scores become 0 when the maximum is not positive.
///
/// # Examples
///
/// ```
/// use catalog_search::core::search::normalize;
///
/// assert_eq!(normalize(&[10.0, 5.0]), vec![1.0, 0.5]);
/// assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
/// ```
pub fn normalize(raw: &[f32]) -> Vec<f32> {
    let max = raw.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|score| score / max).collect()
}

/// Keep at most `limit` ranked items starting at `offset`
pub fn paginate<T>(ranked: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    ranked.into_iter().skip(offset).take(limit).collect()
}
