use rayon::prelude::*;

/// A correspondence between a query and a train descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescriptorMatch {
    /// Index into the query descriptor set.
    pub query_idx: usize,
    /// Index into the train descriptor set.
    pub train_idx: usize,
    /// Euclidean distance between both descriptors.
    pub distance: f32,
}

/// Euclidean distance between two float descriptors.
#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Find the `k` nearest train descriptors of every query descriptor.
///
/// The search is exhaustive and runs in parallel over the query set. Each
/// returned list is sorted by increasing distance and holds `min(k, train.len())`
/// matches; ties keep the lower train index first.
///
/// # Arguments
///
/// * `query` - Descriptors to find neighbours for.
/// * `train` - Descriptors to search in.
/// * `k` - Number of neighbours per query.
///
/// # Example
///
/// ```
/// use stereo_imgproc::features::knn_match;
///
/// let query = [[0.0f32, 0.0], [1.0, 1.0]];
/// let train = [[1.0f32, 1.0], [0.1, 0.0], [0.5, 0.5]];
///
/// let matches = knn_match(&query, &train, 2);
/// assert_eq!(matches[0][0].train_idx, 1);
/// assert_eq!(matches[1][0].train_idx, 0);
/// assert_eq!(matches[1][1].train_idx, 2);
/// ```
pub fn knn_match<const N: usize>(
    query: &[[f32; N]],
    train: &[[f32; N]],
    k: usize,
) -> Vec<Vec<DescriptorMatch>> {
    if k == 0 || train.is_empty() {
        return vec![Vec::new(); query.len()];
    }

    query
        .par_iter()
        .enumerate()
        .map(|(query_idx, q)| {
            let mut best: Vec<DescriptorMatch> = Vec::with_capacity(k + 1);
            for (train_idx, t) in train.iter().enumerate() {
                let distance = l2_distance(q, t);
                if best.len() == k && distance >= best[k - 1].distance {
                    continue;
                }
                let pos = best.partition_point(|m| m.distance <= distance);
                best.insert(
                    pos,
                    DescriptorMatch {
                        query_idx,
                        train_idx,
                        distance,
                    },
                );
                best.truncate(k);
            }
            best
        })
        .collect()
}

/// Apply Lowe's ratio test to k-NN matches.
///
/// A query keeps its best match only if `best.distance < ratio * second.distance`.
/// Queries with fewer than two neighbours cannot be tested and are dropped.
pub fn ratio_test(knn_matches: &[Vec<DescriptorMatch>], ratio: f32) -> Vec<DescriptorMatch> {
    knn_matches
        .iter()
        .filter_map(|m| match m.as_slice() {
            [best, second, ..] if best.distance < ratio * second.distance => Some(*best),
            _ => None,
        })
        .collect()
}
