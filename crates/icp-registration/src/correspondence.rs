use rayon::prelude::*;

use crate::error::IcpError;
use crate::index::SpatialIndex;

/// Closest reference point for every query point.
///
/// All vectors are parallel to the query cloud: entry `i` belongs to query point `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correspondences {
    /// Index of the matched point in the reference cloud.
    pub reference_indices: Vec<usize>,
    /// The matched reference points.
    pub matched: Vec<[f64; 3]>,
    /// Squared distance between each query point and its match.
    pub distances: Vec<f64>,
}

impl Correspondences {
    /// Number of correspondences, equal to the number of query points.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Whether there are no correspondences.
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

/// Find the closest reference point for each point in `query`.
///
/// Queries run in parallel on the rayon thread pool. Each query writes its own output slot,
/// so the result does not depend on the number of threads.
///
/// # Arguments
///
/// * `query` - The moving points.
/// * `index` - A built spatial index over the reference points.
pub fn find_correspondences(
    query: &[[f64; 3]],
    index: &SpatialIndex<'_>,
) -> Result<Correspondences, IcpError> {
    let reference = index.points();

    let neighbors = query
        .par_iter()
        .map(|p| index.nearest(p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut correspondences = Correspondences {
        reference_indices: Vec::with_capacity(neighbors.len()),
        matched: Vec::with_capacity(neighbors.len()),
        distances: Vec::with_capacity(neighbors.len()),
    };
    for nn in neighbors {
        correspondences.reference_indices.push(nn.index);
        correspondences.matched.push(reference[nn.index]);
        correspondences.distances.push(nn.distance_sq);
    }

    Ok(correspondences)
}

/// Running mean of squared distances, accumulated in iteration order.
///
/// Uses the online update `mean = mean * i / (i + 1) + d / (i + 1)`. Returns `0.0` for an
/// empty sequence.
pub fn mean_squared_distance(distances: impl IntoIterator<Item = f64>) -> f64 {
    distances
        .into_iter()
        .enumerate()
        .fold(0.0, |mean, (i, d)| {
            let i = i as f64;
            mean * i / (i + 1.0) + d / (i + 1.0)
        })
}

/// Indices of the `n` smallest distances, returned in increasing index order.
///
/// Only the selected prefix is ordered; equal distances are resolved by the lower index.
/// `n` is clamped to the number of distances.
pub fn select_best_indices(distances: &[f64], n: usize) -> Vec<usize> {
    let n = n.min(distances.len());
    if n == 0 {
        return Vec::new();
    }

    let mut order = (0..distances.len()).collect::<Vec<_>>();
    if n < order.len() {
        order.select_nth_unstable_by(n - 1, |&a, &b| {
            distances[a].total_cmp(&distances[b]).then(a.cmp(&b))
        });
        order.truncate(n);
    }
    order.sort_unstable();

    order
}
