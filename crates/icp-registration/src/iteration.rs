use crate::correspondence::{find_correspondences, mean_squared_distance, select_best_indices};
use crate::error::IcpError;
use crate::fit::fit_transformation;
use crate::index::SpatialIndex;
use crate::transform::RigidTransform;

/// Output of a single registration pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationOutput {
    /// Incremental transform that moves the current moving cloud towards the reference.
    pub transform: RigidTransform,
    /// Mean squared distance of the correspondences used for the estimate.
    pub mean_distance: f64,
    /// Number of correspondences used for the estimate.
    pub num_correspondences: usize,
}

/// One pass of an ICP variant.
///
/// A pass only reads the moving cloud; applying the transform is left to the caller.
pub trait RegistrationPass {
    /// Run one pass on the current pose of the moving cloud.
    fn run(&self, moving: &[[f64; 3]]) -> Result<IterationOutput, IcpError>;
}

/// Run one point to point ICP pass using every correspondence.
///
/// # Arguments
///
/// * `moving` - The moving points in their current pose.
/// * `index` - A built spatial index over the reference points.
///
/// # Returns
///
/// The incremental transform and the mean squared correspondence distance.
pub fn icp_iteration(
    moving: &[[f64; 3]],
    index: &SpatialIndex<'_>,
) -> Result<IterationOutput, IcpError> {
    let correspondences = find_correspondences(moving, index)?;

    let mean_distance = mean_squared_distance(correspondences.distances.iter().copied());
    log::debug!(
        "Avg closest distance: {} over {} points",
        mean_distance,
        correspondences.len()
    );

    let transform = fit_transformation(moving, &correspondences.matched)?;

    Ok(IterationOutput {
        transform,
        mean_distance,
        num_correspondences: correspondences.len(),
    })
}

/// Run one trimmed ICP pass.
///
/// Only the `floor(overlap_ratio * moving.len())` correspondences with the smallest distances
/// contribute to the mean distance and to the transform estimate. The selected subset is
/// processed in increasing index order, so `overlap_ratio = 1.0` reproduces [`icp_iteration`].
///
/// # Arguments
///
/// * `moving` - The moving points in their current pose.
/// * `index` - A built spatial index over the reference points.
/// * `overlap_ratio` - Fraction of the moving points expected to overlap the reference.
pub fn icp_trimmed_iteration(
    moving: &[[f64; 3]],
    index: &SpatialIndex<'_>,
    overlap_ratio: f64,
) -> Result<IterationOutput, IcpError> {
    let num_overlap = (overlap_ratio * moving.len() as f64).floor() as usize;
    log::debug!("N overlapping points: {}", num_overlap);

    let correspondences = find_correspondences(moving, index)?;
    let best = select_best_indices(&correspondences.distances, num_overlap);

    let (moving_sub, matched_sub): (Vec<_>, Vec<_>) = best
        .iter()
        .map(|&i| (moving[i], correspondences.matched[i]))
        .unzip();

    let mean_distance = mean_squared_distance(best.iter().map(|&i| correspondences.distances[i]));
    log::debug!(
        "Avg closest distance: {} over {} points",
        mean_distance,
        best.len()
    );

    let transform = fit_transformation(&moving_sub, &matched_sub)?;

    Ok(IterationOutput {
        transform,
        mean_distance,
        num_correspondences: best.len(),
    })
}

/// Standard ICP: every moving point contributes.
pub struct StandardPass<'a> {
    index: &'a SpatialIndex<'a>,
}

impl<'a> StandardPass<'a> {
    /// Create a pass over a built index.
    pub fn new(index: &'a SpatialIndex<'a>) -> Self {
        Self { index }
    }
}

impl RegistrationPass for StandardPass<'_> {
    fn run(&self, moving: &[[f64; 3]]) -> Result<IterationOutput, IcpError> {
        icp_iteration(moving, self.index)
    }
}

/// Trimmed ICP: only the best matching fraction of moving points contributes.
pub struct TrimmedPass<'a> {
    index: &'a SpatialIndex<'a>,
    overlap_ratio: f64,
}

impl<'a> TrimmedPass<'a> {
    /// Create a pass over a built index with the given overlap ratio in (0, 1].
    pub fn new(index: &'a SpatialIndex<'a>, overlap_ratio: f64) -> Self {
        Self {
            index,
            overlap_ratio,
        }
    }
}

impl RegistrationPass for TrimmedPass<'_> {
    fn run(&self, moving: &[[f64; 3]]) -> Result<IterationOutput, IcpError> {
        icp_trimmed_iteration(moving, self.index, self.overlap_ratio)
    }
}
