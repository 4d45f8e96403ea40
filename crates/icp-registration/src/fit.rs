use glam::{DMat3, DVec3};

use crate::error::{ensure_same_len, IcpError};
use crate::transform::RigidTransform;

/// Minimum number of point pairs needed to estimate a rigid transform.
pub const MIN_POINT_PAIRS: usize = 3;

/// Compute the centroids of two sets of points.
///
/// # Arguments
///
/// * `points1` - A set of points.
/// * `points2` - Another set of points.
///
/// # Returns
///
/// The centroids of the two sets of points.
pub fn compute_centroids(points1: &[[f64; 3]], points2: &[[f64; 3]]) -> ([f64; 3], [f64; 3]) {
    let (c1, c2) = centroids(points1, points2);
    (c1.to_array(), c2.to_array())
}

fn centroids(points1: &[[f64; 3]], points2: &[[f64; 3]]) -> (DVec3, DVec3) {
    let centroid = |points: &[[f64; 3]]| {
        points
            .iter()
            .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p))
            / points.len() as f64
    };
    (centroid(points1), centroid(points2))
}

fn faer_to_dmat3(m: faer::MatRef<'_, f64>) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m.read(0, 0), m.read(1, 0), m.read(2, 0)),
        DVec3::new(m.read(0, 1), m.read(1, 1), m.read(2, 1)),
        DVec3::new(m.read(0, 2), m.read(1, 2), m.read(2, 2)),
    )
}

/// Compute the least-squares rigid transform mapping `points_src` onto `points_dst`.
///
/// Point `i` of the source set is paired with point `i` of the destination set.
///
/// The algorithm:
/// 1. Compute centroids of both point sets
/// 2. Center both point sets by subtracting their respective centroids
/// 3. Compute the cross-covariance matrix H = Σ[(p_src - p_src_mean) * (p_dst - p_dst_mean)^T]
/// 4. Compute the SVD of H = U * S * V^T
/// 5. Calculate rotation matrix R = V * U^T
/// 6. If det(R) < 0, flip the sign of the last row of V^T and recompute R
/// 7. Calculate translation vector t = p_dst_mean - R * p_src_mean
///
/// For more details, see: Arun, K., Huang, T. S., and Blostein, S. D.
/// "Least-squares fitting of two 3-D point sets." IEEE PAMI, 1987.
///
/// Degenerate configurations (collinear or coincident points) are not rejected; they produce
/// a proper rotation that is poorly conditioned.
///
/// # Arguments
///
/// * `points_src` - Source point set.
/// * `points_dst` - Destination point set, same length as `points_src`.
///
/// # Returns
///
/// The transform `T` such that `T * p_src ≈ p_dst`.
pub fn fit_transformation(
    points_src: &[[f64; 3]],
    points_dst: &[[f64; 3]],
) -> Result<RigidTransform, IcpError> {
    ensure_same_len("points_src", points_src.len(), "points_dst", points_dst.len())?;
    if points_src.len() < MIN_POINT_PAIRS {
        return Err(IcpError::InsufficientPoints {
            required: MIN_POINT_PAIRS,
            actual: points_src.len(),
        });
    }

    // Identity transformation is a special case
    if points_src == points_dst {
        return Ok(RigidTransform::IDENTITY);
    }

    let (src_centroid, dst_centroid) = centroids(points_src, points_dst);

    // compute covariance matrix H = Σ[(src - src_mean) * (dst - dst_mean)^T]
    let mut h = DMat3::ZERO;
    for (p_src, p_dst) in points_src.iter().zip(points_dst.iter()) {
        let src_centered = DVec3::from_array(*p_src) - src_centroid;
        let dst_centered = DVec3::from_array(*p_dst) - dst_centroid;
        h += DMat3::from_cols(
            src_centered * dst_centered.x,
            src_centered * dst_centered.y,
            src_centered * dst_centered.z,
        );
    }

    let h_mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| h.col(j)[i]);
    let svd = h_mat.svd();
    let u = faer_to_dmat3(svd.u());
    let v = faer_to_dmat3(svd.v());

    let mut r = v * u.transpose();

    // Handle reflection case to ensure proper rotation matrix
    if r.determinant() < 0.0 {
        // the last row of V^T is the last column of V
        let v_corrected = DMat3::from_cols(v.x_axis, v.y_axis, -v.z_axis);
        r = v_corrected * u.transpose();
    }

    let t = dst_centroid - r * src_centroid;

    Ok(RigidTransform::from_parts(r, t))
}
