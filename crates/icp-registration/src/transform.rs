use glam::{DMat3, DMat4, DVec3};

use crate::error::{ensure_same_len, IcpError};

/// A rigid transformation stored as a 4x4 homogeneous matrix.
///
/// The top-left 3x3 block is the rotation and the top-right column is the translation.
/// Points are treated as column vectors, so a transform maps `p` to `R * p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    matrix: DMat4,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        matrix: DMat4::IDENTITY,
    };

    /// Create a transform from a row-major rotation matrix and a translation vector.
    pub fn from_rotation_translation(rotation: &[[f64; 3]; 3], translation: &[f64; 3]) -> Self {
        // glam takes columns, the rotation is given as rows
        let r = DMat3::from_cols_array_2d(rotation).transpose();
        Self::from_parts(r, DVec3::from_array(*translation))
    }

    /// Create a transform from a row-major 4x4 homogeneous matrix.
    ///
    /// The matrix is taken as-is, no orthonormality check is performed.
    pub fn from_matrix(matrix: &[[f64; 4]; 4]) -> Self {
        Self {
            matrix: DMat4::from_cols_array_2d(matrix).transpose(),
        }
    }

    pub(crate) fn from_parts(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            matrix: DMat4::from_cols(
                rotation.x_axis.extend(0.0),
                rotation.y_axis.extend(0.0),
                rotation.z_axis.extend(0.0),
                translation.extend(1.0),
            ),
        }
    }

    pub(crate) fn rotation_mat3(&self) -> DMat3 {
        DMat3::from_mat4(self.matrix)
    }

    pub(crate) fn translation_vec3(&self) -> DVec3 {
        self.matrix.w_axis.truncate()
    }

    /// The rotation block as a row-major 3x3 matrix.
    pub fn rotation(&self) -> [[f64; 3]; 3] {
        self.rotation_mat3().transpose().to_cols_array_2d()
    }

    /// The translation column.
    pub fn translation(&self) -> [f64; 3] {
        self.translation_vec3().to_array()
    }

    /// The full homogeneous matrix in row-major order.
    pub fn matrix(&self) -> [[f64; 4]; 4] {
        self.matrix.transpose().to_cols_array_2d()
    }

    /// Determinant of the rotation block.
    pub fn rotation_determinant(&self) -> f64 {
        self.rotation_mat3().determinant()
    }

    /// Returns the transform that applies `self` first and `next` afterwards, i.e. `next * self`.
    pub fn then(&self, next: &RigidTransform) -> RigidTransform {
        RigidTransform {
            matrix: next.matrix * self.matrix,
        }
    }

    /// Inverse of a rigid transform: `R^T` and `-R^T * t`.
    pub fn inverse(&self) -> RigidTransform {
        let r_inv = self.rotation_mat3().transpose();
        let t_inv = -(r_inv * self.translation_vec3());
        Self::from_parts(r_inv, t_inv)
    }

    /// Apply the transform to a single point.
    #[inline]
    pub fn apply_point(&self, point: &[f64; 3]) -> [f64; 3] {
        let p = DVec3::from_array(*point);
        (self.rotation_mat3() * p + self.translation_vec3()).to_array()
    }

    /// Transform a set of points into a pre-allocated destination.
    ///
    /// # Arguments
    ///
    /// * `src_points` - The points to transform.
    /// * `dst_points` - Destination buffer, must have the same length as `src_points`.
    pub fn transform_points(
        &self,
        src_points: &[[f64; 3]],
        dst_points: &mut [[f64; 3]],
    ) -> Result<(), IcpError> {
        ensure_same_len("src_points", src_points.len(), "dst_points", dst_points.len())?;

        let r = self.rotation_mat3();
        let t = self.translation_vec3();
        for (dst, src) in dst_points.iter_mut().zip(src_points.iter()) {
            *dst = (r * DVec3::from_array(*src) + t).to_array();
        }

        Ok(())
    }

    /// Transform a set of points in place.
    pub fn transform_points_inplace(&self, points: &mut [[f64; 3]]) {
        let r = self.rotation_mat3();
        let t = self.translation_vec3();
        for p in points.iter_mut() {
            *p = (r * DVec3::from_array(*p) + t).to_array();
        }
    }
}

/// Compute the rotation matrix from an axis and angle.
///
/// The axis does not need to be normalized, but it must not be the zero vector.
///
/// Example:
///
/// ```
/// use icp_registration::axis_angle_to_rotation_matrix;
///
/// let rotation = axis_angle_to_rotation_matrix(&[0.0, 0.0, 2.0], 0.0).unwrap();
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], IcpError> {
    let axis = DVec3::from_array(*axis);
    let magnitude = axis.length();
    if magnitude < 1e-10 {
        return Err(IcpError::InvalidParameter(
            "cannot compute rotation matrix from a zero axis".to_string(),
        ));
    }
    let DVec3 { x, y, z } = axis / magnitude;

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    Ok([
        [c + x * x * t, x * y * t - z * s, x * z * t + y * s],
        [x * y * t + z * s, c + y * y * t, y * z * t - x * s],
        [x * z * t - y * s, y * z * t + x * s, c + z * z * t],
    ])
}
