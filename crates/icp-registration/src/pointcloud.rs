use glam::DVec3;

use crate::transform::RigidTransform;

/// An ordered set of 3d points.
///
/// The row index of a point is its identity: correspondences are reported per index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<[f64; 3]>,
}

impl PointCloud {
    /// Create a new point cloud from a list of points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self { points }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Consume the point cloud and return its points.
    pub fn into_points(self) -> Vec<[f64; 3]> {
        self.points
    }

    /// Mean of all points, `None` for an empty cloud.
    pub fn centroid(&self) -> Option<[f64; 3]> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p));
        Some((sum / self.points.len() as f64).to_array())
    }

    /// Move every point of the cloud by `transform`.
    pub fn transform(&mut self, transform: &RigidTransform) {
        transform.transform_points_inplace(&mut self.points);
    }

    /// Return a copy of the cloud moved by `transform`.
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        let mut out = self.clone();
        out.transform(transform);
        out
    }
}

impl From<Vec<[f64; 3]>> for PointCloud {
    fn from(points: Vec<[f64; 3]>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);

        assert_eq!(pointcloud.len(), 2);
        assert!(!pointcloud.is_empty());
        assert_eq!(pointcloud.points()[1], [1.0, 0.0, 0.0]);
        assert_eq!(pointcloud.centroid(), Some([0.5, 0.0, 0.0]));

        assert!(PointCloud::default().is_empty());
        assert_eq!(PointCloud::default().centroid(), None);
    }

    #[test]
    fn test_pointcloud_transform() {
        let translation = RigidTransform::from_rotation_translation(
            &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &[1.0, 2.0, 3.0],
        );

        let cloud = PointCloud::from(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let moved = cloud.transformed(&translation);
        assert_eq!(moved.points(), &[[1.0, 2.0, 3.0], [2.0, 3.0, 4.0]]);

        // the source cloud is untouched
        assert_eq!(cloud.points()[0], [0.0, 0.0, 0.0]);
        assert_eq!(moved.into_points().len(), 2);
    }
}
