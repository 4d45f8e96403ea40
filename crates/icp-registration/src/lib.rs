#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Aligns a moving point cloud onto a fixed reference cloud by alternating nearest neighbor
//! correspondence search and closed-form rigid transform estimation.
//!
//! ## Example
//!
//! ```rust
//! use icp_registration::{icp, IcpParams, IcpState, PointCloud};
//!
//! let reference = PointCloud::new(vec![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [0.0, 0.0, 1.0],
//! ]);
//! let moving = reference.clone();
//!
//! let result = icp(&reference, moving, &IcpParams::default())?;
//! assert_eq!(result.state, IcpState::Converged);
//! assert_eq!(result.num_iterations, 1);
//! # Ok::<(), icp_registration::IcpError>(())
//! ```

/// Nearest neighbor correspondences between two clouds.
pub mod correspondence;

/// Error types.
pub mod error;

/// Least-squares rigid transform estimation.
pub mod fit;

/// Kd-tree spatial index over a reference cloud.
pub mod index;

/// Single registration passes.
pub mod iteration;

/// Point cloud container.
pub mod pointcloud;

/// Registration drivers and their state machine.
pub mod session;

/// Rigid transforms.
pub mod transform;

pub use correspondence::{
    find_correspondences, mean_squared_distance, select_best_indices, Correspondences,
};
pub use error::IcpError;
pub use fit::{compute_centroids, fit_transformation};
pub use index::{Neighbor, SpatialIndex};
pub use iteration::{
    icp_iteration, icp_trimmed_iteration, IterationOutput, RegistrationPass, StandardPass,
    TrimmedPass,
};
pub use pointcloud::PointCloud;
pub use session::{icp, icp_trimmed, IcpParams, IcpResult, IcpSession, IcpState};
pub use transform::{axis_angle_to_rotation_matrix, RigidTransform};
