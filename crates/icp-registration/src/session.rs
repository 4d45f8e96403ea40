use serde::{Deserialize, Serialize};

use crate::error::IcpError;
use crate::index::SpatialIndex;
use crate::iteration::{IterationOutput, RegistrationPass, StandardPass, TrimmedPass};
use crate::pointcloud::PointCloud;
use crate::transform::RigidTransform;

/// Parameters of the ICP drivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpParams {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Registration converges once `previous_distance / distance < 1 + decrease_threshold`.
    pub decrease_threshold: f64,
    /// Fraction of the moving points used by the trimmed variant, in (0, 1].
    pub overlap_ratio: f64,
    /// Mean squared distance at or below which the alignment is considered exact.
    pub absolute_tolerance: f64,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            decrease_threshold: 0.05,
            overlap_ratio: 1.0,
            absolute_tolerance: 1e-20,
        }
    }
}

impl IcpParams {
    /// Check that every parameter is within its valid range.
    pub fn validate(&self) -> Result<(), IcpError> {
        if self.max_iterations == 0 {
            return Err(IcpError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !(self.decrease_threshold.is_finite() && self.decrease_threshold > 0.0) {
            return Err(IcpError::InvalidParameter(format!(
                "decrease_threshold must be a positive number, got {}",
                self.decrease_threshold
            )));
        }
        if !(self.overlap_ratio > 0.0 && self.overlap_ratio <= 1.0) {
            return Err(IcpError::InvalidParameter(format!(
                "overlap_ratio must be in (0, 1], got {}",
                self.overlap_ratio
            )));
        }
        if !(self.absolute_tolerance.is_finite() && self.absolute_tolerance >= 0.0) {
            return Err(IcpError::InvalidParameter(format!(
                "absolute_tolerance must be a non-negative number, got {}",
                self.absolute_tolerance
            )));
        }
        Ok(())
    }
}

/// State of a registration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcpState {
    /// More iterations are needed.
    Running,
    /// The mean distance stopped decreasing significantly.
    Converged,
    /// The mean distance increased between two iterations.
    Diverged,
    /// The iteration budget ran out.
    MaxIterationsReached,
}

impl IcpState {
    /// Whether the session is finished.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IcpState::Running)
    }
}

/// Result of a registration.
#[derive(Debug, Clone)]
pub struct IcpResult {
    /// Transform mapping the moving cloud onto the reference cloud.
    ///
    /// When the registration diverged this is the incremental transform of the failing
    /// iteration, not the accumulated one.
    pub transform: RigidTransform,
    /// Terminal state of the registration.
    pub state: IcpState,
    /// Number of iterations performed.
    pub num_iterations: usize,
    /// Last computed mean squared distance.
    pub mean_distance: f64,
    /// Mean squared distance of every iteration.
    pub history: Vec<f64>,
    /// The moving cloud in its final pose.
    pub registered: PointCloud,
}

impl IcpResult {
    /// Whether the registration converged.
    pub fn is_converged(&self) -> bool {
        self.state == IcpState::Converged
    }
}

/// Iteration state of one registration.
///
/// The session owns the moving cloud and moves it after every accepted iteration.
#[derive(Debug, Clone)]
pub struct IcpSession {
    params: IcpParams,
    moving: PointCloud,
    accumulated: RigidTransform,
    last_transform: RigidTransform,
    mean_distance: f64,
    iteration: usize,
    state: IcpState,
    history: Vec<f64>,
}

impl IcpSession {
    /// Start a session for `moving` with the given parameters.
    pub fn new(moving: PointCloud, params: IcpParams) -> Result<Self, IcpError> {
        params.validate()?;
        Ok(Self {
            params,
            moving,
            accumulated: RigidTransform::IDENTITY,
            last_transform: RigidTransform::IDENTITY,
            mean_distance: f64::INFINITY,
            iteration: 0,
            state: IcpState::Running,
            history: Vec::new(),
        })
    }

    /// Current state.
    pub fn state(&self) -> IcpState {
        self.state
    }

    /// Number of iterations applied so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Composition of every accepted incremental transform.
    pub fn accumulated(&self) -> &RigidTransform {
        &self.accumulated
    }

    /// The moving cloud in its current pose.
    pub fn moving(&self) -> &PointCloud {
        &self.moving
    }

    /// Mean distance of the last iteration, infinity before the first one.
    pub fn mean_distance(&self) -> f64 {
        self.mean_distance
    }

    /// Apply the outcome of one pass and return the new state.
    ///
    /// The transitions are:
    /// - the mean distance increased: `Diverged`, nothing is applied;
    /// - otherwise the transform is accumulated and applied to the moving cloud, then
    ///   `Converged` if the distance is within the absolute tolerance or decreased by less
    ///   than the threshold, `MaxIterationsReached` if the budget is spent, else `Running`.
    pub fn advance(&mut self, output: IterationOutput) -> Result<IcpState, IcpError> {
        if self.state.is_terminal() {
            return Err(IcpError::InvalidState(
                "registration session already reached a terminal state",
            ));
        }

        let previous_distance = self.mean_distance;
        let distance = output.mean_distance;

        self.iteration += 1;
        self.mean_distance = distance;
        self.history.push(distance);
        self.last_transform = output.transform;

        if distance > previous_distance {
            log::warn!(
                "Distance increased at iteration {}: {} > {}",
                self.iteration,
                distance,
                previous_distance
            );
            self.state = IcpState::Diverged;
            return Ok(self.state);
        }

        self.accumulated = self.accumulated.then(&output.transform);
        self.moving.transform(&output.transform);

        self.state = if distance <= self.params.absolute_tolerance
            || previous_distance / distance < 1.0 + self.params.decrease_threshold
        {
            log::info!(
                "ICP converged in {} iterations with mean distance {}",
                self.iteration,
                distance
            );
            IcpState::Converged
        } else if self.iteration >= self.params.max_iterations {
            log::info!(
                "ICP not converged, reached maximum iterations ({})",
                self.params.max_iterations
            );
            IcpState::MaxIterationsReached
        } else {
            IcpState::Running
        };

        Ok(self.state)
    }

    /// Run passes until the session reaches a terminal state.
    pub fn run<P: RegistrationPass>(mut self, pass: &P) -> Result<IcpResult, IcpError> {
        while !self.state.is_terminal() {
            // NOTE: for debugging purposes, we measure the time taken for each iteration
            let now = std::time::Instant::now();

            let output = pass.run(self.moving.points())?;
            log::debug!(
                "Iteration: {} mean distance: {} correspondences: {}",
                self.iteration + 1,
                output.mean_distance,
                output.num_correspondences
            );

            self.advance(output)?;
            log::debug!("elapsed: {:?}", now.elapsed());
        }

        Ok(self.into_result())
    }

    /// Finish the session.
    pub fn into_result(self) -> IcpResult {
        let transform = match self.state {
            IcpState::Diverged => self.last_transform,
            _ => self.accumulated,
        };
        IcpResult {
            transform,
            state: self.state,
            num_iterations: self.iteration,
            mean_distance: self.mean_distance,
            history: self.history,
            registered: self.moving,
        }
    }
}

/// Iterative Closest Point registration using point to point distances.
///
/// # Arguments
///
/// * `reference` - The fixed point cloud.
/// * `moving` - The point cloud to align onto `reference`.
/// * `params` - Stopping criteria. `overlap_ratio` is ignored.
///
/// # Returns
///
/// The transform mapping `moving` onto `reference` together with the terminal state.
pub fn icp(
    reference: &PointCloud,
    moving: PointCloud,
    params: &IcpParams,
) -> Result<IcpResult, IcpError> {
    params.validate()?;
    let index = SpatialIndex::from_points(reference.points())?;
    IcpSession::new(moving, params.clone())?.run(&StandardPass::new(&index))
}

/// Trimmed Iterative Closest Point registration.
///
/// Each iteration estimates the transform from the `params.overlap_ratio` fraction of
/// moving points with the closest matches, which tolerates partial overlap.
///
/// # Arguments
///
/// * `reference` - The fixed point cloud.
/// * `moving` - The point cloud to align onto `reference`.
/// * `params` - Stopping criteria and overlap ratio.
pub fn icp_trimmed(
    reference: &PointCloud,
    moving: PointCloud,
    params: &IcpParams,
) -> Result<IcpResult, IcpError> {
    params.validate()?;
    let index = SpatialIndex::from_points(reference.points())?;
    IcpSession::new(moving, params.clone())?
        .run(&TrimmedPass::new(&index, params.overlap_ratio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Replays scripted pass outputs.
    struct ScriptedPass {
        outputs: RefCell<Vec<IterationOutput>>,
    }

    impl ScriptedPass {
        fn new(mut outputs: Vec<IterationOutput>) -> Self {
            outputs.reverse();
            Self {
                outputs: RefCell::new(outputs),
            }
        }
    }

    impl RegistrationPass for ScriptedPass {
        fn run(&self, _moving: &[[f64; 3]]) -> Result<IterationOutput, IcpError> {
            self.outputs
                .borrow_mut()
                .pop()
                .ok_or(IcpError::InvalidState("script exhausted"))
        }
    }

    fn shift(x: f64, mean_distance: f64) -> IterationOutput {
        IterationOutput {
            transform: RigidTransform::from_rotation_translation(
                &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                &[x, 0.0, 0.0],
            ),
            mean_distance,
            num_correspondences: 3,
        }
    }

    fn cloud() -> PointCloud {
        PointCloud::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    #[test]
    fn test_params_default_and_validate() {
        let params = IcpParams::default();
        assert_eq!(params.max_iterations, 50);
        assert_eq!(params.decrease_threshold, 0.05);
        assert_eq!(params.overlap_ratio, 1.0);
        assert!(params.validate().is_ok());

        let invalid = [
            IcpParams {
                max_iterations: 0,
                ..Default::default()
            },
            IcpParams {
                decrease_threshold: 0.0,
                ..Default::default()
            },
            IcpParams {
                decrease_threshold: f64::NAN,
                ..Default::default()
            },
            IcpParams {
                overlap_ratio: 0.0,
                ..Default::default()
            },
            IcpParams {
                overlap_ratio: 1.5,
                ..Default::default()
            },
            IcpParams {
                absolute_tolerance: -1.0,
                ..Default::default()
            },
        ];
        for params in invalid {
            assert!(matches!(
                params.validate(),
                Err(IcpError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_params_partial_json() -> Result<(), serde_json::Error> {
        let params: IcpParams = serde_json::from_str(r#"{ "max_iterations": 7 }"#)?;
        assert_eq!(
            params,
            IcpParams {
                max_iterations: 7,
                ..Default::default()
            }
        );
        Ok(())
    }

    #[test]
    fn test_advance_running_then_converged() -> Result<(), IcpError> {
        let mut session = IcpSession::new(cloud(), IcpParams::default())?;
        assert_eq!(session.mean_distance(), f64::INFINITY);

        assert_eq!(session.advance(shift(1.0, 4.0))?, IcpState::Running);
        assert_eq!(session.advance(shift(0.5, 2.0))?, IcpState::Running);
        // 2.0 / 1.95 < 1.05
        assert_eq!(session.advance(shift(0.25, 1.95))?, IcpState::Converged);

        assert_eq!(session.iteration(), 3);
        assert_eq!(session.accumulated().translation(), [1.75, 0.0, 0.0]);
        assert_eq!(session.moving().points()[0], [1.75, 0.0, 0.0]);

        // no transitions out of a terminal state
        assert!(matches!(
            session.advance(shift(0.0, 1.0)),
            Err(IcpError::InvalidState(_))
        ));

        let result = session.into_result();
        assert!(result.is_converged());
        assert_eq!(result.history, vec![4.0, 2.0, 1.95]);
        assert_eq!(result.transform.translation(), [1.75, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_advance_zero_distance_converges() -> Result<(), IcpError> {
        let mut session = IcpSession::new(cloud(), IcpParams::default())?;
        assert_eq!(session.advance(shift(0.0, 0.0))?, IcpState::Converged);
        assert_eq!(session.iteration(), 1);
        Ok(())
    }

    #[test]
    fn test_divergence_returns_incremental_transform() -> Result<(), IcpError> {
        let pass = ScriptedPass::new(vec![shift(1.0, 4.0), shift(3.0, 5.0), shift(9.0, 0.1)]);
        let session = IcpSession::new(cloud(), IcpParams::default())?;

        let result = session.run(&pass)?;
        assert_eq!(result.state, IcpState::Diverged);
        assert_eq!(result.num_iterations, 2);
        assert_eq!(result.mean_distance, 5.0);
        // the failing increment, not the accumulated [1.0, 0.0, 0.0]
        assert_eq!(result.transform.translation(), [3.0, 0.0, 0.0]);
        // the failing increment is not applied to the moving cloud
        assert_eq!(result.registered.points()[0], [1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_max_iterations_reached() -> Result<(), IcpError> {
        let params = IcpParams {
            max_iterations: 3,
            ..Default::default()
        };
        let pass = ScriptedPass::new(vec![shift(1.0, 8.0), shift(1.0, 4.0), shift(1.0, 2.0)]);

        let result = IcpSession::new(cloud(), params)?.run(&pass)?;
        assert_eq!(result.state, IcpState::MaxIterationsReached);
        assert_eq!(result.num_iterations, 3);
        assert_eq!(result.transform.translation(), [3.0, 0.0, 0.0]);
        assert_eq!(result.history, vec![8.0, 4.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_equal_distance_converges() -> Result<(), IcpError> {
        let pass = ScriptedPass::new(vec![shift(1.0, 2.0), shift(0.0, 2.0)]);
        let result = IcpSession::new(cloud(), IcpParams::default())?.run(&pass)?;
        assert_eq!(result.state, IcpState::Converged);
        assert_eq!(result.num_iterations, 2);
        Ok(())
    }

    #[test]
    fn test_pass_error_propagates() -> Result<(), IcpError> {
        let pass = ScriptedPass::new(vec![shift(1.0, 8.0)]);
        let res = IcpSession::new(cloud(), IcpParams::default())?.run(&pass);
        assert!(matches!(res, Err(IcpError::InvalidState("script exhausted"))));
        Ok(())
    }

    #[test]
    fn test_icp_rejects_invalid_input() {
        let params = IcpParams::default();
        let res = icp(&PointCloud::default(), cloud(), &params);
        assert!(matches!(res, Err(IcpError::InvalidState(_))));

        let params = IcpParams {
            overlap_ratio: 0.0,
            ..Default::default()
        };
        let res = icp_trimmed(&cloud(), cloud(), &params);
        assert!(matches!(res, Err(IcpError::InvalidParameter(_))));
    }
}
