// promp_core/src/cost.rs

use crate::kinematics::{ForwardKinematics, KinematicsError};
use crate::types::{BasisMatrix, JointTrajectory, Pose, WeightVector};
use log::warn;
use nalgebra::{DMatrix, Dyn, LU};
use promp_bbo::cost::{CostError, CostFunction};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Multipliers blending the individual cost terms into one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostFactors {
    pub likelihood: f64,
    pub precision: f64,
    pub orientation: f64,
    pub jerk: f64,
}

impl CostFactors {
    /// True when every factor is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.likelihood, self.precision, self.orientation, self.jerk]
            .iter()
            .all(|f| f.is_finite() && *f >= 0.0)
    }
}

impl Default for CostFactors {
    fn default() -> Self {
        Self {
            likelihood: 1e-7,
            precision: 1.0,
            orientation: 0.0,
            jerk: 0.2,
        }
    }
}

/// One scored sample, broken into its terms. `total` is the factor-weighted
/// sum of the other fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub total: f64,
    pub likelihood: f64,
    pub precision: f64,
    pub orientation: f64,
    pub jerk: f64,
}

#[derive(Debug, Error)]
pub enum CostModelError {
    #[error("cost factors must be finite and non-negative")]
    InvalidCostFactors,

    #[error("prior covariance is singular to working precision")]
    SingularPriorCovariance,

    #[error(
        "prior mean has length {got} but the model expects {expected} \
         ({joints} joints x {basis} basis functions)"
    )]
    WeightDimensionMismatch {
        got: usize,
        expected: usize,
        joints: usize,
        basis: usize,
    },

    #[error("prior covariance is {rows}x{cols} but the model expects {expected}x{expected}")]
    CovarianceDimensionMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("forward kinematics failed: {0}")]
    Kinematics(#[from] KinematicsError),
}

/// Scores a flat weight vector against a task: stay close to the prior weight
/// distribution, reach the goal pose at the end of the motion, and keep the
/// joint trajectory smooth.
///
/// The prior covariance is LU-factorized once at construction, so each
/// likelihood evaluation is a single linear solve.
#[derive(Debug)]
pub struct RefiningCost {
    fk: Box<dyn ForwardKinematics>,
    basis: BasisMatrix,
    goal: Pose,
    prior_mean: WeightVector,
    prior_lu: LU<f64, Dyn, Dyn>,
    factors: CostFactors,
    num_joints: usize,
    num_basis: usize,
    negative_solves: AtomicU64,
}

impl Clone for RefiningCost {
    fn clone(&self) -> Self {
        Self {
            fk: self.fk.clone(),
            basis: self.basis.clone(),
            goal: self.goal,
            prior_mean: self.prior_mean.clone(),
            prior_lu: self.prior_lu.clone(),
            factors: self.factors,
            num_joints: self.num_joints,
            num_basis: self.num_basis,
            negative_solves: AtomicU64::new(self.negative_solves.load(Ordering::Relaxed)),
        }
    }
}

impl RefiningCost {
    pub fn new(
        fk: Box<dyn ForwardKinematics>,
        basis: BasisMatrix,
        goal: Pose,
        prior_mean: WeightVector,
        prior_covar: DMatrix<f64>,
        factors: CostFactors,
    ) -> Result<Self, CostModelError> {
        assert!(basis.nrows() > 0, "basis matrix needs at least one timestep row");
        assert!(basis.ncols() > 0, "basis matrix needs at least one basis column");

        if !factors.is_valid() {
            return Err(CostModelError::InvalidCostFactors);
        }

        let num_joints = fk.dof();
        let num_basis = basis.ncols();
        assert!(num_joints > 0, "kinematic model must have at least one joint");

        let expected = num_joints * num_basis;
        if prior_mean.len() != expected {
            return Err(CostModelError::WeightDimensionMismatch {
                got: prior_mean.len(),
                expected,
                joints: num_joints,
                basis: num_basis,
            });
        }
        if prior_covar.nrows() != expected || prior_covar.ncols() != expected {
            return Err(CostModelError::CovarianceDimensionMismatch {
                rows: prior_covar.nrows(),
                cols: prior_covar.ncols(),
                expected,
            });
        }

        let prior_lu = prior_covar.lu();
        if !prior_lu.is_invertible() {
            return Err(CostModelError::SingularPriorCovariance);
        }

        Ok(Self {
            fk,
            basis,
            goal,
            prior_mean,
            prior_lu,
            factors,
            num_joints,
            num_basis,
            negative_solves: AtomicU64::new(0),
        })
    }

    pub fn num_joints(&self) -> usize {
        self.num_joints
    }

    pub fn num_basis(&self) -> usize {
        self.num_basis
    }

    /// Expected length of every weight vector, `num_joints * num_basis`.
    pub fn weight_dim(&self) -> usize {
        self.num_joints * self.num_basis
    }

    pub fn factors(&self) -> &CostFactors {
        &self.factors
    }

    /// How many likelihood evaluations produced a negative quadratic form so
    /// far. Anything above zero means the prior covariance is not actually
    /// positive-definite.
    pub fn negative_solve_count(&self) -> u64 {
        self.negative_solves.load(Ordering::Relaxed)
    }

    /// Reconstructs the joint-space trajectory encoded by a flat weight
    /// vector: column `j` is the basis matrix times the `j`-th weight block.
    ///
    /// Panics if the weight vector length does not match `weight_dim`.
    pub fn reconstruct(&self, weights: &WeightVector) -> JointTrajectory {
        assert_eq!(
            weights.len(),
            self.weight_dim(),
            "weight vector length must be num_joints * num_basis"
        );

        let mut trajectory = JointTrajectory::zeros(self.basis.nrows(), self.num_joints);
        for j in 0..self.num_joints {
            let block = weights.rows(j * self.num_basis, self.num_basis);
            let column = &self.basis * block;
            trajectory.column_mut(j).copy_from(&column);
        }
        trajectory
    }

    fn terminal_pose(&self, trajectory: &JointTrajectory) -> Result<Pose, KinematicsError> {
        let last = trajectory.row(trajectory.nrows() - 1).transpose();
        self.fk.end_effector_pose(&last)
    }

    fn position_gap(&self, terminal: &Pose) -> f64 {
        (self.goal.translation.vector - terminal.translation.vector).norm()
    }

    fn orientation_gap(&self, terminal: &Pose) -> f64 {
        let dot = self.goal.rotation.coords.dot(&terminal.rotation.coords);
        1.0 - dot * dot
    }

    /// Euclidean distance between the goal position and the end-effector
    /// position at the final timestep.
    pub fn cost_precision(&self, trajectory: &JointTrajectory) -> Result<f64, CostModelError> {
        Ok(self.position_gap(&self.terminal_pose(trajectory)?))
    }

    /// Orientation mismatch at the final timestep, `1 - (q_goal . q_term)^2`.
    /// Zero when the orientations agree, and insensitive to the sign of
    /// either quaternion.
    pub fn cost_orientation(&self, trajectory: &JointTrajectory) -> Result<f64, CostModelError> {
        Ok(self.orientation_gap(&self.terminal_pose(trajectory)?))
    }

    /// Total absolute jerk over all joints, using third finite differences of
    /// the joint positions. Trajectories with fewer than four timesteps have
    /// zero jerk.
    pub fn cost_joint_jerk(&self, trajectory: &JointTrajectory) -> f64 {
        let mut total = 0.0;
        for j in 0..trajectory.ncols() {
            let column = trajectory.column(j);
            for t in 0..trajectory.nrows().saturating_sub(3) {
                let d3 = column[t + 3] - 3.0 * column[t + 2] + 3.0 * column[t + 1] - column[t];
                total += d3.abs();
            }
        }
        total
    }

    /// Cartesian counterpart of the jerk cost: third finite differences of
    /// the end-effector position, summed per axis. Diagnostic only, it does
    /// not enter the blended total.
    pub fn cost_cartesian_jerk(&self, trajectory: &JointTrajectory) -> Result<f64, CostModelError> {
        let mut positions = Vec::with_capacity(trajectory.nrows());
        for t in 0..trajectory.nrows() {
            let joints = trajectory.row(t).transpose();
            positions.push(self.fk.end_effector_pose(&joints)?.translation.vector);
        }

        let mut total = 0.0;
        for w in positions.windows(4) {
            let d3 = w[3] - 3.0 * w[2] + 3.0 * w[1] - w[0];
            total += d3.abs().sum();
        }
        Ok(total)
    }

    /// Mahalanobis distance of the weights from the prior mean under the
    /// prior covariance, `|d^T Sigma^-1 d|`.
    ///
    /// The quadratic form of a positive-definite prior is never negative; if
    /// a negative value shows up anyway the magnitude is kept and the event
    /// is counted, see [`RefiningCost::negative_solve_count`].
    pub fn cost_likelihood(&self, weights: &WeightVector) -> f64 {
        assert_eq!(
            weights.len(),
            self.weight_dim(),
            "weight vector length must be num_joints * num_basis"
        );

        let d = weights - &self.prior_mean;
        let solved = self
            .prior_lu
            .solve(&d)
            .expect("prior covariance was verified invertible at construction");
        let quad = d.dot(&solved);

        if quad < 0.0 {
            let seen_before = self.negative_solves.fetch_add(1, Ordering::Relaxed);
            if seen_before == 0 {
                warn!(
                    "prior covariance produced a negative quadratic form ({:.3e}); \
                     it is likely not positive-definite",
                    quad
                );
            }
        }

        quad.abs()
    }

    /// Scores one weight vector, returning every term alongside the blended
    /// total.
    pub fn evaluate(&self, sample: &WeightVector) -> Result<CostBreakdown, CostModelError> {
        let trajectory = self.reconstruct(sample);
        let terminal = self.terminal_pose(&trajectory)?;

        let likelihood = self.cost_likelihood(sample);
        let precision = self.position_gap(&terminal);
        let orientation = self.orientation_gap(&terminal);
        let jerk = self.cost_joint_jerk(&trajectory);

        let total = self.factors.likelihood * likelihood
            + self.factors.precision * precision
            + self.factors.orientation * orientation
            + self.factors.jerk * jerk;

        Ok(CostBreakdown {
            total,
            likelihood,
            precision,
            orientation,
            jerk,
        })
    }
}

impl CostFunction for RefiningCost {
    fn evaluate(&self, sample: &WeightVector) -> Result<f64, CostError> {
        RefiningCost::evaluate(self, sample)
            .map(|breakdown| breakdown.total)
            .map_err(CostError::new)
    }
}
