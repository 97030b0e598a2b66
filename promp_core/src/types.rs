// promp_core/src/types.rs

use nalgebra::{DMatrix, DVector, Isometry3};

/// Flat stack of per-joint basis weights, joint-major: the weights of joint
/// `j` occupy rows `j * num_basis .. (j + 1) * num_basis`.
pub type WeightVector = DVector<f64>;

/// Joint-space trajectory, one row per timestep and one column per joint.
pub type JointTrajectory = DMatrix<f64>;

/// Basis activation matrix, one row per timestep and one column per basis
/// function. All joints share the same basis.
pub type BasisMatrix = DMatrix<f64>;

/// End-effector pose: translation plus a unit-quaternion orientation.
pub type Pose = Isometry3<f64>;
