// promp_core/src/kinematics/mod.rs

pub mod planar;

use crate::types::Pose;
use dyn_clone::DynClone;
use nalgebra::DVector;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    #[error("expected {expected} joint angles, got {got}")]
    WrongDofCount { expected: usize, got: usize },

    #[error("joint {joint} angle is not finite")]
    NonFiniteJoint { joint: usize },

    #[error("joint {joint} angle {angle:.4} violates its limit [{min:.4}, {max:.4}]")]
    JointLimitViolated {
        joint: usize,
        angle: f64,
        min: f64,
        max: f64,
    },
}

/// Maps a joint configuration to the pose of the end-effector.
///
/// Implementations must be cheap to call: the cost model invokes this once
/// per scored sample, and once per timestep for cartesian diagnostics.
pub trait ForwardKinematics: DynClone + Debug + Send + Sync {
    /// Number of joints the model expects.
    fn dof(&self) -> usize;

    /// End-effector pose for one joint configuration.
    fn end_effector_pose(&self, joints: &DVector<f64>) -> Result<Pose, KinematicsError>;
}

// This allows us to clone Box<dyn ForwardKinematics>
dyn_clone::clone_trait_object!(ForwardKinematics);
