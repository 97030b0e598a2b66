// promp_core/src/kinematics/planar.rs

use super::{ForwardKinematics, KinematicsError};
use crate::types::Pose;
use nalgebra::{DVector, Translation3, UnitQuaternion, Vector3};

/// Serial chain of revolute joints rotating about the world Z axis, with all
/// links in the XY plane. Each joint angle is relative to the previous link.
#[derive(Debug, Clone)]
pub struct PlanarChain {
    link_lengths: Vec<f64>,
    joint_limits: Option<Vec<(f64, f64)>>,
}

impl PlanarChain {
    pub fn new(link_lengths: Vec<f64>) -> Self {
        assert!(
            !link_lengths.is_empty(),
            "a planar chain needs at least one link"
        );
        assert!(
            link_lengths.iter().all(|l| *l > 0.0),
            "link lengths must be positive"
        );
        Self {
            link_lengths,
            joint_limits: None,
        }
    }

    /// Attaches one `(min, max)` angle pair per joint. Configurations outside
    /// the limits make `end_effector_pose` fail instead of folding the arm
    /// through itself.
    pub fn with_joint_limits(mut self, limits: Vec<(f64, f64)>) -> Self {
        assert_eq!(
            limits.len(),
            self.link_lengths.len(),
            "need exactly one limit pair per joint"
        );
        assert!(
            limits.iter().all(|(min, max)| min < max),
            "joint limits must satisfy min < max"
        );
        self.joint_limits = Some(limits);
        self
    }
}

impl ForwardKinematics for PlanarChain {
    fn dof(&self) -> usize {
        self.link_lengths.len()
    }

    fn end_effector_pose(&self, joints: &DVector<f64>) -> Result<Pose, KinematicsError> {
        if joints.len() != self.dof() {
            return Err(KinematicsError::WrongDofCount {
                expected: self.dof(),
                got: joints.len(),
            });
        }
        if let Some(joint) = joints.iter().position(|angle| !angle.is_finite()) {
            return Err(KinematicsError::NonFiniteJoint { joint });
        }
        if let Some(limits) = &self.joint_limits {
            for (joint, (&angle, &(min, max))) in joints.iter().zip(limits).enumerate() {
                if angle < min || angle > max {
                    return Err(KinematicsError::JointLimitViolated {
                        joint,
                        angle,
                        min,
                        max,
                    });
                }
            }
        }

        let mut heading = 0.0;
        let mut position = Vector3::zeros();
        for (length, angle) in self.link_lengths.iter().zip(joints.iter()) {
            heading += angle;
            position += Vector3::new(heading.cos(), heading.sin(), 0.0) * *length;
        }

        let orientation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), heading);
        Ok(Pose::from_parts(Translation3::from(position), orientation))
    }
}
