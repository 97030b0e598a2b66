// promp_core/src/lib.rs

//! Movement-primitive trajectory refinement for robot arms.
//!
//! A joint trajectory is encoded as per-joint weights over a shared basis
//! matrix. [`cost::RefiningCost`] scores a weight vector against a task:
//! reach a goal pose at the end of the motion, stay plausible under the prior
//! weight distribution, and keep the joints smooth.
//! [`refiner::TrajectoryRefiner`] then drives the stochastic optimizer from
//! `promp_bbo` to pull the prior toward cheaper weights.

pub mod basis;
pub mod cost;
pub mod kinematics;
pub mod prelude;
pub mod refiner;
pub mod types;
