// promp_core/src/prelude.rs

// A "prelude" module that re-exports the most commonly used items, so that
// downstream code can `use promp_core::prelude::*`.

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::kinematics::{ForwardKinematics, KinematicsError};

// --- Core Data Structures ---
pub use crate::cost::{CostBreakdown, CostFactors, CostModelError, RefiningCost};
pub use crate::refiner::{Refinement, RefineError, RefinerConfig, TrajectoryRefiner};
pub use crate::types::{BasisMatrix, JointTrajectory, Pose, WeightVector};

// --- Building Blocks ---
pub use crate::basis::gaussian_basis;
pub use crate::kinematics::planar::PlanarChain;

// --- Re-exports from the optimization layer ---
pub use promp_bbo::updater::WeightingMethod;
