// promp_bbo/src/lib.rs

//! Stochastic black-box optimization over a Gaussian search distribution.
//!
//! The loop is the classic sample / score / update cycle: draw a batch of
//! candidates from the current distribution, score each with a caller-supplied
//! [`cost::CostFunction`], then let an [`updater::Updater`] pull the
//! distribution toward the cheap samples. No gradients are required, which is
//! the point: the cost function may wrap anything from a closed-form penalty
//! to a full kinematics rollout.

pub mod cost;
pub mod distribution;
pub mod error;
pub mod prelude;
pub mod run;
pub mod updater;
