// promp_core/examples/refine_planar_arm.rs

//! Refines a two-joint planar arm motion toward a displaced goal pose.
//!
//! Run with `RUST_LOG=info cargo run --example refine_planar_arm` to watch
//! the per-update progress.

use nalgebra::{DMatrix, DVector};
use promp_core::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let chain = PlanarChain::new(vec![0.6, 0.4]);
    let basis = gaussian_basis(50, 8, 0.08);
    let num_basis = basis.ncols();

    // Prior: both joints hold a constant angle over the whole motion.
    let mut prior_mean = DVector::zeros(2 * num_basis);
    prior_mean.rows_mut(0, num_basis).fill(0.8);
    prior_mean.rows_mut(num_basis, num_basis).fill(0.3);
    let prior_covar = DMatrix::identity(2 * num_basis, 2 * num_basis) * 0.01;

    // Ask the arm to end up where a different configuration would put it.
    let goal = chain.end_effector_pose(&DVector::from_vec(vec![0.4, -0.1]))?;

    let config = RefinerConfig {
        n_updates: 60,
        n_samples_per_update: 20,
        seed: Some(17),
        ..RefinerConfig::default()
    };
    let refiner = TrajectoryRefiner::new(Box::new(chain), basis, config)?;

    let cost = refiner.cost_model(&goal, prior_mean.clone(), prior_covar.clone())?;
    let before = cost.evaluate(&prior_mean)?;

    let result = refiner.refine(&goal, prior_mean, prior_covar)?;
    let after = cost.evaluate(&result.weights)?;

    println!("total cost     {:>10.5} -> {:>10.5}", before.total, after.total);
    println!("goal distance  {:>10.5} -> {:>10.5}", before.precision, after.precision);
    println!("joint jerk     {:>10.5} -> {:>10.5}", before.jerk, after.jerk);

    let last = result.trajectory.nrows() - 1;
    println!(
        "terminal joint angles: [{:.4}, {:.4}] rad",
        result.trajectory[(last, 0)],
        result.trajectory[(last, 1)]
    );
    Ok(())
}
