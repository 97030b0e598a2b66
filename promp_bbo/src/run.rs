// promp_bbo/src/run.rs

use crate::cost::CostFunction;
use crate::distribution::DistributionGaussian;
use crate::error::BboError;
use crate::updater::Updater;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use rand::Rng;

/// Cost assigned to a sample whose evaluation failed. Prohibitive but finite,
/// so the batch can still be ranked and the updater steers the distribution
/// away from the failing region.
pub const FAILED_SAMPLE_COST: f64 = 1e12;

/// Final state of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// Mean of the final search distribution.
    pub mean: DVector<f64>,
    /// Covariance of the final search distribution.
    pub covar: DMatrix<f64>,
    /// Cost of the distribution mean at the start of each update.
    pub learning_curve: Vec<f64>,
}

/// Runs the sample / score / update loop for a fixed number of rounds.
///
/// Every sample of one round is scored against the distribution as it stood
/// at the start of that round; the updater call is the barrier between
/// rounds. Samples that fail to evaluate are kept in the batch at
/// [`FAILED_SAMPLE_COST`], and the run only aborts if an entire batch fails.
pub fn run_optimization<R: Rng + ?Sized>(
    cost_function: &dyn CostFunction,
    initial_distribution: DistributionGaussian,
    updater: &dyn Updater,
    n_updates: usize,
    n_samples_per_update: usize,
    rng: &mut R,
) -> Result<OptimizationOutcome, BboError> {
    if n_samples_per_update == 0 {
        return Err(BboError::EmptyBatch);
    }

    let mut distribution = initial_distribution;
    let mut learning_curve = Vec::with_capacity(n_updates);

    for update in 0..n_updates {
        let mean_cost = match cost_function.evaluate(distribution.mean()) {
            Ok(cost) => cost,
            Err(err) => {
                warn!("update {}: evaluating the distribution mean failed: {}", update, err);
                FAILED_SAMPLE_COST
            }
        };
        learning_curve.push(mean_cost);

        let samples = distribution.generate_samples(n_samples_per_update, rng)?;

        let mut costs = Vec::with_capacity(samples.len());
        let mut n_failed = 0usize;
        for sample in &samples {
            match cost_function.evaluate(sample) {
                Ok(cost) => costs.push(cost),
                Err(err) => {
                    warn!("update {}: penalizing sample that failed to evaluate: {}", update, err);
                    costs.push(FAILED_SAMPLE_COST);
                    n_failed += 1;
                }
            }
        }
        if n_failed == samples.len() {
            return Err(BboError::AllSamplesFailed { update });
        }

        distribution = updater
            .update_distribution(&distribution, &samples, &costs)?
            .distribution;

        debug!(
            "update {}/{}: cost at mean {:.6}",
            update + 1,
            n_updates,
            mean_cost
        );
    }

    let (mean, covar) = distribution.into_parts();
    Ok(OptimizationOutcome {
        mean,
        covar,
        learning_curve,
    })
}
