// promp_core/src/refiner.rs

use crate::cost::{CostFactors, CostModelError, RefiningCost};
use crate::kinematics::ForwardKinematics;
use crate::types::{BasisMatrix, JointTrajectory, Pose, WeightVector};
use log::info;
use nalgebra::DMatrix;
use promp_bbo::distribution::DistributionGaussian;
use promp_bbo::error::BboError;
use promp_bbo::run::run_optimization;
use promp_bbo::updater::{UpdaterCovarDecay, WeightingMethod};
use rand::rngs::OsRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefineError {
    #[error("cost model rejected the task: {0}")]
    Cost(#[from] CostModelError),

    #[error("optimization failed: {0}")]
    Optimization(#[from] BboError),
}

/// Tunable parameters of the refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefinerConfig {
    /// Multipliers for the cost terms.
    pub factors: CostFactors,
    /// Number of sample / score / update rounds.
    pub n_updates: usize,
    /// Samples drawn per round.
    pub n_samples_per_update: usize,
    /// Selective pressure of the weighting, see [`WeightingMethod`].
    pub eliteness: f64,
    pub weighting: WeightingMethod,
    /// Per-round covariance shrink factor in `(0, 1]`.
    pub covar_decay_factor: f64,
    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            factors: CostFactors::default(),
            n_updates: 100,
            n_samples_per_update: 20,
            eliteness: 10.0,
            weighting: WeightingMethod::PiBb,
            covar_decay_factor: 0.99,
            seed: None,
        }
    }
}

/// Result of one refinement run.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Refined weight-space mean.
    pub weights: WeightVector,
    /// Joint trajectory reconstructed from the refined weights.
    pub trajectory: JointTrajectory,
    /// Cost of the distribution mean at the start of each update.
    pub learning_curve: Vec<f64>,
    /// Covariance of the search distribution when the run stopped.
    pub final_covar: DMatrix<f64>,
}

/// Pulls a prior weight distribution toward a task goal by stochastic search.
///
/// The kinematic model, basis matrix, and loop parameters are fixed at
/// construction; each [`TrajectoryRefiner::refine`] call takes its own goal
/// and prior, so one refiner serves many tasks over the same arm.
#[derive(Debug)]
pub struct TrajectoryRefiner {
    fk: Box<dyn ForwardKinematics>,
    basis: BasisMatrix,
    updater: UpdaterCovarDecay,
    config: RefinerConfig,
}

impl TrajectoryRefiner {
    pub fn new(
        fk: Box<dyn ForwardKinematics>,
        basis: BasisMatrix,
        config: RefinerConfig,
    ) -> Result<Self, RefineError> {
        assert!(
            basis.nrows() > 0 && basis.ncols() > 0,
            "basis matrix must be non-empty"
        );

        if !config.factors.is_valid() {
            return Err(CostModelError::InvalidCostFactors.into());
        }
        if config.n_samples_per_update == 0 {
            return Err(BboError::EmptyBatch.into());
        }
        let updater = UpdaterCovarDecay::new(
            config.eliteness,
            config.weighting,
            config.covar_decay_factor,
        )?;
        Ok(Self {
            fk,
            basis,
            updater,
            config,
        })
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Builds the cost model `refine` uses for this goal and prior, for
    /// callers that want per-term breakdowns of candidate weights.
    pub fn cost_model(
        &self,
        goal: &Pose,
        prior_mean: WeightVector,
        prior_covar: DMatrix<f64>,
    ) -> Result<RefiningCost, CostModelError> {
        RefiningCost::new(
            self.fk.clone(),
            self.basis.clone(),
            *goal,
            prior_mean,
            prior_covar,
            self.config.factors,
        )
    }

    /// Runs the refinement with an internally constructed generator,
    /// following the configured seed.
    pub fn refine(
        &self,
        goal: &Pose,
        prior_mean: WeightVector,
        prior_covar: DMatrix<f64>,
    ) -> Result<Refinement, RefineError> {
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut OsRng).expect("OS RNG failed"),
        };
        self.refine_with_rng(goal, prior_mean, prior_covar, &mut rng)
    }

    /// Runs the refinement, drawing every sample from the caller's generator.
    pub fn refine_with_rng<R: Rng + ?Sized>(
        &self,
        goal: &Pose,
        prior_mean: WeightVector,
        prior_covar: DMatrix<f64>,
        rng: &mut R,
    ) -> Result<Refinement, RefineError> {
        let cost = self.cost_model(goal, prior_mean.clone(), prior_covar.clone())?;
        let initial = DistributionGaussian::new(prior_mean, prior_covar)?;

        info!(
            "refining {} weights over {} updates of {} samples",
            cost.weight_dim(),
            self.config.n_updates,
            self.config.n_samples_per_update
        );

        let outcome = run_optimization(
            &cost,
            initial,
            &self.updater,
            self.config.n_updates,
            self.config.n_samples_per_update,
            rng,
        )?;

        if let (Some(first), Some(last)) =
            (outcome.learning_curve.first(), outcome.learning_curve.last())
        {
            info!(
                "cost at the distribution mean moved {:.6} -> {:.6}",
                first, last
            );
        }

        let trajectory = cost.reconstruct(&outcome.mean);
        Ok(Refinement {
            weights: outcome.mean,
            trajectory,
            learning_curve: outcome.learning_curve,
            final_covar: outcome.covar,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::gaussian_basis;
    use crate::kinematics::planar::PlanarChain;
    use nalgebra::DVector;

    const N_BASIS: usize = 5;
    const DIM: usize = 2 * N_BASIS;

    fn const_angle_weights(angles: &[f64]) -> WeightVector {
        let mut w = WeightVector::zeros(angles.len() * N_BASIS);
        for (j, angle) in angles.iter().enumerate() {
            w.rows_mut(j * N_BASIS, N_BASIS).fill(*angle);
        }
        w
    }

    fn small_prior_covar(scale: f64) -> DMatrix<f64> {
        DMatrix::identity(DIM, DIM) * (scale * scale)
    }

    #[test]
    fn default_config_matches_the_reference_settings() {
        let config = RefinerConfig::default();
        assert_eq!(config.n_updates, 100);
        assert_eq!(config.n_samples_per_update, 20);
        assert_eq!(config.eliteness, 10.0);
        assert_eq!(config.weighting, WeightingMethod::PiBb);
        assert_eq!(config.covar_decay_factor, 0.99);
        assert_eq!(config.seed, None);
        assert_eq!(config.factors.likelihood, 1e-7);
        assert_eq!(config.factors.precision, 1.0);
        assert_eq!(config.factors.orientation, 0.0);
        assert_eq!(config.factors.jerk, 0.2);
    }

    #[test]
    fn config_parses_from_toml_with_partial_overrides() {
        let config: RefinerConfig = toml::from_str(
            r#"
            n_updates = 40
            seed = 7
            weighting = "cma-es"

            [factors]
            jerk = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.n_updates, 40);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.weighting, WeightingMethod::CmaEs);
        assert_eq!(config.factors.jerk, 0.5);
        // Untouched fields keep their defaults.
        assert_eq!(config.n_samples_per_update, 20);
        assert_eq!(config.factors.precision, 1.0);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let result = toml::from_str::<RefinerConfig>("n_iterations = 5");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_loop_parameters_fail_construction() {
        let config = RefinerConfig {
            eliteness: 0.0,
            ..RefinerConfig::default()
        };
        let result = TrajectoryRefiner::new(
            Box::new(PlanarChain::new(vec![1.0, 1.0])),
            gaussian_basis(20, N_BASIS, 0.1),
            config,
        );
        assert!(matches!(
            result,
            Err(RefineError::Optimization(BboError::InvalidEliteness(_)))
        ));

        let config = RefinerConfig {
            n_samples_per_update: 0,
            ..RefinerConfig::default()
        };
        let result = TrajectoryRefiner::new(
            Box::new(PlanarChain::new(vec![1.0, 1.0])),
            gaussian_basis(20, N_BASIS, 0.1),
            config,
        );
        assert!(matches!(
            result,
            Err(RefineError::Optimization(BboError::EmptyBatch))
        ));

        let config = RefinerConfig {
            factors: CostFactors {
                likelihood: -1.0,
                ..CostFactors::default()
            },
            ..RefinerConfig::default()
        };
        let result = TrajectoryRefiner::new(
            Box::new(PlanarChain::new(vec![1.0, 1.0])),
            gaussian_basis(20, N_BASIS, 0.1),
            config,
        );
        assert!(matches!(
            result,
            Err(RefineError::Cost(CostModelError::InvalidCostFactors))
        ));
    }

    #[test]
    fn mismatched_priors_are_reported() {
        let refiner = TrajectoryRefiner::new(
            Box::new(PlanarChain::new(vec![1.0, 1.0])),
            gaussian_basis(20, N_BASIS, 0.1),
            RefinerConfig {
                seed: Some(1),
                ..RefinerConfig::default()
            },
        )
        .unwrap();

        let chain = PlanarChain::new(vec![1.0, 1.0]);
        let goal = chain.end_effector_pose(&DVector::zeros(2)).unwrap();

        let result = refiner.refine(&goal, WeightVector::zeros(7), small_prior_covar(0.05));
        assert!(matches!(
            result,
            Err(RefineError::Cost(CostModelError::WeightDimensionMismatch { .. }))
        ));
    }

    #[test]
    fn refinement_pulls_the_trajectory_toward_the_goal() {
        let chain = PlanarChain::new(vec![1.0, 1.0]);
        let goal = chain
            .end_effector_pose(&DVector::from_vec(vec![0.5, -0.2]))
            .unwrap();

        let config = RefinerConfig {
            n_updates: 60,
            n_samples_per_update: 20,
            seed: Some(7),
            ..RefinerConfig::default()
        };
        let refiner =
            TrajectoryRefiner::new(Box::new(chain), gaussian_basis(30, N_BASIS, 0.1), config)
                .unwrap();

        let prior_mean = const_angle_weights(&[0.9, 0.4]);
        let prior_covar = small_prior_covar(0.08);

        let cost = refiner
            .cost_model(&goal, prior_mean.clone(), prior_covar.clone())
            .unwrap();
        let before = cost.evaluate(&prior_mean).unwrap();

        let result = refiner.refine(&goal, prior_mean, prior_covar).unwrap();
        let after = cost.evaluate(&result.weights).unwrap();

        assert!(
            after.total < before.total,
            "total cost should improve: {} -> {}",
            before.total,
            after.total
        );
        assert!(
            after.precision < 0.7 * before.precision,
            "goal distance should shrink substantially: {} -> {}",
            before.precision,
            after.precision
        );
        assert!(result.learning_curve.last().unwrap() < result.learning_curve.first().unwrap());

        // The reconstructed trajectory matches the refined weights.
        assert_eq!(result.trajectory, cost.reconstruct(&result.weights));
    }

    #[test]
    fn a_satisfied_goal_is_not_abandoned() {
        // Two joints, three basis functions each: a six-dimensional weight
        // space over a 10-step basis. The prior already ends on the goal, so
        // refinement under a tight prior must stay in its neighborhood.
        let chain = PlanarChain::new(vec![1.0, 1.0]);
        let goal = chain
            .end_effector_pose(&DVector::from_vec(vec![0.6, -0.3]))
            .unwrap();

        let config = RefinerConfig {
            n_updates: 10,
            n_samples_per_update: 10,
            seed: Some(5),
            ..RefinerConfig::default()
        };
        let refiner =
            TrajectoryRefiner::new(Box::new(chain), gaussian_basis(10, 3, 0.15), config).unwrap();

        let mut prior_mean = WeightVector::zeros(6);
        prior_mean.rows_mut(0, 3).fill(0.6);
        prior_mean.rows_mut(3, 3).fill(-0.3);
        let prior_covar = DMatrix::identity(6, 6) * (0.01 * 0.01);

        let cost = refiner
            .cost_model(&goal, prior_mean.clone(), prior_covar.clone())
            .unwrap();
        let before = cost.evaluate(&prior_mean).unwrap();

        let result = refiner.refine(&goal, prior_mean, prior_covar).unwrap();
        let after = cost.evaluate(&result.weights).unwrap();

        // The refined mean is a weighted average of noisy samples, so allow
        // it the jitter of the sampling noise but no real regression.
        assert!(
            after.precision <= before.precision + 0.05,
            "terminal pose drifted from an already satisfied goal: {} -> {}",
            before.precision,
            after.precision
        );
    }

    #[test]
    fn a_fixed_seed_reproduces_the_run() {
        let chain = PlanarChain::new(vec![1.0, 1.0]);
        let goal = chain
            .end_effector_pose(&DVector::from_vec(vec![0.4, 0.1]))
            .unwrap();

        let config = RefinerConfig {
            n_updates: 5,
            n_samples_per_update: 8,
            seed: Some(11),
            ..RefinerConfig::default()
        };
        let refiner =
            TrajectoryRefiner::new(Box::new(chain), gaussian_basis(20, N_BASIS, 0.1), config)
                .unwrap();

        let prior_mean = const_angle_weights(&[0.6, -0.3]);

        let a = refiner
            .refine(&goal, prior_mean.clone(), small_prior_covar(0.05))
            .unwrap();
        let b = refiner
            .refine(&goal, prior_mean.clone(), small_prior_covar(0.05))
            .unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.learning_curve, b.learning_curve);

        // An external generator with the same seed walks the same path.
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let c = refiner
            .refine_with_rng(&goal, prior_mean, small_prior_covar(0.05), &mut rng)
            .unwrap();
        assert_eq!(a.weights, c.weights);
    }

    #[test]
    fn kinematic_failures_during_the_search_are_tolerated() {
        let chain = PlanarChain::new(vec![1.0, 1.0])
            .with_joint_limits(vec![(-1.0, 1.0), (-1.0, 1.0)]);
        let goal = chain
            .end_effector_pose(&DVector::from_vec(vec![0.4, 0.3]))
            .unwrap();

        let config = RefinerConfig {
            n_updates: 30,
            n_samples_per_update: 12,
            seed: Some(3),
            ..RefinerConfig::default()
        };
        let refiner =
            TrajectoryRefiner::new(Box::new(chain), gaussian_basis(20, N_BASIS, 0.1), config)
                .unwrap();

        // Prior close to the upper limit of joint 0, so a fair share of the
        // samples violate it and are penalized rather than aborting the run.
        let prior_mean = const_angle_weights(&[0.95, 0.0]);
        let prior_covar = small_prior_covar(0.05);

        let cost = refiner
            .cost_model(&goal, prior_mean.clone(), prior_covar.clone())
            .unwrap();
        let before = cost.evaluate(&prior_mean).unwrap();

        let result = refiner.refine(&goal, prior_mean, prior_covar).unwrap();
        let after = cost.evaluate(&result.weights).unwrap();

        assert!(after.precision < before.precision);
    }
}
