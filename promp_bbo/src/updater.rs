// promp_bbo/src/updater.rs

use crate::distribution::DistributionGaussian;
use crate::error::BboError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// How a batch of costs maps to per-sample weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightingMethod {
    /// Path-integral style: continuous weights `exp(-h * (c - min) / range)`,
    /// with `h` the eliteness.
    PiBb,
    /// Cross-entropy method: the best `eliteness` samples share the weight
    /// equally, the rest get none.
    CrossEntropy,
    /// CMA-ES style rank weights `ln(mu + 1/2) - ln(rank + 1)` over the best
    /// `mu = eliteness` samples.
    CmaEs,
}

/// Maps a batch of costs to normalized weights that sum to one. Lower cost
/// means higher weight.
///
/// Non-finite costs get zero weight. A batch whose finite costs are
/// indistinguishable (or that has no finite cost at all) degenerates to
/// uniform weights, so a flat batch cannot steer the mean through
/// floating-point noise.
pub fn costs_to_weights(costs: &[f64], method: WeightingMethod, eliteness: f64) -> Vec<f64> {
    let n = costs.len();
    if n == 0 {
        return Vec::new();
    }
    let uniform = vec![1.0 / n as f64; n];

    let finite: Vec<usize> = (0..n).filter(|&i| costs[i].is_finite()).collect();
    if finite.is_empty() {
        return uniform;
    }

    let mut weights = vec![0.0; n];
    match method {
        WeightingMethod::PiBb => {
            let min = finite.iter().map(|&i| costs[i]).fold(f64::INFINITY, f64::min);
            let max = finite.iter().map(|&i| costs[i]).fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            if range == 0.0 {
                for &i in &finite {
                    weights[i] = 1.0;
                }
            } else {
                for &i in &finite {
                    weights[i] = (-eliteness * (costs[i] - min) / range).exp();
                }
            }
        }
        WeightingMethod::CrossEntropy | WeightingMethod::CmaEs => {
            let mut ranked = finite.clone();
            ranked.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
            let mu = (eliteness.round().max(1.0) as usize).min(ranked.len());
            for (rank, &i) in ranked.iter().take(mu).enumerate() {
                weights[i] = match method {
                    WeightingMethod::CrossEntropy => 1.0 / mu as f64,
                    WeightingMethod::CmaEs => (mu as f64 + 0.5).ln() - ((rank + 1) as f64).ln(),
                    WeightingMethod::PiBb => unreachable!(),
                };
            }
        }
    }

    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return uniform;
    }
    for w in &mut weights {
        *w /= sum;
    }

    // Relative standard deviation below noise level means the weighting did
    // not actually discriminate between samples.
    let mean_w = 1.0 / n as f64;
    let var = weights.iter().map(|w| (w - mean_w).powi(2)).sum::<f64>() / n as f64;
    if var.sqrt() / mean_w < 1e-10 {
        return uniform;
    }

    weights
}

/// Revises the search distribution from one scored batch.
pub trait Updater: Debug + Send + Sync {
    fn update_distribution(
        &self,
        current: &DistributionGaussian,
        samples: &[DVector<f64>],
        costs: &[f64],
    ) -> Result<DistributionUpdate, BboError>;
}

/// The result of one distribution update: the revised distribution plus the
/// per-sample weights that produced it.
#[derive(Debug, Clone)]
pub struct DistributionUpdate {
    pub distribution: DistributionGaussian,
    pub weights: Vec<f64>,
}

/// Reward-weighted mean update with a fixed covariance decay each round.
///
/// Only the mean follows the data. The covariance is multiplied by `decay^2`
/// every update, so exploration tightens geometrically no matter what the
/// batch looked like.
#[derive(Debug, Clone)]
pub struct UpdaterCovarDecay {
    eliteness: f64,
    weighting: WeightingMethod,
    covar_decay_factor: f64,
}

impl UpdaterCovarDecay {
    pub fn new(
        eliteness: f64,
        weighting: WeightingMethod,
        covar_decay_factor: f64,
    ) -> Result<Self, BboError> {
        if !eliteness.is_finite() || eliteness <= 0.0 {
            return Err(BboError::InvalidEliteness(eliteness));
        }
        if !(covar_decay_factor > 0.0 && covar_decay_factor <= 1.0) {
            return Err(BboError::InvalidDecayFactor(covar_decay_factor));
        }
        Ok(Self {
            eliteness,
            weighting,
            covar_decay_factor,
        })
    }
}

impl Updater for UpdaterCovarDecay {
    fn update_distribution(
        &self,
        current: &DistributionGaussian,
        samples: &[DVector<f64>],
        costs: &[f64],
    ) -> Result<DistributionUpdate, BboError> {
        if samples.len() != costs.len() {
            return Err(BboError::BatchMismatch {
                samples: samples.len(),
                costs: costs.len(),
            });
        }
        if samples.is_empty() {
            return Err(BboError::EmptyBatch);
        }

        let weights = costs_to_weights(costs, self.weighting, self.eliteness);

        let mut mean = DVector::zeros(current.dim());
        for (sample, w) in samples.iter().zip(&weights) {
            mean += sample * *w;
        }

        let decay_sq = self.covar_decay_factor * self.covar_decay_factor;
        let covar = current.covar() * decay_sq;

        Ok(DistributionUpdate {
            distribution: DistributionGaussian::new(mean, covar)?,
            weights,
        })
    }
}
