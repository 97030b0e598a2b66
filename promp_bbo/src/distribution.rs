// promp_bbo/src/distribution.rs

use crate::error::BboError;
use nalgebra::{Cholesky, DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// A multivariate Gaussian search distribution over candidate samples.
///
/// This is the object the optimization loop narrows: updaters pull its mean
/// toward cheap samples and shrink its covariance between rounds.
#[derive(Debug, Clone)]
pub struct DistributionGaussian {
    mean: DVector<f64>,
    covar: DMatrix<f64>,
}

impl DistributionGaussian {
    /// Builds a distribution from its first two moments.
    ///
    /// The covariance must be square with the mean's dimension. Whether it is
    /// actually positive-definite is only discovered by `generate_samples`,
    /// which needs the factorization.
    pub fn new(mean: DVector<f64>, covar: DMatrix<f64>) -> Result<Self, BboError> {
        if covar.nrows() != mean.len() || covar.ncols() != mean.len() {
            return Err(BboError::DimensionMismatch {
                mean_dim: mean.len(),
                rows: covar.nrows(),
                cols: covar.ncols(),
            });
        }
        Ok(Self { mean, covar })
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn covar(&self) -> &DMatrix<f64> {
        &self.covar
    }

    /// Dimension of the sample space.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Consumes the distribution, returning `(mean, covariance)`.
    pub fn into_parts(self) -> (DVector<f64>, DMatrix<f64>) {
        (self.mean, self.covar)
    }

    /// Draws `n` samples as `x = mean + L * z`, where `z ~ N(0, I)` and
    /// `L * L^T` is the Cholesky factorization of the covariance.
    pub fn generate_samples<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<DVector<f64>>, BboError> {
        let chol = Cholesky::new(self.covar.clone())
            .ok_or(BboError::CovarianceNotPositiveDefinite)?;
        let l = chol.l();

        let dim = self.dim();
        let mut samples = Vec::with_capacity(n);
        for _ in 0..n {
            let z = DVector::from_fn(dim, |_, _| StandardNormal.sample(rng));
            samples.push(&self.mean + &l * z);
        }
        Ok(samples)
    }
}
