// promp_bbo/src/error.rs

use thiserror::Error;

/// Errors raised while constructing, sampling, or updating the search
/// distribution, or while driving the optimization loop.
#[derive(Debug, Error)]
pub enum BboError {
    #[error("mean has dimension {mean_dim} but covariance is {rows}x{cols}")]
    DimensionMismatch {
        mean_dim: usize,
        rows: usize,
        cols: usize,
    },

    #[error("covariance is not positive-definite, Cholesky factorization failed")]
    CovarianceNotPositiveDefinite,

    #[error("eliteness must be positive and finite, got {0}")]
    InvalidEliteness(f64),

    #[error("covariance decay factor must lie in (0, 1], got {0}")]
    InvalidDecayFactor(f64),

    #[error("updater received {samples} samples but {costs} costs")]
    BatchMismatch { samples: usize, costs: usize },

    #[error("sample batch must contain at least one sample")]
    EmptyBatch,

    #[error("update {update}: every sample in the batch failed to evaluate")]
    AllSamplesFailed { update: usize },
}
