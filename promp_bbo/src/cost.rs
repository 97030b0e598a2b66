// promp_bbo/src/cost.rs

use nalgebra::DVector;
use std::error::Error;
use thiserror::Error;

/// A sample could not be scored.
///
/// The optimizer does not care why a cost function failed, only that the
/// sample is unusable, so this wraps an arbitrary cause. Callers that do care
/// can downcast through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("cost evaluation failed: {source}")]
pub struct CostError {
    #[source]
    source: Box<dyn Error + Send + Sync>,
}

impl CostError {
    pub fn new<E>(source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self {
            source: source.into(),
        }
    }
}

/// The contract for anything the optimizer can score. Lower cost is better.
///
/// `evaluate` must be a pure function of the sample: the driver is free to
/// score the samples of one update in any order, and a single instance may be
/// shared across threads.
pub trait CostFunction: Send + Sync {
    /// Scores one candidate sample.
    fn evaluate(&self, sample: &DVector<f64>) -> Result<f64, CostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("joint limit exceeded on joint {0}")]
    struct JointLimitError(usize);

    #[test]
    fn cost_error_preserves_the_cause() {
        let err = CostError::new(JointLimitError(3));
        let source = err.source().expect("cause should be recorded");
        assert!(source.downcast_ref::<JointLimitError>().is_some());
        assert!(err.to_string().contains("joint 3"));
    }

    #[test]
    fn cost_error_accepts_plain_messages() {
        let err = CostError::new("rollout diverged");
        assert!(err.to_string().contains("rollout diverged"));
    }
}
