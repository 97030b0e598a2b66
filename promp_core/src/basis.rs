// promp_core/src/basis.rs

use crate::types::BasisMatrix;

/// Builds a row-normalized Gaussian radial basis matrix with `n_steps` rows
/// over a unit phase and `num_basis` centers spread evenly across it.
///
/// Every row sums to one, so a weight block that is constant across basis
/// functions reproduces a constant joint angle.
pub fn gaussian_basis(n_steps: usize, num_basis: usize, width: f64) -> BasisMatrix {
    assert!(n_steps >= 2, "a trajectory needs at least two timesteps");
    assert!(num_basis >= 1, "at least one basis function is required");
    assert!(width > 0.0, "basis width must be positive");

    let center = |b: usize| -> f64 {
        if num_basis == 1 {
            0.5
        } else {
            b as f64 / (num_basis - 1) as f64
        }
    };

    let mut basis = BasisMatrix::zeros(n_steps, num_basis);
    for t in 0..n_steps {
        let phase = t as f64 / (n_steps - 1) as f64;
        let mut row_sum = 0.0;
        for b in 0..num_basis {
            let z = (phase - center(b)) / width;
            let activation = (-0.5 * z * z).exp();
            basis[(t, b)] = activation;
            row_sum += activation;
        }
        for b in 0..num_basis {
            basis[(t, b)] /= row_sum;
        }
    }
    basis
}
