use nalgebra::{DMatrix, DVector};
use sprs::TriMat;

/*
Damped Newton iteration over the assembled hydraulic system. The step
direction comes from an LU factorization of the (densified) sparse
Jacobian; a halving line search guards against residual increase. A
non-converged solve still returns the best state reached - the driver
decides what to do with it.
 */
#[derive(Clone, Copy, Debug)]
pub struct NewtonConfig {
    pub max_iterations: usize,
    /// Convergence threshold on the infinity norm of the residual.
    pub tolerance: f64,
    pub max_halvings: usize,
}

impl Default for NewtonConfig {
    fn default() -> NewtonConfig {
        NewtonConfig {
            max_iterations: 100,
            tolerance: 1e-6,
            max_halvings: 10,
        }
    }
}

pub struct NewtonSolution {
    pub x: DVector<f64>,
    pub residual_inf: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Set when the Jacobian could not be factorized.
    pub singular: bool,
}

pub fn solve_damped<F>(x0: DVector<f64>, config: &NewtonConfig, mut eval: F) -> NewtonSolution
where
    F: FnMut(&DVector<f64>) -> (DVector<f64>, TriMat<f64>),
{
    let n = x0.len();
    let mut x = x0;
    let (mut residual, mut jac) = eval(&x);
    let mut r_norm = residual.amax();

    let mut iterations = 0;
    while iterations < config.max_iterations {
        if r_norm < config.tolerance {
            return NewtonSolution {
                x,
                residual_inf: r_norm,
                iterations,
                converged: true,
                singular: false,
            };
        }
        iterations += 1;

        let dense = densify(&jac, n);
        let dx = match dense.lu().solve(&(-&residual)) {
            Some(dx) => dx,
            None => {
                return NewtonSolution {
                    x,
                    residual_inf: r_norm,
                    iterations,
                    converged: false,
                    singular: true,
                }
            }
        };

        // Halving line search: back off while the residual grows, but
        // never stall - the smallest step is taken if nothing improves.
        let mut alpha = 1.0;
        let mut halvings = 0;
        loop {
            let x_trial = &x + &dx * alpha;
            let (r_trial, jac_trial) = eval(&x_trial);
            let trial_norm = r_trial.amax();
            if trial_norm < r_norm || halvings >= config.max_halvings {
                x = x_trial;
                residual = r_trial;
                jac = jac_trial;
                r_norm = trial_norm;
                break;
            }
            alpha *= 0.5;
            halvings += 1;
        }
    }

    let converged = r_norm < config.tolerance;
    NewtonSolution {
        x,
        residual_inf: r_norm,
        iterations,
        converged,
        singular: false,
    }
}

/// Accumulate the triplet Jacobian into a dense matrix for the LU
/// solve. Duplicate entries add, matching sparse-matrix semantics.
fn densify(triplets: &TriMat<f64>, n: usize) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(n, n);
    for (value, (row, col)) in triplets.triplet_iter() {
        dense[(row, col)] += *value;
    }
    dense
}
