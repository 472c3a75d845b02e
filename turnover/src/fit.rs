//! Bounded nonlinear least squares
//!
//! A Levenberg-Marquardt solver that projects every trial step back into
//! the box defined by [`Bounds`]. The parameter covariance is estimated
//! from the Jacobian at the solution, scaled by the residual variance, which
//! is what the half-life error propagation downstream expects.
use super::*;
use crate::model::Model;
use nalgebra::{DMatrix, DVector};

/// Box constraints for each parameter, inclusive on both ends
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Bounds {
        Bounds { lower, upper }
    }

    pub fn unbounded(parameters: usize) -> Bounds {
        Bounds {
            lower: vec![f64::NEG_INFINITY; parameters],
            upper: vec![f64::INFINITY; parameters],
        }
    }

    fn clamp(&self, params: &mut [f64]) {
        for (i, p) in params.iter_mut().enumerate() {
            *p = p.max(self.lower[i]).min(self.upper[i]);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FitOptions {
    /// Starting values, clamped into `bounds` before the first iteration
    pub initial: Vec<f64>,
    pub bounds: Option<Bounds>,
    pub max_iterations: usize,
    /// Relative tolerance on both the cost reduction and the step size
    pub tolerance: f64,
}

impl FitOptions {
    pub fn new(initial: Vec<f64>) -> FitOptions {
        FitOptions {
            initial,
            bounds: None,
            max_iterations: 10_000,
            tolerance: 1e-12,
        }
    }

    pub fn bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> FitOptions {
        self.bounds = Some(Bounds::new(lower, upper));
        self
    }

    pub fn max_iterations(mut self, n: usize) -> FitOptions {
        self.max_iterations = n;
        self
    }
}

/// Optimal parameters and their estimated covariance
#[derive(Clone, Debug, PartialEq)]
pub struct Fit {
    pub params: Vec<f64>,
    pub covariance: DMatrix<f64>,
    pub residual_sum_squares: f64,
    pub iterations: usize,
}

impl Fit {
    /// One standard deviation of each parameter, `sqrt(diag(covariance))`
    pub fn standard_errors(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.sqrt()).collect()
    }
}

fn residual_sum_squares<M: Model>(model: &M, x: &[f64], y: &[f64], params: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - model.eval(xi, params)).powi(2))
        .sum()
}

fn jacobian<M: Model>(model: &M, x: &[f64], params: &[f64]) -> DMatrix<f64> {
    let m = params.len();
    let mut row = vec![0.0; m];
    let mut j = DMatrix::zeros(x.len(), m);
    for (i, &xi) in x.iter().enumerate() {
        model.gradient(xi, params, &mut row);
        for (k, v) in row.iter().enumerate() {
            j[(i, k)] = *v;
        }
    }
    j
}

/// `(JᵀJ, Jᵀr)` where `r = y - f(x)`
fn normal_equations<M: Model>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let j = jacobian(model, x, params);
    let r = DVector::from_iterator(
        x.len(),
        x.iter().zip(y).map(|(&xi, &yi)| yi - model.eval(xi, params)),
    );
    let jt = j.transpose();
    (&jt * &j, &jt * &r)
}

/// Covariance from the SVD of the Jacobian, discarding singular values
/// below `eps * max(n, m) * s_max`
fn covariance<M: Model>(model: &M, x: &[f64], params: &[f64], rss: f64) -> Result<DMatrix<f64>> {
    let n = x.len();
    let m = params.len();
    if n == m {
        return Ok(DMatrix::from_element(m, m, f64::INFINITY));
    }

    let svd = jacobian(model, x, params).svd(false, true);
    let v_t = svd
        .v_t
        .ok_or(Error::Singular("SVD of the jacobian failed"))?;
    let s = &svd.singular_values;
    let threshold = f64::EPSILON * n.max(m) as f64 * s.max();

    let mut cov = DMatrix::zeros(m, m);
    for k in 0..s.len() {
        if s[k] > threshold {
            let outer = v_t.row(k).transpose() * v_t.row(k);
            cov += outer / (s[k] * s[k]);
        }
    }
    Ok(cov * (rss / (n - m) as f64))
}

/// Fit `model` to the points `(x, y)`
///
/// # Example
///
/// ```rust,ignore
/// # use turnover::*;
/// let x = [0.0, 1.0, 2.0, 4.0, 8.0];
/// let y = x.iter().map(|t| 0.9 * (-0.3 * t).exp()).collect::<Vec<_>>();
/// let fit = curve_fit(&ExpDecay, &x, &y, &FitOptions::new(vec![1.0, 1.0]))?;
/// ```
pub fn curve_fit<M: Model>(model: &M, x: &[f64], y: &[f64], options: &FitOptions) -> Result<Fit> {
    let m = model.parameters();
    if x.len() != y.len() {
        return Err(Error::LengthMismatch(x.len(), y.len()));
    }
    if options.initial.len() != m {
        return Err(Error::InitialGuess(options.initial.len(), m));
    }
    if x.len() < m {
        return Err(Error::InsufficientData {
            points: x.len(),
            params: m,
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(Error::NonFinite);
    }

    let bounds = options.bounds.clone().unwrap_or_else(|| Bounds::unbounded(m));
    let mut params = options.initial.clone();
    bounds.clamp(&mut params);

    let mut cost = residual_sum_squares(model, x, y, &params);
    if !cost.is_finite() {
        return Err(Error::NonFinite);
    }

    let tol = options.tolerance;
    let mut lambda = 1e-3;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations && !converged {
        iterations += 1;
        let (jtj, jtr) = normal_equations(model, x, y, &params);

        let mut accepted = false;
        while lambda < 1e16 {
            let mut damped = jtj.clone();
            for i in 0..m {
                damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
            }
            let step = match damped.cholesky() {
                Some(chol) => chol.solve(&jtr),
                None => {
                    lambda *= 10.0;
                    continue;
                }
            };

            let mut trial = params
                .iter()
                .zip(step.iter())
                .map(|(p, d)| p + d)
                .collect::<Vec<f64>>();
            bounds.clamp(&mut trial);

            let trial_cost = residual_sum_squares(model, x, y, &trial);
            if trial_cost.is_finite() && trial_cost <= cost {
                let step_norm = params
                    .iter()
                    .zip(&trial)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                let norm = trial.iter().map(|p| p * p).sum::<f64>().sqrt();
                let reduction = cost - trial_cost;

                params = trial;
                cost = trial_cost;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;
                converged = reduction <= tol * cost || step_norm <= tol * (norm + tol);
                break;
            }
            lambda *= 10.0;
        }

        // No step decreases the cost any further
        if !accepted {
            converged = true;
        }
    }

    if !converged {
        return Err(Error::NotConverged(iterations));
    }

    log::debug!(
        "fit converged after {} iterations: params {:?}, rss {:e}",
        iterations,
        params,
        cost
    );

    let covariance = covariance(model, x, &params, cost)?;
    Ok(Fit {
        params,
        covariance,
        residual_sum_squares: cost,
        iterations,
    })
}
