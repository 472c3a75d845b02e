//! Exponential models used to describe label incorporation and pool decay
//!
//! Every model exposes its analytic partial derivatives so that
//! [`curve_fit`](crate::fit::curve_fit) never has to fall back to finite
//! differences.

/// A function `f(x; params)` with a fixed number of free parameters
pub trait Model: Sync {
    /// Number of free parameters
    fn parameters(&self) -> usize;

    /// Evaluate the function at `x`
    fn eval(&self, x: f64, params: &[f64]) -> f64;

    /// Write `∂f/∂pᵢ` evaluated at `x` into `out`
    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]);
}

/// `f(x) = a * exp(-b * x)`, approaches 0 towards infinity
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ExpDecay;

/// `f(x) = 1 - a * exp(-b * x)`, approaches 1 towards infinity
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SaturatingGrowth;

/// `f(x) = a * exp(b * x)`, unbounded growth of a pool or of biomass
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ExpGrowth;

impl Model for ExpDecay {
    fn parameters(&self) -> usize {
        2
    }

    #[inline]
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * (-params[1] * x).exp()
    }

    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]) {
        let e = (-params[1] * x).exp();
        out[0] = e;
        out[1] = -params[0] * x * e;
    }
}

impl Model for SaturatingGrowth {
    fn parameters(&self) -> usize {
        2
    }

    #[inline]
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        1.0 - params[0] * (-params[1] * x).exp()
    }

    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]) {
        let e = (-params[1] * x).exp();
        out[0] = -e;
        out[1] = params[0] * x * e;
    }
}

impl Model for ExpGrowth {
    fn parameters(&self) -> usize {
        2
    }

    #[inline]
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * (params[1] * x).exp()
    }

    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]) {
        let e = (params[1] * x).exp();
        out[0] = e;
        out[1] = params[0] * x * e;
    }
}

/// Whole-cell decay as the sum of a cytosolic and a mitochondrial pool
///
/// The mitochondrial factors are determined beforehand from mitochondria-only
/// experiments, so only `[exp_factor_cyto, prefactor_cyto]` are free.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellDecay {
    pub exp_factor_mito: f64,
    pub prefactor_mito: f64,
    pub amount_cyto: f64,
    pub amount_mito: f64,
}

impl CellDecay {
    /// Evaluate with explicit cytosolic factors
    pub fn value(&self, x: f64, exp_factor_cyto: f64, prefactor_cyto: f64) -> f64 {
        let mito = self.prefactor_mito * self.amount_mito * (-self.exp_factor_mito * x).exp();
        let cyto = prefactor_cyto * self.amount_cyto * (-exp_factor_cyto * x).exp();
        cyto + mito
    }

    /// Combined pool size of both compartments
    pub fn amount_cell(&self) -> f64 {
        self.amount_cyto + self.amount_mito
    }
}

impl Model for CellDecay {
    fn parameters(&self) -> usize {
        2
    }

    #[inline]
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        self.value(x, params[0], params[1])
    }

    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]) {
        let e = (-params[0] * x).exp();
        out[0] = -params[1] * self.amount_cyto * x * e;
        out[1] = self.amount_cyto * e;
    }
}

/// Evaluate `model` on the half-open grid `start, start + step, .. < stop`
///
/// Returns `(x, f(x))` pairs, e.g. to report a fitted curve next to the
/// measurements it was fitted to.
pub fn sample_curve<M: Model>(
    model: &M,
    params: &[f64],
    start: f64,
    stop: f64,
    step: f64,
) -> Vec<(f64, f64)> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil() as usize;
    (0..n)
        .map(|i| start + i as f64 * step)
        .map(|x| (x, model.eval(x, params)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn numeric_gradient<M: Model>(model: &M, x: f64, params: &[f64]) -> Vec<f64> {
        let h = 1e-7;
        (0..params.len())
            .map(|i| {
                let mut hi = params.to_vec();
                let mut lo = params.to_vec();
                hi[i] += h;
                lo[i] -= h;
                (model.eval(x, &hi) - model.eval(x, &lo)) / (2.0 * h)
            })
            .collect()
    }

    macro_rules! check_gradient {
        ($model:expr, $x:expr, $($p:expr),+) => {{
            let params = [$($p),+];
            let mut analytic = vec![0.0; params.len()];
            $model.gradient($x, &params, &mut analytic);
            let numeric = numeric_gradient(&$model, $x, &params);
            for (a, n) in analytic.iter().zip(numeric.iter()) {
                assert!((a - n).abs() < 1e-5, "{} != {}", a, n);
            }
        }};
    }

    #[test]
    fn gradients() {
        check_gradient!(ExpDecay, 2.5, 0.9, 0.3);
        check_gradient!(SaturatingGrowth, 4.0, 0.95, 0.12);
        check_gradient!(ExpGrowth, 1.5, 1.1, 0.02);
        let cell = CellDecay {
            exp_factor_mito: 0.05,
            prefactor_mito: 1.0,
            amount_cyto: 300.0,
            amount_mito: 150.0,
        };
        check_gradient!(cell, 3.0, 0.2, 0.8);
    }

    #[test]
    fn asymptotes() {
        assert!(ExpDecay.eval(1e4, &[1.0, 1.0]).abs() < 1e-12);
        assert!((SaturatingGrowth.eval(1e4, &[1.0, 1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(ExpDecay.eval(0.0, &[0.7, 3.0]), 0.7);
    }

    #[test]
    fn cell_decay_at_zero() {
        let cell = CellDecay {
            exp_factor_mito: 0.1,
            prefactor_mito: 1.0,
            amount_cyto: 2.0,
            amount_mito: 3.0,
        };
        assert_eq!(cell.eval(0.0, &[0.4, 1.0]), cell.amount_cell());
    }

    #[test]
    fn curve_grid() {
        let curve = sample_curve(&ExpDecay, &[1.0, 0.5], 0.0, 50.0, 0.1);
        assert_eq!(curve.len(), 500);
        assert_eq!(curve[0], (0.0, 1.0));
        assert!(sample_curve(&ExpDecay, &[1.0, 0.5], 0.0, 1.0, 0.0).is_empty());
    }
}
