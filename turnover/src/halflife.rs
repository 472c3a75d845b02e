//! Half-life, turnover and the propagation of fit uncertainties into them
use crate::model::{CellDecay, ExpDecay, Model};
use nalgebra::DMatrix;
use serde::Serialize;

/// A value together with one standard deviation
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Estimate {
    pub value: f64,
    pub sd: f64,
}

impl Estimate {
    pub fn new(value: f64, sd: f64) -> Estimate {
        Estimate { value, sd }
    }

    /// Relative error `sd / value`
    pub fn relative(&self) -> f64 {
        self.sd / self.value
    }
}

/// Fitted prefactor and exponential factor of one compartment, each with
/// its standard error
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Factors {
    pub prefactor: Estimate,
    pub exp_factor: Estimate,
}

/// Half-life from the fitted factors of `a * exp(-b * t)`
///
/// Defined as `ln(2 * a) / b`: the prefactor is kept inside the logarithm,
/// so for `a = 1` this reduces to the textbook `ln(2) / b`.
#[inline]
pub fn calc_half_life(prefactor: f64, exp_factor: f64) -> f64 {
    (2.0 * prefactor).ln() / exp_factor
}

/// Standard deviation of [`calc_half_life`] by first-order propagation of
/// the parameter variances on the diagonal of `cov`
pub fn half_life_standard_deviation(prefactor: f64, exp_factor: f64, cov: &DMatrix<f64>) -> f64 {
    let sd_prefactor = cov[(0, 0)].sqrt();
    let sd_exp_factor = cov[(1, 1)].sqrt();
    let prefactor_term = (sd_prefactor / (prefactor * exp_factor)).powi(2);
    let exp_term = ((2.0 * prefactor).ln() * sd_exp_factor / exp_factor.powi(2)).powi(2);
    (prefactor_term + exp_term).sqrt()
}

/// Half-life `ln(2) / rate` of a pure exponential with its error
/// `t½ * sd_rate / rate`
pub fn rate_half_life(rate: f64, rate_sd: f64) -> Estimate {
    let half_life = std::f64::consts::LN_2 / rate;
    Estimate::new(half_life, half_life * (rate_sd / rate).abs())
}

/// Variance term shared by the gradients at `t = 0`
///
/// This is a sum of squared relative errors; an unknown amount error is
/// taken as 1.
fn gradient_variance(prefactor: Estimate, exp_factor: Estimate, amount: Estimate) -> f64 {
    prefactor.relative().powi(2) + exp_factor.relative().powi(2) + amount.relative().powi(2)
}

/// Absolute slope `a * b * N` of the decay at `t = 0` and its deviation
pub fn gradient_at_zero(factors: &Factors, amount: f64, amount_sd: Option<f64>) -> Estimate {
    let amount = Estimate::new(amount, amount_sd.unwrap_or(1.0));
    let gradient = factors.prefactor.value * factors.exp_factor.value * amount.value;
    let var = gradient_variance(factors.prefactor, factors.exp_factor, amount);
    Estimate::new(gradient, var.sqrt())
}

/// Gradients at `t = 0` of the whole cell and of both compartments
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompartmentGradients {
    pub cell: Estimate,
    pub cyto: Estimate,
    pub mito: Estimate,
}

pub fn gradient_at_zero_cyto_mito(
    cyto: &Factors,
    mito: &Factors,
    amount_cyto: f64,
    amount_mito: f64,
) -> CompartmentGradients {
    let var_cyto = gradient_variance(
        cyto.prefactor,
        cyto.exp_factor,
        Estimate::new(amount_cyto, 1.0),
    );
    let var_mito = gradient_variance(
        mito.prefactor,
        mito.exp_factor,
        Estimate::new(amount_mito, 1.0),
    );
    let g_cyto = cyto.prefactor.value * cyto.exp_factor.value * amount_cyto;
    let g_mito = mito.prefactor.value * mito.exp_factor.value * amount_mito;

    CompartmentGradients {
        cell: Estimate::new(g_cyto + g_mito, (var_cyto + var_mito).sqrt()),
        cyto: Estimate::new(g_cyto, var_cyto.sqrt()),
        mito: Estimate::new(g_mito, var_mito.sqrt()),
    }
}

/// Amount of a single pool replaced during the first hour
pub fn turnover_cell(prefactor: f64, exp_factor: f64, amount_cell: f64) -> f64 {
    let remaining = ExpDecay.eval(1.0, &[prefactor, exp_factor]) * amount_cell;
    amount_cell - remaining
}

/// Amount replaced during the first hour in the cell, cytosol and
/// mitochondria
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompartmentTurnover {
    pub cell: f64,
    pub cyto: f64,
    pub mito: f64,
}

pub fn turnover_cyto_mito(
    cyto: &Factors,
    mito: &Factors,
    amount_cyto: f64,
    amount_mito: f64,
) -> CompartmentTurnover {
    let t = 1.0;
    let model = CellDecay {
        exp_factor_mito: mito.exp_factor.value,
        prefactor_mito: mito.prefactor.value,
        amount_cyto,
        amount_mito,
    };
    let cell = model.value(t, cyto.exp_factor.value, cyto.prefactor.value);
    let cyto_left = ExpDecay.eval(t, &[cyto.prefactor.value, cyto.exp_factor.value]);
    let mito_left = ExpDecay.eval(t, &[mito.prefactor.value, mito.exp_factor.value]);

    CompartmentTurnover {
        cell: model.amount_cell() - cell,
        cyto: amount_cyto * (1.0 - cyto_left),
        mito: amount_mito * (1.0 - mito_left),
    }
}

/// Turnover rate of a pool, `(pool / 2) / t½`
///
/// The relative errors of pool size, half-life and, when the data was
/// growth corrected, the growth rate add in quadrature.
pub fn pool_turnover(pool: Estimate, half_life: Estimate, growth: Option<Estimate>) -> Estimate {
    let turnover = (pool.value / 2.0) / half_life.value;
    let mut var = pool.relative().powi(2) + half_life.relative().powi(2);
    if let Some(g) = growth {
        var += g.relative().powi(2);
    }
    Estimate::new(turnover, turnover * var.sqrt())
}

/// Format a duration given in hours as `(days,) hours, minutes`
///
/// Whole hours are truncated and the remaining fraction is rounded to the
/// nearest minute, ties to even.
///
/// ```rust,ignore
/// # use turnover::pretty_print_time;
/// assert_eq!(pretty_print_time(0.5), "30min");
/// assert_eq!(pretty_print_time(5.25), "5h 15min");
/// assert_eq!(pretty_print_time(24.0), "1d 0h 0min");
/// ```
pub fn pretty_print_time(hours: f64) -> String {
    if !hours.is_finite() {
        return hours.to_string();
    }
    let whole = hours.trunc();
    let minutes = ((hours - whole) * 60.0).round_ties_even() as i64;
    let whole = whole as i64;
    if whole == 0 {
        format!("{}min", minutes)
    } else if whole < 24 {
        format!("{}h {}min", whole, minutes)
    } else {
        format!("{}d {}h {}min", whole / 24, whole % 24, minutes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! factors {
        ($a:expr, $sa:expr, $b:expr, $sb:expr) => {
            Factors {
                prefactor: Estimate::new($a, $sa),
                exp_factor: Estimate::new($b, $sb),
            }
        };
    }

    #[test]
    fn half_life_convention() {
        let (a, b) = (0.8, 0.25);
        assert_eq!(calc_half_life(a, b), (2.0 * a).ln() / b);
        assert!((calc_half_life(1.0, 0.5) - 2f64.ln() / 0.5).abs() < 1e-15);
        // The half-life of a prefactor of 0.5 is zero by this convention
        assert_eq!(calc_half_life(0.5, 0.3), 0.0);
    }

    #[test]
    fn standard_deviation_vanishes() {
        let (a, b) = (0.9, 0.2);
        let mut last = f64::INFINITY;
        for scale in &[1e-2, 1e-4, 1e-8, 1e-16, 0.0] {
            let cov = DMatrix::from_row_slice(2, 2, &[*scale, *scale / 2.0, *scale / 2.0, *scale]);
            let sd = half_life_standard_deviation(a, b, &cov);
            assert!(sd <= last);
            last = sd;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn standard_deviation_terms() {
        let (a, b) = (1.0, 0.5);
        let cov = DMatrix::from_row_slice(2, 2, &[0.01, 0.0, 0.0, 0.0004]);
        let expected = ((0.1 / 0.5f64).powi(2) + (2f64.ln() * 0.02 / 0.25).powi(2)).sqrt();
        assert!((half_life_standard_deviation(a, b, &cov) - expected).abs() < 1e-15);
    }

    #[test]
    fn rate_based() {
        let hl = rate_half_life(0.1, 0.01);
        assert!((hl.value - 6.931_471_805_599_453).abs() < 1e-12);
        assert!((hl.sd - 0.693_147_180_559_945_3).abs() < 1e-12);
    }

    #[test]
    fn gradients() {
        let f = factors!(1.0, 0.1, 0.5, 0.05);
        let g = gradient_at_zero(&f, 10.0, Some(1.0));
        assert_eq!(g.value, 5.0);
        assert!((g.sd - (0.01f64 + 0.01 + 0.01).sqrt()).abs() < 1e-15);

        let mito = factors!(1.0, 0.1, 0.2, 0.02);
        let both = gradient_at_zero_cyto_mito(&f, &mito, 10.0, 5.0);
        assert_eq!(both.cyto.value, 5.0);
        assert_eq!(both.mito.value, 1.0);
        assert_eq!(both.cell.value, 6.0);
        let var = both.cyto.sd.powi(2) + both.mito.sd.powi(2);
        assert!((both.cell.sd - var.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn turnover_after_one_hour() {
        let t = turnover_cell(1.0, 2f64.ln(), 100.0);
        assert!((t - 50.0).abs() < 1e-12);

        let cyto = factors!(1.0, 0.0, 2f64.ln(), 0.0);
        let mito = factors!(1.0, 0.0, 0.0, 0.0);
        let t = turnover_cyto_mito(&cyto, &mito, 100.0, 40.0);
        assert!((t.cyto - 50.0).abs() < 1e-12);
        assert!(t.mito.abs() < 1e-12);
        assert!((t.cell - 50.0).abs() < 1e-12);
    }

    #[test]
    fn pool() {
        let t = pool_turnover(Estimate::new(10.0, 1.0), Estimate::new(5.0, 0.5), None);
        assert_eq!(t.value, 1.0);
        assert!((t.sd - 0.02f64.sqrt()).abs() < 1e-15);
        let g = pool_turnover(
            Estimate::new(10.0, 1.0),
            Estimate::new(5.0, 0.5),
            Some(Estimate::new(0.02, 0.002)),
        );
        assert!((g.sd - 0.03f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn pretty_time() {
        assert_eq!(pretty_print_time(0.0), "0min");
        assert_eq!(pretty_print_time(0.5), "30min");
        // 0.999 h is 59.94 minutes, which rounds up
        assert_eq!(pretty_print_time(0.999), "60min");
        assert_eq!(pretty_print_time(1.0), "1h 0min");
        assert_eq!(pretty_print_time(5.25), "5h 15min");
        assert_eq!(pretty_print_time(23.99), "23h 59min");
        assert_eq!(pretty_print_time(24.0), "1d 0h 0min");
        assert_eq!(pretty_print_time(50.5), "2d 2h 30min");
        assert_eq!(pretty_print_time(f64::NAN), "NaN");
    }
}
