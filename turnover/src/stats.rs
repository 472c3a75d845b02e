//! Descriptive statistics and the Student's t distribution

/// Arithmetic mean of a slice, NaN if empty
#[inline]
pub fn mean(slice: &[f64]) -> f64 {
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// Sample standard deviation (`n - 1` in the denominator), NaN for fewer
/// than two values
#[inline]
pub fn stddev(slice: &[f64]) -> f64 {
    variance(slice).sqrt()
}

/// Sample variance (`n - 1` in the denominator)
#[inline]
pub fn variance(slice: &[f64]) -> f64 {
    let n = slice.len() as f64;
    let mean = mean(slice);
    slice.iter().fold(0.0, |acc, x| acc + (x - mean).powi(2)) / (n - 1.0)
}

/// Median value, averaging the two central values for even lengths
pub fn median(slice: &[f64]) -> Option<f64> {
    let mut v = slice.iter().copied().filter(|x| !x.is_nan()).collect::<Vec<f64>>();
    v.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if v.len() % 2 == 1 {
        v.get(v.len() / 2).copied()
    } else {
        let s = v.get(v.len() / 2)? + v.get((v.len() / 2).checked_sub(1)?)?;
        Some(s / 2.0)
    }
}

/// Natural logarithm of the gamma function (Lanczos approximation, g = 7)
pub fn ln_gamma(x: f64) -> f64 {
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_93,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_13,
        -176.615_029_162_140_59,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_571_6e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEF[0];
    let t = x + 7.5;
    for (i, c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Continued fraction for the incomplete beta function (modified Lentz)
fn beta_fraction(a: f64, b: f64, x: f64) -> f64 {
    const TINY: f64 = 1e-300;
    const EPS: f64 = 1e-15;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=300 {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta function `I_x(a, b)`
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_fraction(b, a, 1.0 - x) / b
    }
}

/// Cumulative distribution function of Student's t with `df` degrees of
/// freedom
pub fn t_cdf(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return if t > 0.0 { 1.0 } else { 0.0 };
    }
    let x = df / (df + t * t);
    let tail = 0.5 * incomplete_beta(df / 2.0, 0.5, x);
    if t > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Two-sided p-value for a t statistic
pub fn t_two_sided(t: f64, df: f64) -> f64 {
    2.0 * (1.0 - t_cdf(t.abs(), df))
}

/// Outcome of a two-sample t-test
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub pvalue: f64,
}

/// Independent two-sample t-test assuming equal variances
///
/// Missing values propagate: any NaN in either sample yields a NaN
/// statistic and p-value.
pub fn ttest_ind(a: &[f64], b: &[f64]) -> TTest {
    let nan = TTest {
        statistic: f64::NAN,
        pvalue: f64::NAN,
    };
    if a.iter().chain(b).any(|x| x.is_nan()) || a.len() < 2 || b.len() < 2 {
        return nan;
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * variance(a) + (n2 - 1.0) * variance(b)) / df;
    let denom = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    let statistic = (mean(a) - mean(b)) / denom;
    TTest {
        statistic,
        pvalue: t_two_sided(statistic, df),
    }
}
