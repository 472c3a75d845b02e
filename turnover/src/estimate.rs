//! Half-life estimation for whole experiments
use super::*;
use crate::fit::{curve_fit, Fit, FitOptions};
use crate::halflife::*;
use crate::labelling::{Growth, Labelling, PoolSize};
use crate::model::{CellDecay, ExpDecay, SaturatingGrowth};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Half-life of a pool together with the fitted factors it derives from
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct HalfLife {
    pub half_life: Estimate,
    pub factors: Factors,
}

impl HalfLife {
    fn from_fit(fit: &Fit) -> HalfLife {
        let (a, b) = (fit.params[0], fit.params[1]);
        let se = fit.standard_errors();
        HalfLife {
            half_life: Estimate::new(
                calc_half_life(a, b),
                half_life_standard_deviation(a, b, &fit.covariance),
            ),
            factors: Factors {
                prefactor: Estimate::new(a, se[0]),
                exp_factor: Estimate::new(b, se[1]),
            },
        }
    }
}

fn xy<F: Fn(&Labelling) -> f64>(rows: &[Labelling], f: F) -> (Vec<f64>, Vec<f64>) {
    rows.iter().map(|r| (r.time, f(r))).unzip()
}

/// Fit `1 - a * exp(-b * t)` to the labelled fraction
pub fn estimate_half_life(rows: &[Labelling]) -> Result<HalfLife> {
    let (x, y) = xy(rows, |r| r.sum_labelled_percent / 100.0);
    let opts = FitOptions::new(vec![1.0, 1.0]).bounds(vec![0.0, 0.0], vec![10.0, 10.0]);
    let fit = curve_fit(&SaturatingGrowth, &x, &y, &opts)?;
    Ok(HalfLife::from_fit(&fit))
}

/// Fit `a * exp(-b * t)` to the unlabelled fraction
pub fn fit_unlabelled(rows: &[Labelling]) -> Result<HalfLife> {
    let (x, y) = xy(rows, |r| r.no_label_percent / 100.0);
    let opts = FitOptions::new(vec![1.0, 1.0]).bounds(vec![0.0, 0.0], vec![1000.0, 10.0]);
    let fit = curve_fit(&ExpDecay, &x, &y, &opts)?;
    Ok(HalfLife::from_fit(&fit))
}

/// Whole-cell and mitochondria-only experiments that make up one
/// compartment estimation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Compartments {
    pub name: String,
    pub whole_cell: String,
    pub mito: String,
    pub amount_cyto: f64,
    pub amount_mito: f64,
}

/// Separate half-lives of the cytosolic and mitochondrial pool
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct CytoMito {
    pub cyto: HalfLife,
    pub mito: HalfLife,
    pub gradients: CompartmentGradients,
    pub turnover: CompartmentTurnover,
}

fn experiment(rows: &[Labelling], name: &str) -> Result<Vec<Labelling>> {
    let selected = rows
        .iter()
        .filter(|r| r.experiment == name)
        .cloned()
        .collect::<Vec<_>>();
    if selected.is_empty() {
        return Err(Error::MissingExperiment(name.to_string()));
    }
    Ok(selected)
}

/// Two step estimation of the cytosolic and mitochondrial pool
///
/// The mitochondrial decay is fitted on the mitochondria-only experiment
/// first. With those factors fixed, the cytosolic factors are fitted to the
/// unlabelled amount of the whole-cell experiment.
pub fn estimate_half_life_cyto_mito(rows: &[Labelling], c: &Compartments) -> Result<CytoMito> {
    let mito = fit_unlabelled(&experiment(rows, &c.mito)?)?;

    let model = CellDecay {
        exp_factor_mito: mito.factors.exp_factor.value,
        prefactor_mito: mito.factors.prefactor.value,
        amount_cyto: c.amount_cyto,
        amount_mito: c.amount_mito,
    };
    let amount_cell = model.amount_cell();
    let (x, y) = xy(&experiment(rows, &c.whole_cell)?, |r| {
        r.no_label_percent / 100.0 * amount_cell
    });
    let opts = FitOptions::new(vec![0.1, 1.0]).bounds(vec![0.0, 0.0], vec![10.0, 10.0]);
    let fit = curve_fit(&model, &x, &y, &opts)?;

    // Parameters are ordered [exp_factor, prefactor]
    let (k, a) = (fit.params[0], fit.params[1]);
    let cov = &fit.covariance;
    let swapped =
        nalgebra::DMatrix::from_row_slice(2, 2, &[cov[(1, 1)], cov[(1, 0)], cov[(0, 1)], cov[(0, 0)]]);
    let se = fit.standard_errors();
    let cyto = HalfLife {
        half_life: Estimate::new(calc_half_life(a, k), half_life_standard_deviation(a, k, &swapped)),
        factors: Factors {
            prefactor: Estimate::new(a, se[1]),
            exp_factor: Estimate::new(k, se[0]),
        },
    };

    Ok(CytoMito {
        gradients: gradient_at_zero_cyto_mito(&cyto.factors, &mito.factors, c.amount_cyto, c.amount_mito),
        turnover: turnover_cyto_mito(&cyto.factors, &mito.factors, c.amount_cyto, c.amount_mito),
        cyto,
        mito,
    })
}

/// Subsampling applied to every time point of a resampling run
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleOptions {
    pub runs: usize,
    /// Fraction of replicates drawn per time point
    pub fraction: f64,
    pub replace: bool,
    pub seed: u64,
}

impl Default for ResampleOptions {
    fn default() -> ResampleOptions {
        ResampleOptions {
            runs: 200,
            fraction: 0.5,
            replace: false,
            seed: 0,
        }
    }
}

fn by_time(rows: &[Labelling]) -> Vec<Vec<&Labelling>> {
    let mut groups: BTreeMap<u64, (f64, Vec<&Labelling>)> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.time.to_bits())
            .or_insert_with(|| (row.time, Vec::new()))
            .1
            .push(row);
    }
    let mut groups = groups.into_iter().map(|(_, v)| v).collect::<Vec<_>>();
    groups.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    groups.into_iter().map(|(_, v)| v).collect()
}

fn subsample<R: Rng>(rng: &mut R, groups: &[Vec<&Labelling>], opts: &ResampleOptions) -> Vec<Labelling> {
    let mut out = Vec::new();
    for group in groups {
        let n = group.len();
        let k = (opts.fraction * n as f64).round_ties_even() as usize;
        if opts.replace {
            out.extend((0..k).map(|_| group[rng.gen_range(0..n)].clone()));
        } else {
            out.extend(
                rand::seq::index::sample(rng, n, k.min(n))
                    .into_iter()
                    .map(|i| group[i].clone()),
            );
        }
    }
    out
}

/// Repeat [`estimate_half_life`] on random subsets of the replicates
///
/// Every run draws from its own generator seeded with `seed + run`, so the
/// outcome does not depend on how runs are scheduled. The result holds the
/// mean and sample standard deviation over all runs.
pub fn half_life_resampling(rows: &[Labelling], opts: &ResampleOptions) -> Result<HalfLife> {
    if opts.runs < 2 {
        return Err(Error::InvalidInput("resampling needs at least two runs".into()));
    }
    let groups = by_time(rows);
    let runs = (0..opts.runs)
        .into_par_iter()
        .map(|run| {
            let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(run as u64));
            estimate_half_life(&subsample(&mut rng, &groups, opts))
        })
        .collect::<Result<Vec<_>>>()?;

    let summary = |f: fn(&HalfLife) -> f64| {
        let v = runs.iter().map(f).collect::<Vec<f64>>();
        Estimate::new(stats::mean(&v), stats::stddev(&v))
    };
    Ok(HalfLife {
        half_life: summary(|h| h.half_life.value),
        factors: Factors {
            prefactor: summary(|h| h.factors.prefactor.value),
            exp_factor: summary(|h| h.factors.exp_factor.value),
        },
    })
}

/// Median number of replicates per time point
pub fn n_samples(rows: &[Labelling]) -> f64 {
    let counts = by_time(rows)
        .iter()
        .map(|g| g.len() as f64)
        .collect::<Vec<_>>();
    stats::median(&counts).unwrap_or(0.0)
}

fn experiments(rows: &[Labelling]) -> BTreeMap<&str, Vec<Labelling>> {
    let mut map: BTreeMap<&str, Vec<Labelling>> = BTreeMap::new();
    for row in rows {
        map.entry(row.experiment.as_str()).or_default().push(row.clone());
    }
    map
}

/// One experiment of a half-life table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HalfLifeRow {
    pub experiment: String,
    pub half_life_time: f64,
    pub standard_deviation: f64,
    pub prefactor: f64,
    pub std_prefactor: f64,
    pub exp_factor: f64,
    pub std_exp_factor: f64,
    pub n_samples: f64,
}

/// One compartment estimation of a half-life table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CytoMitoRow {
    pub name: String,
    pub half_life_time_cyto: f64,
    pub half_life_time_mito: f64,
    pub std_half_life_time_cyto: f64,
    pub std_half_life_time_mito: f64,
    pub exp_factor_cyto: f64,
    pub exp_factor_mito: f64,
    pub prefactor_cyto: f64,
    pub prefactor_mito: f64,
    pub std_exp_factor_cyto: f64,
    pub std_exp_factor_mito: f64,
    pub std_prefactor_cyto: f64,
    pub std_prefactor_mito: f64,
    pub cell_gradient_at_0h: f64,
    pub cyto_gradient_at_0h: f64,
    pub mito_gradient_at_0h: f64,
    pub std_cell_gradient_at_0h: f64,
    pub std_cyto_gradient_at_0h: f64,
    pub std_mito_gradient_at_0h: f64,
    pub cell_turnover_1h: f64,
    pub cyto_turnover_1h: f64,
    pub mito_turnover_1h: f64,
    pub nad_amount_cyto: f64,
    pub nad_amount_mito: f64,
}

impl CytoMitoRow {
    fn new(c: &Compartments, r: &CytoMito) -> CytoMitoRow {
        CytoMitoRow {
            name: c.name.clone(),
            half_life_time_cyto: r.cyto.half_life.value,
            half_life_time_mito: r.mito.half_life.value,
            std_half_life_time_cyto: r.cyto.half_life.sd,
            std_half_life_time_mito: r.mito.half_life.sd,
            exp_factor_cyto: r.cyto.factors.exp_factor.value,
            exp_factor_mito: r.mito.factors.exp_factor.value,
            prefactor_cyto: r.cyto.factors.prefactor.value,
            prefactor_mito: r.mito.factors.prefactor.value,
            std_exp_factor_cyto: r.cyto.factors.exp_factor.sd,
            std_exp_factor_mito: r.mito.factors.exp_factor.sd,
            std_prefactor_cyto: r.cyto.factors.prefactor.sd,
            std_prefactor_mito: r.mito.factors.prefactor.sd,
            cell_gradient_at_0h: r.gradients.cell.value,
            cyto_gradient_at_0h: r.gradients.cyto.value,
            mito_gradient_at_0h: r.gradients.mito.value,
            std_cell_gradient_at_0h: r.gradients.cell.sd,
            std_cyto_gradient_at_0h: r.gradients.cyto.sd,
            std_mito_gradient_at_0h: r.gradients.mito.sd,
            cell_turnover_1h: r.turnover.cell,
            cyto_turnover_1h: r.turnover.cyto,
            mito_turnover_1h: r.turnover.mito,
            nad_amount_cyto: c.amount_cyto,
            nad_amount_mito: c.amount_mito,
        }
    }
}

/// How [`half_life_table`] treats the experiments
#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    /// One fit per experiment, optionally resampled
    Single(Option<ResampleOptions>),
    /// One cytosol/mitochondria estimation per entry
    CytoMito(Vec<Compartments>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum HalfLifeTable {
    Single(Vec<HalfLifeRow>),
    CytoMito(Vec<CytoMitoRow>),
}

impl HalfLifeTable {
    pub fn len(&self) -> usize {
        match self {
            HalfLifeTable::Single(v) => v.len(),
            HalfLifeTable::CytoMito(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the table as comma separated values with a header row
    pub fn write<P: AsRef<Path>>(&self, p: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(p)?;
        match self {
            HalfLifeTable::Single(rows) => rows.iter().try_for_each(|r| wtr.serialize(r))?,
            HalfLifeTable::CytoMito(rows) => rows.iter().try_for_each(|r| wtr.serialize(r))?,
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Estimate half-lives for every experiment in `rows`
///
/// In [`Mode::Single`] each experiment is fitted on its own, in parallel.
/// Resampling is only available in this mode.
pub fn half_life_table(rows: &[Labelling], mode: &Mode, resample: bool) -> Result<HalfLifeTable> {
    match mode {
        Mode::CytoMito(compartments) => {
            if resample {
                return Err(Error::InvalidInput(
                    "resampling is not available for cyto/mito estimation".into(),
                ));
            }
            let rows = compartments
                .par_iter()
                .map(|c| {
                    let r = estimate_half_life_cyto_mito(rows, c)?;
                    log::info!("{}: cyto {:.2}h, mito {:.2}h", c.name, r.cyto.half_life.value, r.mito.half_life.value);
                    Ok(CytoMitoRow::new(c, &r))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(HalfLifeTable::CytoMito(rows))
        }
        Mode::Single(opts) => {
            let opts = match (resample, opts) {
                (true, Some(o)) => Some(*o),
                (true, None) => Some(ResampleOptions::default()),
                (false, _) => None,
            };
            let groups = experiments(rows).into_iter().collect::<Vec<_>>();
            let rows = groups
                .par_iter()
                .map(|(name, data)| {
                    let est = match &opts {
                        Some(o) => half_life_resampling(data, o)?,
                        None => estimate_half_life(data)?,
                    };
                    log::info!("{}: half-life {}", name, pretty_print_time(est.half_life.value));
                    Ok(HalfLifeRow {
                        experiment: name.to_string(),
                        half_life_time: est.half_life.value,
                        standard_deviation: est.half_life.sd,
                        prefactor: est.factors.prefactor.value,
                        std_prefactor: est.factors.prefactor.sd,
                        exp_factor: est.factors.exp_factor.value,
                        std_exp_factor: est.factors.exp_factor.sd,
                        n_samples: n_samples(data),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(HalfLifeTable::Single(rows))
        }
    }
}

/// Decay of the unlabelled fraction of one cell type
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecayParameters {
    pub cell_type: String,
    pub factors: Factors,
    /// `ln(2) / exp_factor`
    pub half_life: Estimate,
    pub growth: Option<Growth>,
}

/// Fit the unlabelled decay per cell type and derive rate based half-lives
///
/// `growth` carries the growth fits of cell types whose data was growth
/// corrected; their uncertainty enters [`turnover_table`].
pub fn decay_parameters(
    rows: &[Labelling],
    growth: &HashMap<String, Growth>,
) -> Result<Vec<DecayParameters>> {
    experiments(rows)
        .into_par_iter()
        .map(|(name, data)| {
            let fit = fit_unlabelled(&data)?;
            Ok(DecayParameters {
                cell_type: name.to_string(),
                half_life: rate_half_life(fit.factors.exp_factor.value, fit.factors.exp_factor.sd),
                factors: fit.factors,
                growth: growth.get(name).copied(),
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnoverRow {
    pub cell_type: String,
    pub half_life: f64,
    pub half_life_error: f64,
    pub poolsize: f64,
    pub poolsize_sd: f64,
    pub turnover: f64,
    pub turnover_error: f64,
}

/// Turnover of each cell type's pool from its half-life and pool size
///
/// Cell types without a pool size of their own use the `reference` pool.
pub fn turnover_table(
    decay: &[DecayParameters],
    pools: &HashMap<String, PoolSize>,
    reference: &str,
) -> Result<Vec<TurnoverRow>> {
    decay
        .iter()
        .map(|d| {
            let pool = pools
                .get(&d.cell_type)
                .or_else(|| pools.get(reference))
                .ok_or_else(|| Error::MissingPool(d.cell_type.clone()))?;
            let t = pool_turnover(*pool, d.half_life, d.growth.map(|g| g.rate));
            Ok(TurnoverRow {
                cell_type: d.cell_type.clone(),
                half_life: d.half_life.value,
                half_life_error: d.half_life.sd,
                poolsize: pool.value,
                poolsize_sd: pool.sd,
                turnover: t.value,
                turnover_error: t.sd,
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TStatistic {
    /// Both cell types joined by `_`
    pub pair: String,
    pub statistic: f64,
    pub pvalue: f64,
}

/// Compare the turnover of every unordered pair of cell types, each
/// measured `n` times
///
/// Needs at least two replicates. Pairs without a defined statistic (equal
/// turnover and no error) are skipped.
pub fn turnover_t_statistics(rows: &[TurnoverRow], n: usize) -> Result<Vec<TStatistic>> {
    if n < 2 {
        return Err(Error::InvalidInput(format!(
            "t statistics need at least 2 replicates per cell type, got {}",
            n
        )));
    }
    let sqrt_n = (n as f64).sqrt();
    let df = n as f64 - 1.0;
    let mut out = Vec::new();
    for (i, a) in rows.iter().enumerate() {
        for b in &rows[i + 1..] {
            let statistic =
                ((a.turnover - b.turnover) / (a.turnover_error / sqrt_n + b.turnover_error / sqrt_n)).abs();
            if statistic.is_nan() {
                log::warn!("no t statistic for {} vs {}", a.cell_type, b.cell_type);
                continue;
            }
            out.push(TStatistic {
                pair: format!("{}_{}", a.cell_type, b.cell_type),
                statistic,
                pvalue: 2.0 * (1.0 - stats::t_cdf(statistic, df)),
            });
        }
    }
    Ok(out)
}

/// Write any serializable rows as comma separated values
pub fn write_csv<P: AsRef<Path>, T: Serialize>(p: P, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(p)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::Model;

    const TIMES: [f64; 7] = [0.0, 1.0, 2.0, 4.0, 8.0, 12.0, 24.0];

    /// Replicated rows whose labelled fraction follows `1 - a exp(-b t)`
    macro_rules! labelled {
        ($exp:expr, $a:expr, $b:expr, $reps:expr) => {
            TIMES
                .iter()
                .flat_map(|&t| {
                    let f = SaturatingGrowth.eval(t, &[$a, $b]);
                    (0..$reps).map(move |_| Labelling::new($exp, t, 100.0 * (1.0 - f), &[100.0 * f]))
                })
                .collect::<Vec<Labelling>>()
        };
    }

    /// Rows whose unlabelled fraction is `value(t)`
    fn unlabelled<F: Fn(f64) -> f64>(exp: &str, f: F) -> Vec<Labelling> {
        TIMES
            .iter()
            .map(|&t| Labelling::new(exp, t, 100.0 * f(t), &[100.0 * (1.0 - f(t))]))
            .collect()
    }

    #[test]
    fn single() {
        let rows = labelled!("HeLa", 0.95, 0.2, 3);
        let est = estimate_half_life(&rows).unwrap();
        assert!((est.factors.prefactor.value - 0.95).abs() < 1e-6);
        assert!((est.factors.exp_factor.value - 0.2).abs() < 1e-6);
        assert!((est.half_life.value - calc_half_life(0.95, 0.2)).abs() < 1e-5);
        assert!(est.half_life.sd < 1e-4);
    }

    #[test]
    fn unlabelled_decay() {
        let rows = unlabelled("mito", |t| (-0.1 * t).exp());
        let fit = fit_unlabelled(&rows).unwrap();
        assert!((fit.factors.exp_factor.value - 0.1).abs() < 1e-6);
        assert!((fit.half_life.value - 2f64.ln() / 0.1).abs() < 1e-4);
    }

    #[test]
    fn cyto_mito() {
        let c = Compartments {
            name: "HEK".into(),
            whole_cell: "wcl".into(),
            mito: "mito".into(),
            amount_cyto: 300.0,
            amount_mito: 100.0,
        };
        let model = CellDecay {
            exp_factor_mito: 0.1,
            prefactor_mito: 1.0,
            amount_cyto: c.amount_cyto,
            amount_mito: c.amount_mito,
        };
        let mut rows = unlabelled("mito", |t| (-0.1 * t).exp());
        rows.extend(unlabelled("wcl", |t| model.value(t, 0.3, 1.0) / 400.0));

        let r = estimate_half_life_cyto_mito(&rows, &c).unwrap();
        assert!((r.mito.factors.exp_factor.value - 0.1).abs() < 1e-6);
        assert!((r.cyto.factors.exp_factor.value - 0.3).abs() < 1e-5);
        assert!((r.cyto.factors.prefactor.value - 1.0).abs() < 1e-5);
        assert!((r.gradients.cyto.value - 90.0).abs() < 1e-3);

        let missing = Compartments {
            mito: "none".into(),
            ..c.clone()
        };
        assert!(matches!(
            estimate_half_life_cyto_mito(&rows, &missing),
            Err(Error::MissingExperiment(_))
        ));

        let table = half_life_table(&rows, &Mode::CytoMito(vec![c.clone()]), false).unwrap();
        assert_eq!(table.len(), 1);
        assert!(half_life_table(&rows, &Mode::CytoMito(vec![c]), true).is_err());
    }

    #[test]
    fn resampling() {
        let rows = labelled!("HeLa", 0.95, 0.2, 4);
        let opts = ResampleOptions {
            runs: 8,
            seed: 42,
            ..ResampleOptions::default()
        };
        let a = half_life_resampling(&rows, &opts).unwrap();
        let b = half_life_resampling(&rows, &opts).unwrap();
        assert_eq!(a, b);
        assert!((a.half_life.value - calc_half_life(0.95, 0.2)).abs() < 1e-4);
        assert!(a.half_life.sd < 1e-4);

        let groups = by_time(&rows);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(subsample(&mut rng, &groups, &opts).len(), TIMES.len() * 2);
    }

    #[test]
    fn table() {
        let mut rows = labelled!("b", 0.9, 0.1, 2);
        rows.extend(labelled!("a", 0.95, 0.2, 3));
        let table = half_life_table(&rows, &Mode::Single(None), false).unwrap();
        match table {
            HalfLifeTable::Single(rows) => {
                assert_eq!(rows[0].experiment, "a");
                assert_eq!(rows[0].n_samples, 3.0);
                assert_eq!(rows[1].n_samples, 2.0);
                assert!((rows[1].exp_factor - 0.1).abs() < 1e-6);
            }
            _ => panic!("wrong table mode"),
        }
    }

    #[test]
    fn turnover() {
        let mut rows = unlabelled("HeLa", |t| (-2f64.ln() / 4.0 * t).exp());
        rows.extend(unlabelled("PARP1", |t| (-2f64.ln() / 8.0 * t).exp()));
        let decay = decay_parameters(&rows, &HashMap::new()).unwrap();
        assert_eq!(decay.len(), 2);
        assert!((decay[0].half_life.value - 4.0).abs() < 1e-5);

        let mut pools = HashMap::new();
        pools.insert("wt".to_string(), Estimate::new(400.0, 40.0));
        let table = turnover_table(&decay, &pools, "wt").unwrap();
        assert!((table[0].turnover - 50.0).abs() < 1e-3);
        assert!((table[1].turnover - 25.0).abs() < 1e-3);
        assert!(turnover_table(&decay, &HashMap::new(), "wt").is_err());
    }

    #[test]
    fn t_statistics() {
        let row = |name: &str, t: f64, e: f64| TurnoverRow {
            cell_type: name.into(),
            half_life: 0.0,
            half_life_error: 0.0,
            poolsize: 0.0,
            poolsize_sd: 0.0,
            turnover: t,
            turnover_error: e,
        };
        let rows = vec![row("a", 10.0, 2.0), row("b", 6.0, 2.0), row("c", 6.0, 2.0)];
        let stats = turnover_t_statistics(&rows, 4).unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].pair, "a_b");
        assert!((stats[0].statistic - 2.0).abs() < 1e-12);
        assert!((stats[0].pvalue - 0.139_326).abs() < 1e-4);
        assert_eq!(stats[2].statistic, 0.0);
        assert!((stats[2].pvalue - 1.0).abs() < 1e-12);
    }

    #[test]
    fn t_statistics_undefined() {
        let row = |name: &str, t: f64, e: f64| TurnoverRow {
            cell_type: name.into(),
            half_life: 0.0,
            half_life_error: 0.0,
            poolsize: 0.0,
            poolsize_sd: 0.0,
            turnover: t,
            turnover_error: e,
        };
        let rows = vec![row("a", 5.0, 0.0), row("b", 5.0, 0.0), row("c", 8.0, 1.0)];
        assert!(turnover_t_statistics(&rows, 1).is_err());
        assert!(turnover_t_statistics(&rows, 0).is_err());

        let stats = turnover_t_statistics(&rows, 3).unwrap();
        let pairs = stats.iter().map(|s| s.pair.as_str()).collect::<Vec<_>>();
        assert_eq!(pairs, vec!["a_c", "b_c"]);
        assert!(stats.iter().all(|s| s.pvalue.is_finite()));
    }
}
