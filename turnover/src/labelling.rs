//! Isotopologue intensities and the labelled fractions derived from them
use super::*;
use crate::fit::{curve_fit, FitOptions};
use crate::halflife::Estimate;
use crate::model::ExpGrowth;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Names of the isotopologue columns measured for one metabolite
#[derive(Clone, Debug, PartialEq)]
pub struct Isotopologues {
    pub metabolite: String,
    pub unlabelled: String,
    pub labelled: Vec<String>,
}

impl Default for Isotopologues {
    /// NAD traced with 13C/15N labelled nicotinamide and ribose
    fn default() -> Isotopologues {
        Isotopologues {
            metabolite: "NAD".into(),
            unlabelled: "No label".into(),
            labelled: ["N15", "5C13", "5C13N15", "10C13", "10C13N15"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// One LC-MS measurement of a metabolite's isotopologues
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub experiment: String,
    /// Time since label addition, in hours
    pub time: f64,
    pub unlabelled: f64,
    /// Intensities in the order of [`Isotopologues::labelled`]
    pub labelled: Vec<f64>,
}

impl Sample {
    /// Build a sample from a time point recorded in minutes
    pub fn from_minutes<S: Into<String>>(
        experiment: S,
        minutes: f64,
        unlabelled: f64,
        labelled: Vec<f64>,
    ) -> Sample {
        Sample {
            experiment: experiment.into(),
            time: minutes / 60.0,
            unlabelled,
            labelled,
        }
    }

    fn intensities(&self) -> impl Iterator<Item = f64> + '_ {
        std::iter::once(self.unlabelled).chain(self.labelled.iter().copied())
    }

    /// Summed intensity of all isotopologues
    pub fn total(&self) -> f64 {
        self.intensities().sum()
    }
}

/// Correction of measured intensities for the natural abundance of heavy
/// isotopes
///
/// The correction itself is provided by an external implementation; the
/// pipeline only relies on it rewriting intensities in place.
pub trait IsotopologueCorrection {
    fn correct(&self, isotopologues: &Isotopologues, samples: &mut [Sample]) -> Result<()>;
}

/// Leave intensities untouched, for data that was corrected upstream
#[derive(Copy, Clone, Debug, Default)]
pub struct NoCorrection;

impl IsotopologueCorrection for NoCorrection {
    fn correct(&self, _: &Isotopologues, _: &mut [Sample]) -> Result<()> {
        Ok(())
    }
}

/// Known totals used to turn labelled fractions into absolute quantities
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Scale {
    /// Total amount in the analysed cells
    pub amount: Option<f64>,
    /// Total amount per dry weight protein
    pub per_protein: Option<f64>,
    /// Intracellular concentration
    pub concentration: Option<f64>,
}

/// Unlabelled and labelled share of a known total
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Scaled {
    pub unlabelled: f64,
    pub labelled: f64,
}

impl Scaled {
    fn from_percent(total: f64, no_label_percent: f64, labelled_percent: f64) -> Scaled {
        Scaled {
            unlabelled: no_label_percent * total / 100.0,
            labelled: labelled_percent * total / 100.0,
        }
    }
}

/// Labelled fractions of a single [`Sample`]
#[derive(Clone, Debug, PartialEq)]
pub struct Labelling {
    pub experiment: String,
    pub time: f64,
    pub unlabelled: f64,
    pub sum_labelled: f64,
    pub no_label_percent: f64,
    pub sum_labelled_percent: f64,
    /// Percent of the total for each labelled isotopologue
    pub isotopologue_percent: Vec<f64>,
    pub amount: Option<Scaled>,
    pub per_protein: Option<Scaled>,
    pub concentration: Option<Scaled>,
    /// Change of the labelled amount per hour since the previous time point
    /// of the same experiment
    pub labelled_rate: Option<f64>,
}

impl Labelling {
    /// Percentages of a sample with `unlabelled` and summed `labelled`
    /// intensities
    pub fn new<S: Into<String>>(experiment: S, time: f64, unlabelled: f64, labelled: &[f64]) -> Labelling {
        let sum_labelled: f64 = labelled.iter().sum();
        let total = unlabelled + sum_labelled;
        Labelling {
            experiment: experiment.into(),
            time,
            unlabelled,
            sum_labelled,
            no_label_percent: unlabelled / total * 100.0,
            sum_labelled_percent: sum_labelled / total * 100.0,
            isotopologue_percent: labelled.iter().map(|v| v / total * 100.0).collect(),
            amount: None,
            per_protein: None,
            concentration: None,
            labelled_rate: None,
        }
    }

    fn scale(&mut self, scale: &Scale) {
        let (u, l) = (self.no_label_percent, self.sum_labelled_percent);
        self.amount = scale.amount.map(|t| Scaled::from_percent(t, u, l));
        self.per_protein = scale.per_protein.map(|t| Scaled::from_percent(t, u, l));
        self.concentration = scale.concentration.map(|t| Scaled::from_percent(t, u, l));
    }
}

/// Write labelled fractions as comma separated values
///
/// Scaled amounts and rates are only written when the first row has them.
pub fn write_labelling<P: AsRef<std::path::Path>>(
    p: P,
    isotopologues: &Isotopologues,
    rows: &[Labelling],
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(p)?;
    let first = rows.first();
    let scaled = |f: fn(&Labelling) -> Option<Scaled>| first.and_then(f).is_some();
    let (amount, protein, conc) = (
        scaled(|r| r.amount),
        scaled(|r| r.per_protein),
        scaled(|r| r.concentration),
    );

    let mut header = vec![
        "Exp".to_string(),
        "Time in hours".into(),
        isotopologues.unlabelled.clone(),
        "sum_labelled".into(),
        "no_label_percent".into(),
        "sum_labelled_percent".into(),
    ];
    header.extend(isotopologues.labelled.iter().map(|n| format!("{}_percent", n)));
    for (on, name) in &[(amount, "amount"), (protein, "per_protein"), (conc, "concentration")] {
        if *on {
            header.push(format!("{}_unlabelled", name));
            header.push(format!("{}_labelled", name));
        }
    }
    if amount {
        header.push("labelled_rate".into());
    }
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.experiment.clone(),
            row.time.to_string(),
            row.unlabelled.to_string(),
            row.sum_labelled.to_string(),
            row.no_label_percent.to_string(),
            row.sum_labelled_percent.to_string(),
        ];
        record.extend(row.isotopologue_percent.iter().map(f64::to_string));
        for (on, value) in &[(amount, row.amount), (protein, row.per_protein), (conc, row.concentration)] {
            if *on {
                let v = value.unwrap_or(Scaled {
                    unlabelled: f64::NAN,
                    labelled: f64::NAN,
                });
                record.push(v.unlabelled.to_string());
                record.push(v.labelled.to_string());
            }
        }
        if amount {
            record.push(row.labelled_rate.map(|r| r.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Drop measurements without signal and replace remaining gaps with zero
///
/// A sample is dropped if none of its isotopologues is non-zero, or if all
/// of them are missing (NaN).
pub fn clean(samples: Vec<Sample>) -> Vec<Sample> {
    let before = samples.len();
    let kept = samples
        .into_iter()
        .filter(|s| s.intensities().any(|v| v != 0.0))
        .filter(|s| !s.intensities().all(f64::is_nan))
        .map(|mut s| {
            if s.unlabelled.is_nan() {
                s.unlabelled = 0.0;
            }
            s.labelled.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = 0.0);
            s
        })
        .collect::<Vec<_>>();
    if kept.len() < before {
        log::debug!("dropped {} samples without signal", before - kept.len());
    }
    kept
}

/// Drop empty samples and apply the isotopologue `correction`
///
/// Every sample must carry one intensity per labelled isotopologue.
pub fn correct<C: IsotopologueCorrection>(
    samples: Vec<Sample>,
    isotopologues: &Isotopologues,
    correction: &C,
) -> Result<Vec<Sample>> {
    let mut samples = clean(samples);
    if let Some(s) = samples.iter().find(|s| s.labelled.len() != isotopologues.labelled.len()) {
        return Err(Error::InvalidInput(format!(
            "sample of {} at {}h has {} labelled isotopologues, expected {}",
            s.experiment,
            s.time,
            s.labelled.len(),
            isotopologues.labelled.len()
        )));
    }
    correction.correct(isotopologues, &mut samples)?;
    Ok(samples)
}

/// Clean, correct and convert raw samples into labelled fractions
///
/// Rows come back ordered by experiment and time. When `scale.amount` is
/// set, the rate of labelled amount change is derived as well.
pub fn labelling<C: IsotopologueCorrection>(
    samples: Vec<Sample>,
    isotopologues: &Isotopologues,
    correction: &C,
    scale: &Scale,
) -> Result<Vec<Labelling>> {
    let samples = correct(samples, isotopologues, correction)?;
    Ok(to_rows(samples, scale))
}

/// Like [`labelling`], with growth removed from every experiment after
/// its isotopologues were corrected
///
/// Returns the rows together with the growth fitted per experiment.
pub fn growth_corrected_labelling<C: IsotopologueCorrection>(
    samples: Vec<Sample>,
    isotopologues: &Isotopologues,
    correction: &C,
    scale: &Scale,
) -> Result<(Vec<Labelling>, HashMap<String, Growth>)> {
    let mut by_experiment: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
    for s in samples {
        by_experiment.entry(s.experiment.clone()).or_default().push(s);
    }

    let mut growth = HashMap::new();
    let mut corrected = Vec::new();
    for (experiment, samples) in by_experiment {
        let samples = correct(samples, isotopologues, correction)?;
        let (samples, g) = growth_correction(samples)?;
        log::info!("{}: growth rate {:.4}/h", experiment, g.rate.value);
        growth.insert(experiment, g);
        corrected.extend(samples);
    }
    Ok((to_rows(corrected, scale), growth))
}

fn to_rows(mut samples: Vec<Sample>, scale: &Scale) -> Vec<Labelling> {
    samples.sort_by(|a, b| {
        a.experiment
            .cmp(&b.experiment)
            .then(a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows = samples
        .iter()
        .map(|s| {
            let mut row = Labelling::new(s.experiment.clone(), s.time, s.unlabelled, &s.labelled);
            row.scale(scale);
            row
        })
        .collect::<Vec<_>>();

    if scale.amount.is_some() {
        labelled_rate(&mut rows);
    }
    rows
}

/// Fill [`Labelling::labelled_rate`] with the finite difference of the
/// labelled amount over time, per experiment, in row order
pub fn labelled_rate(rows: &mut [Labelling]) {
    let mut previous: HashMap<String, (f64, f64)> = HashMap::new();
    for row in rows.iter_mut() {
        let labelled = match row.amount {
            Some(a) => a.labelled,
            None => continue,
        };
        row.labelled_rate = previous
            .get(&row.experiment)
            .map(|(time, amount)| (labelled - amount) / (row.time - time));
        previous.insert(row.experiment.clone(), (row.time, labelled));
    }
}

/// Keep samples whose total intensity exceeds `threshold` times the largest
/// single isotopologue intensity of their experiment
pub fn remove_low_values(samples: Vec<Sample>, threshold: f64) -> Vec<Sample> {
    let mut max: HashMap<String, f64> = HashMap::new();
    for s in &samples {
        let m = max.entry(s.experiment.clone()).or_insert(f64::NEG_INFINITY);
        *m = s.intensities().fold(*m, f64::max);
    }
    samples
        .into_iter()
        .filter(|s| s.total() > threshold * max[&s.experiment])
        .collect()
}

/// Fitted growth of a pool over time
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Growth {
    pub prefactor: Estimate,
    pub rate: Estimate,
}

/// Fit exponential growth of the total pool and remove it from the
/// labelled intensities
///
/// The pool is normalised to the mean total at `t = 0`; labelled
/// intensities are then divided by `1 + rate * t`.
pub fn growth_correction(samples: Vec<Sample>) -> Result<(Vec<Sample>, Growth)> {
    let samples = samples
        .into_iter()
        .filter(|s| s.total() != 0.0)
        .collect::<Vec<_>>();
    let baseline = samples
        .iter()
        .filter(|s| s.time == 0.0)
        .map(Sample::total)
        .collect::<Vec<_>>();
    if baseline.is_empty() {
        return Err(Error::InvalidInput(
            "growth correction needs measurements at t = 0".into(),
        ));
    }
    let baseline = stats::mean(&baseline);

    let x = samples.iter().map(|s| s.time).collect::<Vec<_>>();
    let y = samples.iter().map(|s| s.total() / baseline).collect::<Vec<_>>();
    let fit = curve_fit(&ExpGrowth, &x, &y, &FitOptions::new(vec![1.0, 0.1]))?;
    let se = fit.standard_errors();
    let growth = Growth {
        prefactor: Estimate::new(fit.params[0], se[0]),
        rate: Estimate::new(fit.params[1], se[1]),
    };

    let corrected = samples
        .into_iter()
        .map(|mut s| {
            let factor = 1.0 + growth.rate.value * s.time;
            s.labelled.iter_mut().for_each(|v| *v /= factor);
            s
        })
        .collect();
    Ok((corrected, growth))
}

/// Measured size of a pool, mean and standard deviation
pub type PoolSize = Estimate;

/// Labelled and unlabelled quantities after scaling by a measured pool size
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoolCorrected {
    pub experiment: String,
    pub time: f64,
    pub labelled: Estimate,
    pub unlabelled: Estimate,
}

/// Scale percentages by the pool size of each experiment
///
/// Experiments without a pool of their own fall back to the `reference`
/// pool (usually the wild type).
pub fn pool_corrected(
    rows: &[Labelling],
    pools: &HashMap<String, PoolSize>,
    reference: &str,
) -> Result<Vec<PoolCorrected>> {
    rows.iter()
        .map(|row| {
            let pool = pools
                .get(&row.experiment)
                .or_else(|| pools.get(reference))
                .ok_or_else(|| Error::MissingPool(row.experiment.clone()))?;
            let scale = |pct: f64| Estimate::new(pct * pool.value / 100.0, pct * pool.sd / 100.0);
            Ok(PoolCorrected {
                experiment: row.experiment.clone(),
                time: row.time,
                labelled: scale(row.sum_labelled_percent),
                unlabelled: scale(row.no_label_percent),
            })
        })
        .collect()
}

/// Mean labelled quantity per time point
///
/// Without a measured pool the result is the mean labelled percentage.
/// With one, fractions are multiplied by the measured mean and the
/// relative errors of both add in quadrature.
pub fn labelled_mean(
    rows: &[Labelling],
    measured_mean: Option<f64>,
    measured_sd: Option<f64>,
) -> Vec<(f64, Estimate)> {
    let mut by_time: BTreeMap<u64, (f64, Vec<f64>)> = BTreeMap::new();
    for row in rows {
        by_time
            .entry(row.time.to_bits())
            .or_insert_with(|| (row.time, Vec::new()))
            .1
            .push(row.sum_labelled_percent);
    }
    let mut out = by_time
        .into_iter()
        .map(|(_, (time, values))| {
            let ms_mean = stats::mean(&values) / 100.0;
            let ms_std = stats::stddev(&values) / 100.0;
            let estimate = match measured_mean {
                Some(pool) => {
                    let mean = pool * ms_mean;
                    let sd = match measured_sd {
                        Some(pool_sd) => {
                            mean * ((pool_sd / pool).powi(2) + (ms_std / ms_mean).powi(2)).sqrt()
                        }
                        None => mean * ms_std,
                    };
                    Estimate::new(mean, sd)
                }
                None => Estimate::new(ms_mean * 100.0, ms_std * 100.0),
            };
            (time, estimate)
        })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    out
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! sample {
        ($exp:expr, $t:expr, $u:expr, $($l:expr),*) => {
            Sample { experiment: $exp.into(), time: $t, unlabelled: $u, labelled: vec![$($l),*] }
        };
    }

    fn two() -> Isotopologues {
        Isotopologues {
            metabolite: "NAD".into(),
            unlabelled: "No label".into(),
            labelled: vec!["5C13".into(), "10C13".into()],
        }
    }

    #[test]
    fn minutes() {
        let s = Sample::from_minutes("a", 90.0, 1.0, vec![]);
        assert_eq!(s.time, 1.5);
    }

    #[test]
    fn cleaning() {
        let samples = vec![
            sample!("a", 0.0, 0.0, 0.0, 0.0),
            sample!("a", 1.0, f64::NAN, f64::NAN, f64::NAN),
            sample!("a", 2.0, 10.0, f64::NAN, 5.0),
        ];
        let cleaned = clean(samples);
        assert_eq!(cleaned, vec![sample!("a", 2.0, 10.0, 0.0, 5.0)]);
    }

    #[test]
    fn percentages() {
        let samples = vec![
            sample!("b", 2.0, 50.0, 25.0, 25.0),
            sample!("a", 1.0, 75.0, 25.0, 0.0),
        ];
        let scale = Scale {
            amount: Some(10.0),
            ..Scale::default()
        };
        let rows = labelling(samples, &two(), &NoCorrection, &scale).unwrap();
        assert_eq!(rows[0].experiment, "a");
        assert_eq!(rows[0].no_label_percent, 75.0);
        assert_eq!(rows[0].sum_labelled_percent, 25.0);
        assert_eq!(rows[1].isotopologue_percent, vec![25.0, 25.0]);
        assert_eq!(
            rows[1].amount,
            Some(Scaled {
                unlabelled: 5.0,
                labelled: 5.0
            })
        );
        assert_eq!(rows[1].per_protein, None);
    }

    #[test]
    fn wrong_isotopologue_count() {
        let samples = vec![sample!("a", 1.0, 1.0, 1.0)];
        assert!(labelling(samples, &two(), &NoCorrection, &Scale::default()).is_err());
    }

    #[test]
    fn rate() {
        let samples = vec![
            sample!("a", 0.0, 100.0, 0.0, 0.0),
            sample!("a", 2.0, 80.0, 20.0, 0.0),
            sample!("a", 4.0, 60.0, 40.0, 0.0),
            sample!("b", 1.0, 50.0, 50.0, 0.0),
        ];
        let scale = Scale {
            amount: Some(10.0),
            ..Scale::default()
        };
        let rows = labelling(samples, &two(), &NoCorrection, &scale).unwrap();
        let rates = rows.iter().map(|r| r.labelled_rate).collect::<Vec<_>>();
        assert_eq!(rates, vec![None, Some(1.0), Some(1.0), None]);
    }

    #[test]
    fn write_rows() {
        let samples = vec![sample!("a", 0.0, 100.0, 0.0, 0.0), sample!("a", 2.0, 80.0, 20.0, 0.0)];
        let scale = Scale {
            amount: Some(10.0),
            ..Scale::default()
        };
        let rows = labelling(samples, &two(), &NoCorrection, &scale).unwrap();
        let path = std::env::temp_dir().join(format!("turnover-labelling-{}.csv", std::process::id()));
        write_labelling(&path, &two(), &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Exp,Time in hours,No label,"));
        assert!(lines[0].ends_with("amount_unlabelled,amount_labelled,labelled_rate"));
        assert!(lines[1].ends_with(",10,0,"));
        assert!(lines[2].ends_with(",8,2,1"));
    }

    #[test]
    fn low_values() {
        let samples = vec![
            sample!("a", 0.0, 100.0, 0.0),
            sample!("a", 1.0, 5.0, 4.0),
            sample!("a", 2.0, 50.0, 10.0),
        ];
        let kept = remove_low_values(samples, 0.1);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|s| s.total() > 10.0));
    }

    #[test]
    fn low_values_per_experiment() {
        let samples = vec![
            sample!("strong", 0.0, 1000.0, 0.0),
            sample!("weak", 0.0, 50.0, 10.0),
            sample!("weak", 1.0, 40.0, 10.0),
            sample!("weak", 2.0, 2.0, 1.0),
        ];
        let kept = remove_low_values(samples, 0.1);
        let names = kept.iter().map(|s| s.experiment.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["strong", "weak", "weak"]);
    }

    #[test]
    fn pools() {
        let rows = vec![
            Labelling::new("mP", 1.0, 60.0, &[40.0]),
            Labelling::new("HeLa", 1.0, 80.0, &[20.0]),
        ];
        let mut pools = HashMap::new();
        pools.insert("mP".to_string(), Estimate::new(10.0, 1.0));
        pools.insert("wt".to_string(), Estimate::new(20.0, 2.0));

        let corrected = pool_corrected(&rows, &pools, "wt").unwrap();
        assert_eq!(corrected[0].labelled, Estimate::new(4.0, 0.4));
        assert_eq!(corrected[1].unlabelled, Estimate::new(16.0, 1.6));
        assert!(pool_corrected(&rows, &pools, "none").is_err());
    }

    #[test]
    fn means() {
        let rows = vec![
            Labelling::new("a", 1.0, 80.0, &[20.0]),
            Labelling::new("a", 1.0, 60.0, &[40.0]),
            Labelling::new("a", 0.0, 100.0, &[0.0]),
        ];
        let means = labelled_mean(&rows, None, None);
        assert_eq!(means.len(), 2);
        assert_eq!(means[0].0, 0.0);
        assert!((means[1].1.value - 30.0).abs() < 1e-12);

        let scaled = labelled_mean(&rows, Some(10.0), Some(1.0));
        let (_, e) = scaled[1];
        assert!((e.value - 3.0).abs() < 1e-12);
        let rel = (0.01f64 + (stats::stddev(&[0.2, 0.4]) / 0.3).powi(2)).sqrt();
        assert!((e.sd - 3.0 * rel).abs() < 1e-12);
    }

    #[test]
    fn growth() {
        let rate = 0.02;
        let samples = (0..6)
            .flat_map(|i| {
                let t = i as f64 * 4.0;
                let total = 100.0 * (rate * t).exp();
                vec![
                    sample!("a", t, total * 0.5, total * 0.5),
                    sample!("a", t, total * 0.5, total * 0.5),
                ]
            })
            .collect::<Vec<_>>();
        let (corrected, growth) = growth_correction(samples).unwrap();
        assert!((growth.rate.value - rate).abs() < 1e-8);
        assert!((growth.prefactor.value - 1.0).abs() < 1e-8);
        let last = corrected.last().unwrap();
        let expected = 100.0 * (rate * 20.0).exp() * 0.5 / (1.0 + rate * 20.0);
        assert!((last.labelled[0] - expected).abs() < 1e-6);

        let late = vec![sample!("a", 1.0, 1.0, 1.0), sample!("a", 2.0, 1.0, 1.0)];
        assert!(growth_correction(late).is_err());
    }

    /// Moves all unlabelled signal into the labelled isotopologue and
    /// remembers the intensities it was given
    #[derive(Default)]
    struct Unmix {
        seen: std::cell::RefCell<Vec<f64>>,
    }

    impl IsotopologueCorrection for Unmix {
        fn correct(&self, _: &Isotopologues, samples: &mut [Sample]) -> Result<()> {
            for s in samples.iter_mut() {
                self.seen.borrow_mut().push(s.labelled[0]);
                s.labelled[0] += s.unlabelled;
                s.unlabelled = 0.0;
            }
            Ok(())
        }
    }

    #[test]
    fn growth_after_correction() {
        let iso = Isotopologues {
            labelled: vec!["5C13".into()],
            ..Isotopologues::default()
        };
        // Only the sum of both intensities grows exponentially
        let rate = 0.02;
        let samples = (0..6)
            .map(|i| {
                let t = i as f64 * 4.0;
                let total = 100.0 * (rate * t).exp();
                sample!("a", t, 60.0, total - 60.0)
            })
            .collect::<Vec<_>>();
        let raw = samples.iter().map(|s| s.labelled[0]).collect::<Vec<_>>();

        let unmix = Unmix::default();
        let (rows, growth) =
            growth_corrected_labelling(samples, &iso, &unmix, &Scale::default()).unwrap();
        assert_eq!(*unmix.seen.borrow(), raw);

        let g = growth["a"];
        assert!((g.rate.value - rate).abs() < 1e-8);
        assert_eq!(rows.len(), 6);
        let last = rows.last().unwrap();
        let expected = 100.0 * (rate * 20.0).exp() / (1.0 + rate * 20.0);
        assert!((last.sum_labelled - expected).abs() < 1e-4);
        assert_eq!(last.sum_labelled_percent, 100.0);
    }
}
