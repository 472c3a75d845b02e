//! Principal component analysis of the TMT channels
//!
//! Every ratio column is a sample and every protein a feature. Features are
//! standard scaled before the decomposition, and only as many components are
//! kept as needed to explain the requested share of variance.
use super::*;
use crate::table::{ChannelGroups, RatioTable};
use nalgebra::DMatrix;
use std::io::prelude::*;

/// Projection of one sample onto the kept components
#[derive(Clone, Debug, PartialEq)]
pub struct Score {
    pub column: String,
    pub label: String,
    pub components: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pca {
    /// Share of the total variance explained by each kept component
    pub explained_variance_ratio: Vec<f64>,
    /// Scores of all samples whose group carries a label
    pub scores: Vec<Score>,
}

/// Center each column to zero mean and scale it to unit population
/// standard deviation; constant columns are only centered
pub fn standard_scale(x: &mut DMatrix<f64>) {
    for mut col in x.column_iter_mut() {
        let values = col.iter().copied().collect::<Vec<_>>();
        let mean = stats::mean(&values);
        let mut sd = stats::stddev(&values);
        if sd == 0.0 || !sd.is_finite() {
            sd = 1.0;
        }
        col.iter_mut().for_each(|v| *v = (*v - mean) / sd);
    }
}

/// Smallest number of leading components whose cumulative share of
/// variance is strictly greater than `variance`, or all of them
fn n_components(ratios: &[f64], variance: f64) -> usize {
    let mut cumulative = 0.0;
    for (k, r) in ratios.iter().enumerate() {
        cumulative += r;
        if cumulative > variance {
            return k + 1;
        }
    }
    ratios.len()
}

/// Fit the decomposition on every ratio column of `table`
pub fn pca(table: &RatioTable, groups: &ChannelGroups, variance: f64) -> Result<Pca> {
    let n_samples = table.columns.len();
    let n_features = table.len();
    if n_samples < 2 || n_features == 0 {
        return Err(Error::Empty("PCA needs at least two samples and one protein"));
    }

    let mut x = DMatrix::from_fn(n_samples, n_features, |s, f| table.row(f)[s]);
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::Empty("PCA input contains missing ratios"));
    }
    standard_scale(&mut x);

    let svd = x.clone().svd(false, true);
    let v_t = svd.v_t.ok_or(Error::Empty("SVD did not converge"))?;
    let s = &svd.singular_values;

    let mut order = (0..s.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| s[b].partial_cmp(&s[a]).unwrap_or(std::cmp::Ordering::Equal));
    let total = s.iter().map(|v| v * v).sum::<f64>();
    let ratios = order.iter().map(|&i| s[i] * s[i] / total).collect::<Vec<_>>();

    let k = n_components(&ratios, variance);
    let cumulative = ratios[..k].iter().sum::<f64>();

    // Orient each axis so that its largest loading is positive
    let axes = order[..k]
        .iter()
        .map(|&i| {
            let row = v_t.row(i).transpose();
            let largest = row
                .iter()
                .copied()
                .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            if largest < 0.0 {
                -row
            } else {
                row
            }
        })
        .collect::<Vec<_>>();

    let scores = table
        .columns
        .iter()
        .enumerate()
        .filter_map(|(sample, column)| {
            let label = groups.label(column)?;
            let row = x.row(sample);
            Some(Score {
                column: column.clone(),
                label: label.to_string(),
                components: axes.iter().map(|axis| (&row * axis)[(0, 0)]).collect(),
            })
        })
        .collect::<Vec<_>>();

    log::info!(
        "{} components explain {:.1}% of variance",
        k,
        cumulative * 100.0
    );
    Ok(Pca {
        explained_variance_ratio: ratios[..k].to_vec(),
        scores,
    })
}

impl Pca {
    /// Write sample scores, one row per sample and one column per component
    pub fn write_scores<P: AsRef<Path>>(&self, p: P) -> io::Result<()> {
        let mut f = io::BufWriter::new(fs::File::create(p)?);
        write!(f, "sample")?;
        for i in 1..=self.explained_variance_ratio.len() {
            write!(f, "\t{}", i)?;
        }
        writeln!(f, "\tlabel")?;
        for score in &self.scores {
            write!(f, "{}", score.column)?;
            for c in &score.components {
                write!(f, "\t{}", c)?;
            }
            writeln!(f, "\t{}", score.label)?;
        }
        f.flush()
    }

    pub fn write_explained_variance<P: AsRef<Path>>(&self, p: P) -> io::Result<()> {
        let mut f = io::BufWriter::new(fs::File::create(p)?);
        writeln!(f, "component\texplained_variance_ratio")?;
        for (i, r) in self.explained_variance_ratio.iter().enumerate() {
            writeln!(f, "{}\t{}", i + 1, r)?;
        }
        f.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table::Group;

    fn column(tag: &str) -> String {
        format!("Abundance Ratio: ({}) / (F1, 126)", tag)
    }

    fn groups() -> ChannelGroups {
        ChannelGroups::new(vec![
            Group::new("a", Some("A"), &["F1, 127N", "F1, 127C"]),
            Group::new("b", Some("B"), &["F1, 128N"]),
            Group::new("c", None, &["F1, 128C"]),
        ])
        .unwrap()
    }

    /// Columns are samples: one ratio per protein
    fn table(samples: &[[f64; 3]; 4]) -> RatioTable {
        let columns = ["F1, 127N", "F1, 127C", "F1, 128N", "F1, 128C"]
            .iter()
            .map(|t| column(t))
            .collect();
        let rows = (0..3)
            .map(|f| (format!("P{}", f), samples.iter().map(|s| s[f]).collect()))
            .collect();
        RatioTable::from_rows(columns, rows).unwrap()
    }

    #[test]
    fn scaling() {
        let mut x = DMatrix::from_row_slice(3, 2, &[1.0, 5.0, 2.0, 5.0, 3.0, 5.0]);
        standard_scale(&mut x);
        let sd = (2.0f64 / 3.0).sqrt();
        assert!((x[(0, 0)] + 1.0 / sd).abs() < 1e-12);
        assert_eq!(x[(1, 0)], 0.0);
        assert!(x.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn rank_one() {
        let t = table(&[
            [1.0, 2.0, 4.0],
            [2.0, 4.0, 3.0],
            [3.0, 6.0, 2.0],
            [4.0, 8.0, 1.0],
        ]);
        let p = pca(&t, &groups(), 0.95).unwrap();
        assert_eq!(p.explained_variance_ratio.len(), 1);
        assert!((p.explained_variance_ratio[0] - 1.0).abs() < 1e-9);

        // The unlabelled sample is projected but not reported
        assert_eq!(p.scores.len(), 3);
        assert_eq!(p.scores[0].label, "A");
        let z = 1.5 / 1.25f64.sqrt();
        let expected = 3.0f64.sqrt() * z;
        assert!((p.scores[0].components[0].abs() - expected).abs() < 1e-9);
        assert!((p.scores[0].components[0] + p.scores[2].components[0] * 3.0).abs() < 1e-9);
    }

    #[test]
    fn component_selection() {
        let t = table(&[
            [1.0, 1.0, 2.0],
            [2.0, 3.0, 1.0],
            [3.0, 2.0, 4.0],
            [4.0, 4.0, 3.0],
        ]);
        let p = pca(&t, &groups(), 0.95).unwrap();
        let r = &p.explained_variance_ratio;
        assert!(r.windows(2).all(|w| w[0] >= w[1]));
        let sum = r.iter().sum::<f64>();
        assert!(sum >= 0.95 - 1e-12 && sum <= 1.0 + 1e-12);
        assert!(r[..r.len() - 1].iter().sum::<f64>() <= 0.95);

        let again = pca(&t, &groups(), 0.95).unwrap();
        assert_eq!(again, p);
    }

    #[test]
    fn cut_on_tie() {
        let ratios = [0.5, 0.25, 0.25];
        assert_eq!(n_components(&ratios, 0.75), 3);
        assert_eq!(n_components(&ratios, 0.7), 2);
        assert_eq!(n_components(&ratios, 0.4), 1);
        assert_eq!(n_components(&ratios, 1.0), 3);
        assert_eq!(n_components(&[], 0.95), 0);
    }

    #[test]
    fn too_small() {
        let t = RatioTable::from_rows(vec![column("F1, 127N")], vec![("P".into(), vec![1.0])]).unwrap();
        assert!(pca(&t, &groups(), 0.95).is_err());
    }
}
