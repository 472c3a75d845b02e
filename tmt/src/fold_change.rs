//! Pairwise fold changes between channel groups
use super::*;
use crate::table::{ChannelGroups, RatioTable};
use rayon::prelude::*;
use std::io::prelude::*;
use turnover::stats::ttest_ind;
use uniprot::{GeneNames, Pitchfork};

/// Significant difference of one protein between two groups
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub accession: String,
    /// `log2(mean(first) / mean(second))`
    pub log2_ratio: f64,
    pub pvalue: f64,
}

/// Significant comparisons for every ordered pair of groups
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Comparisons {
    inner: BTreeMap<(String, String), Vec<Comparison>>,
}

impl Comparisons {
    pub fn get(&self, first: &str, second: &str) -> Option<&[Comparison]> {
        self.inner
            .get(&(first.to_string(), second.to_string()))
            .map(Vec::as_slice)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, &[Comparison])> {
        self.inner
            .iter()
            .map(|((a, b), v)| (a.as_str(), b.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn compare_pair(table: &RatioTable, first: &[usize], second: &[usize], cutoff: f64) -> Vec<Comparison> {
    let mut x = Vec::with_capacity(first.len());
    let mut y = Vec::with_capacity(second.len());
    let mut out = Vec::new();
    for (acc, row) in table.rows() {
        x.clear();
        y.clear();
        x.extend(first.iter().map(|&i| row[i]));
        y.extend(second.iter().map(|&i| row[i]));
        let t = ttest_ind(&x, &y);
        if t.pvalue < cutoff {
            out.push(Comparison {
                accession: acc.to_string(),
                log2_ratio: (stats::mean(&x) / stats::mean(&y)).log2(),
                pvalue: t.pvalue,
            });
        }
    }
    out
}

/// Compare every ordered pair of distinct groups, keeping proteins with a
/// two-sample t-test p-value below `cutoff`
///
/// Groups without any matching ratio column are skipped.
pub fn compare(table: &RatioTable, groups: &ChannelGroups, cutoff: f64) -> Result<Comparisons> {
    let mut resolved = Vec::new();
    for g in groups.groups() {
        let cols = groups.columns(&g.name, &table.columns)?;
        if cols.is_empty() {
            log::warn!("group {} matches no ratio column", g.name);
            continue;
        }
        resolved.push((g.name.as_str(), cols));
    }

    let pairs = (0..resolved.len())
        .flat_map(|i| (0..resolved.len()).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect::<Vec<_>>();

    let inner = pairs
        .par_iter()
        .map(|&(i, j)| {
            let (a, ca) = &resolved[i];
            let (b, cb) = &resolved[j];
            let found = compare_pair(table, ca, cb, cutoff);
            log::debug!("{} vs {}: {} significant", a, b, found.len());
            ((a.to_string(), b.to_string()), found)
        })
        .collect::<BTreeMap<_, _>>();
    Ok(Comparisons { inner })
}

#[derive(Clone, Debug, PartialEq)]
pub struct FoldChangeRow {
    pub accession: String,
    /// One entry per table column, `None` if not significant
    pub ratios: Vec<Option<f64>>,
    /// Number of significant ratios
    pub count: usize,
    pub gene_name: Option<String>,
}

/// Significant log2 fold changes of selected groups against a control
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FoldChangeTable {
    pub columns: Vec<String>,
    pub rows: Vec<FoldChangeRow>,
}

impl FoldChangeTable {
    /// Collect the comparisons of each `compared` group against `control`
    ///
    /// Proteins significant in at least one comparison are kept and sorted
    /// by the number of comparisons they appear in, most first.
    pub fn new<S: AsRef<str>>(
        comparisons: &Comparisons,
        compared: &[S],
        control: &str,
        genes: &GeneNames,
    ) -> FoldChangeTable {
        let n = compared.len();
        let mut ratios: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
        for (k, group) in compared.iter().enumerate() {
            let found = match comparisons.get(group.as_ref(), control) {
                Some(found) => found,
                None => {
                    log::warn!("no comparison of {} against {}", group.as_ref(), control);
                    continue;
                }
            };
            for c in found {
                ratios.entry(c.accession.as_str()).or_insert_with(|| vec![None; n])[k] =
                    Some(c.log2_ratio);
            }
        }

        let rows = ratios
            .into_iter()
            .map(|(acc, ratios)| FoldChangeRow {
                accession: acc.to_string(),
                count: ratios.iter().filter(|r| r.is_some()).count(),
                gene_name: genes.lookup(acc).map(String::from),
                ratios,
            })
            .collect();

        let mut table = FoldChangeTable {
            columns: compared
                .iter()
                .map(|g| format!("ratio_{}_{}", g.as_ref(), control))
                .collect(),
            rows,
        };
        table.finish();
        table
    }

    fn finish(&mut self) {
        self.rows.retain(|r| r.count >= 1);
        self.rows.sort_by(|a, b| b.count.cmp(&a.count));
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Write a tab delimited table; missing ratios are empty fields
    pub fn write<P: AsRef<Path>>(&self, p: P) -> io::Result<()> {
        let mut f = io::BufWriter::new(fs::File::create(p)?);
        writeln!(f, "protein\t{}\tcount\tgene_name", self.columns.join("\t"))?;
        for row in &self.rows {
            write!(f, "{}", row.accession)?;
            for r in &row.ratios {
                match r {
                    Some(v) => write!(f, "\t{}", v)?,
                    None => write!(f, "\t")?,
                }
            }
            writeln!(f, "\t{}\t{}", row.count, row.gene_name.as_deref().unwrap_or(""))?;
        }
        f.flush()
    }

    /// Load a table written by [`FoldChangeTable::write`]
    pub fn load<P: AsRef<Path>>(p: P) -> Result<FoldChangeTable> {
        let mut buffer = Vec::new();
        fs::File::open(p)?.read_to_end(&mut buffer)?;
        FoldChangeTable::parse(&buffer)
    }

    /// Parse a fold change table; every `ratio_` column is read, the count
    /// is recomputed from them
    pub fn parse(buffer: &[u8]) -> Result<FoldChangeTable> {
        let text = |b: &[u8]| String::from_utf8_lossy(b).trim().to_string();
        let mut lines = Pitchfork::new(b'\n', buffer)
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .enumerate()
            .filter(|(_, line)| !line.is_empty());
        let (_, header) = lines.next().ok_or(Error::Empty("table has no header"))?;
        let header = Pitchfork::new(b'\t', header).map(text).collect::<Vec<_>>();
        let ratio_idx = header
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with("ratio_"))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let gene_idx = header.iter().position(|h| h == "gene_name");

        let mut table = FoldChangeTable {
            columns: ratio_idx.iter().map(|&i| header[i].clone()).collect(),
            rows: Vec::new(),
        };
        for (line_no, line) in lines {
            let fields = Pitchfork::new(b'\t', line).map(text).collect::<Vec<_>>();
            let cell = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");
            let ratios = ratio_idx
                .iter()
                .map(|&i| match cell(i) {
                    "" => Ok(None),
                    v => v.parse::<f64>().map(Some).map_err(|_| Error::Parse {
                        line: line_no + 1,
                        value: v.to_string(),
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            table.rows.push(FoldChangeRow {
                accession: cell(0).to_string(),
                count: ratios.iter().filter(|r| r.is_some()).count(),
                gene_name: gene_idx
                    .map(cell)
                    .filter(|g| !g.is_empty())
                    .map(String::from),
                ratios,
            });
        }
        table.finish();
        Ok(table)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table::Group;

    macro_rules! col {
        ($tag:expr) => {
            format!("Abundance Ratio: ({}) / (F1, 126)", $tag)
        };
    }

    fn fixture() -> (RatioTable, ChannelGroups) {
        let columns = vec![
            col!("F1, 127N"),
            col!("F2, 127N"),
            col!("F3, 127N"),
            col!("F1, 128N"),
            col!("F2, 128N"),
            col!("F3, 128N"),
        ];
        let rows = vec![
            ("UP".to_string(), vec![1.0, 1.01, 0.99, 2.0, 2.01, 1.99]),
            ("DOWN".to_string(), vec![1.0, 1.01, 0.99, 0.5, 0.51, 0.49]),
            ("SAME".to_string(), vec![1.0, 1.1, 0.9, 1.0, 0.9, 1.1]),
        ];
        let table = RatioTable::from_rows(columns, rows).unwrap();
        let groups = ChannelGroups::new(vec![
            Group::new("control", None, &["F1, 127N", "F2, 127N", "F3, 127N"]),
            Group::new("treated", None, &["F1, 128N", "F2, 128N", "F3, 128N"]),
            Group::new("absent", None, &["F1, 131C"]),
        ])
        .unwrap();
        (table, groups)
    }

    #[test]
    fn pairs() {
        let (table, groups) = fixture();
        let cmp = compare(&table, &groups, 0.001).unwrap();
        assert_eq!(cmp.len(), 2);

        let found = cmp.get("treated", "control").unwrap();
        assert_eq!(found.len(), 2);
        let up = found.iter().find(|c| c.accession == "UP").unwrap();
        assert!((up.log2_ratio - 1.0).abs() < 1e-9);
        assert!(up.pvalue < 1e-6);

        let reverse = cmp.get("control", "treated").unwrap();
        let down = reverse.iter().find(|c| c.accession == "DOWN").unwrap();
        assert!((down.log2_ratio - 1.0).abs() < 1e-9);
        assert!(cmp.get("absent", "control").is_none());
    }

    #[test]
    fn table() {
        let (table, groups) = fixture();
        let cmp = compare(&table, &groups, 0.001).unwrap();
        let genes = vec![("UP".to_string(), "GENE1".to_string())]
            .into_iter()
            .collect::<GeneNames>();
        let fc = FoldChangeTable::new(&cmp, &["treated", "absent"], "control", &genes);

        assert_eq!(fc.columns, vec!["ratio_treated_control", "ratio_absent_control"]);
        assert_eq!(fc.rows.len(), 2);
        let down = &fc.rows[0];
        assert_eq!(down.accession, "DOWN");
        assert!((down.ratios[0].unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(down.ratios[1], None);
        assert_eq!(down.count, 1);
        assert_eq!(fc.rows[1].gene_name.as_deref(), Some("GENE1"));
    }

    #[test]
    fn write_and_load() {
        let (table, groups) = fixture();
        let cmp = compare(&table, &groups, 0.001).unwrap();
        let fc = FoldChangeTable::new(&cmp, &["treated"], "control", &GeneNames::default());

        let path = std::env::temp_dir().join(format!("tmt-fold-change-{}.tsv", std::process::id()));
        fc.write(&path).unwrap();
        let loaded = FoldChangeTable::load(&path).unwrap();
        assert_eq!(loaded, fc);
    }

    #[test]
    fn parse_counts() {
        let input = "protein\tratio_a_control\tratio_b_control\tcount\tgene_name\n\
                     P1\t1.5\t\t1\tPARP1\n\
                     P2\t-0.5\t2\t2\t\n";
        let fc = FoldChangeTable::parse(input.as_bytes()).unwrap();
        assert_eq!(fc.rows[0].accession, "P2");
        assert_eq!(fc.rows[0].count, 2);
        assert_eq!(fc.rows[0].gene_name, None);
        assert_eq!(fc.rows[1].gene_name.as_deref(), Some("PARP1"));
        assert_eq!(fc.column("ratio_b_control"), Some(1));
    }
}
