//! Overlap of regulated proteins between groups
use super::*;
use crate::fold_change::FoldChangeTable;
use std::io::prelude::*;

/// Up-regulated, down-regulated and all significant accessions of each
/// ratio column
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VennSets {
    pub names: Vec<String>,
    pub up: Vec<HashSet<String>>,
    pub down: Vec<HashSet<String>>,
    pub total: Vec<HashSet<String>>,
}

impl VennSets {
    pub fn from_table(table: &FoldChangeTable) -> VennSets {
        let n = table.columns.len();
        let mut sets = VennSets {
            names: table.columns.clone(),
            up: vec![HashSet::new(); n],
            down: vec![HashSet::new(); n],
            total: vec![HashSet::new(); n],
        };
        for row in &table.rows {
            for (k, ratio) in row.ratios.iter().enumerate() {
                let r = match ratio {
                    Some(r) if !r.is_nan() => *r,
                    _ => continue,
                };
                if r > 0.0 {
                    sets.up[k].insert(row.accession.clone());
                } else if r < 0.0 {
                    sets.down[k].insert(row.accession.clone());
                }
                sets.total[k].insert(row.accession.clone());
            }
        }
        sets
    }

    /// Region labels of all three diagrams, keyed by membership
    pub fn labels(&self) -> Result<Vec<VennRegion>> {
        let up = venn_labels(&self.up)?;
        let down = venn_labels(&self.down)?;
        let total = venn_labels(&self.total)?;
        Ok(up
            .into_iter()
            .map(|(key, n_up)| VennRegion {
                n_down: down.get(&key).copied().unwrap_or(0),
                n_total: total.get(&key).copied().unwrap_or(0),
                key,
                n_up,
            })
            .collect())
    }
}

/// Membership counts of a single region
#[derive(Clone, Debug, PartialEq)]
pub struct VennRegion {
    /// `1` at position `i` if the region lies inside set `i`
    pub key: String,
    pub n_up: usize,
    pub n_down: usize,
    pub n_total: usize,
}

impl VennRegion {
    /// `⇧{up}\n⇩{down}`
    pub fn combined(&self) -> String {
        format!("\u{21e7}{}\n\u{21e9}{}", self.n_up, self.n_down)
    }
}

/// Number of elements that belong to exactly the sets marked in each key
///
/// Keys are binary strings with one digit per set, e.g. `"1010"` for
/// elements in the first and third but no other set. Every non-empty key
/// is present, including regions with no elements. At most 31 sets fit
/// into a key.
pub fn venn_labels(sets: &[HashSet<String>]) -> Result<BTreeMap<String, usize>> {
    let n = sets.len();
    if n >= 32 {
        return Err(Error::TooManySets(n));
    }
    let mut labels = (1u32..(1 << n))
        .map(|bits| (key(bits, n), 0))
        .collect::<BTreeMap<String, usize>>();

    let all = sets.iter().flatten().collect::<HashSet<&String>>();
    for element in all {
        let bits = sets
            .iter()
            .enumerate()
            .filter(|(_, s)| s.contains(element))
            .fold(0u32, |acc, (i, _)| acc | 1 << (n - 1 - i));
        if let Some(count) = labels.get_mut(&key(bits, n)) {
            *count += 1;
        }
    }
    Ok(labels)
}

fn key(bits: u32, n: usize) -> String {
    format!("{:0width$b}", bits, width = n)
}

/// Write one line per region: key, member groups and the counts of every
/// diagram
pub fn write_labels<P: AsRef<Path>>(p: P, sets: &VennSets) -> Result<()> {
    let regions = sets.labels()?;
    let mut f = io::BufWriter::new(fs::File::create(p)?);
    writeln!(f, "key\tgroups\tup\tdown\ttotal")?;
    for region in regions {
        let groups = region
            .key
            .chars()
            .zip(&sets.names)
            .filter(|(c, _)| *c == '1')
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            region.key, groups, region.n_up, region.n_down, region.n_total
        )?;
    }
    f.flush()?;
    Ok(())
}
