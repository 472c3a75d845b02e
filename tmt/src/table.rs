//! Abundance ratio tables exported from a TMT quantification
use super::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::prelude::*;
use uniprot::Pitchfork;

/// Prefix shared by all abundance ratio columns
pub const RATIO_PREFIX: &str = "Abundance Ratio:";

/// Channel tag inside a ratio column name, e.g. `F1, 127N`
pub const CHANNEL_TAG: &str = r"[a-zA-Z]\d, \d{3}[a-zA-Z]";

/// Abundance ratios of every protein, one row per accession
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RatioTable {
    pub columns: Vec<String>,
    pub accessions: Vec<String>,
    values: Vec<f64>,
}

fn cell(field: &[u8]) -> &str {
    std::str::from_utf8(field)
        .unwrap_or("")
        .trim()
        .trim_matches('"')
}

impl RatioTable {
    /// Load a tab delimited protein table
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RatioTable> {
        let mut buffer = Vec::new();
        fs::File::open(path.as_ref())?.read_to_end(&mut buffer)?;
        let table = RatioTable::parse(&buffer)?;
        log::info!(
            "{}: {} proteins, {} ratio columns",
            path.as_ref().display(),
            table.len(),
            table.columns.len()
        );
        Ok(table)
    }

    /// Parse the `Accession` column and every `Abundance Ratio:` column of
    /// a tab delimited table. Other columns are ignored, empty cells are
    /// missing values.
    pub fn parse(buffer: &[u8]) -> Result<RatioTable> {
        let mut lines = Pitchfork::new(b'\n', buffer)
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .enumerate()
            .filter(|(_, line)| !line.is_empty());

        let (_, header) = lines.next().ok_or(Error::Empty("table has no header"))?;
        let header = Pitchfork::new(b'\t', header).map(cell).collect::<Vec<_>>();
        let accession = header
            .iter()
            .position(|h| *h == "Accession")
            .ok_or_else(|| Error::MissingColumn("Accession".into()))?;
        let ratio_idx = header
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with(RATIO_PREFIX))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        let mut table = RatioTable {
            columns: ratio_idx.iter().map(|&i| header[i].to_string()).collect(),
            ..RatioTable::default()
        };

        for (line_no, line) in lines {
            let fields = Pitchfork::new(b'\t', line).map(cell).collect::<Vec<_>>();
            let acc = fields
                .get(accession)
                .ok_or_else(|| Error::MissingColumn("Accession".into()))?;
            table.accessions.push(acc.to_string());
            for &i in &ratio_idx {
                let value = match fields.get(i).copied().unwrap_or("") {
                    "" => f64::NAN,
                    v => v.parse::<f64>().map_err(|_| Error::Parse {
                        line: line_no + 1,
                        value: v.to_string(),
                    })?,
                };
                table.values.push(value);
            }
        }
        Ok(table)
    }

    /// Build a table from rows of `(accession, ratios)`
    pub fn from_rows(columns: Vec<String>, rows: Vec<(String, Vec<f64>)>) -> Result<RatioTable> {
        let mut table = RatioTable {
            columns,
            ..RatioTable::default()
        };
        for (acc, values) in rows {
            if values.len() != table.columns.len() {
                return Err(Error::Shape(acc));
            }
            table.accessions.push(acc);
            table.values.extend(values);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.accessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessions.is_empty()
    }

    /// Ratios of the `i`th protein, in column order
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.columns.len();
        &self.values[i * n..(i + 1) * n]
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        (0..self.len()).map(move |i| (self.accessions[i].as_str(), self.row(i)))
    }

    fn retain<F: Fn(&str, &[f64]) -> bool>(self, f: F) -> RatioTable {
        let mut out = RatioTable {
            columns: self.columns.clone(),
            ..RatioTable::default()
        };
        for (acc, row) in self.rows() {
            if f(acc, row) {
                out.accessions.push(acc.to_string());
                out.values.extend_from_slice(row);
            }
        }
        out
    }

    /// Drop every protein with at least one missing ratio
    pub fn dropna(self) -> RatioTable {
        let before = self.len();
        let table = self.retain(|_, row| row.iter().all(|v| !v.is_nan()));
        log::debug!("dropped {} proteins with missing ratios", before - table.len());
        table
    }

    /// Drop the listed accessions
    pub fn exclude<S: AsRef<str>>(self, accessions: &[S]) -> RatioTable {
        let excluded = accessions.iter().map(|s| s.as_ref()).collect::<HashSet<_>>();
        self.retain(|acc, _| !excluded.contains(acc))
    }
}

/// A set of TMT channels measuring the same condition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Short label used for plotting sample scores
    #[serde(default)]
    pub label: Option<String>,
    pub channels: Vec<String>,
}

impl Group {
    pub fn new<S: Into<String>>(name: S, label: Option<&str>, channels: &[&str]) -> Group {
        Group {
            name: name.into(),
            label: label.map(String::from),
            channels: channels.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Named groups of channel tags
#[derive(Clone, Debug)]
pub struct ChannelGroups {
    tag: Regex,
    groups: Vec<Group>,
}

impl ChannelGroups {
    /// Validate that every channel looks like a channel tag
    pub fn new(groups: Vec<Group>) -> Result<ChannelGroups> {
        let tag = Regex::new(&format!("^{}$", CHANNEL_TAG))?;
        if let Some(bad) = groups
            .iter()
            .flat_map(|g| g.channels.iter())
            .find(|c| !tag.is_match(c))
        {
            return Err(Error::InvalidTag(bad.clone()));
        }
        Ok(ChannelGroups {
            tag: Regex::new(CHANNEL_TAG)?,
            groups,
        })
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Result<&Group> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))
    }

    /// Indices of the columns containing any channel of the group
    pub fn columns(&self, name: &str, columns: &[String]) -> Result<Vec<usize>> {
        let group = self.get(name)?;
        Ok(columns
            .iter()
            .enumerate()
            .filter(|(_, col)| group.channels.iter().any(|c| col.contains(c.as_str())))
            .map(|(i, _)| i)
            .collect())
    }

    /// First channel tag in a column name
    pub fn tag<'a>(&self, column: &'a str) -> Option<&'a str> {
        self.tag.find(column).map(|m| m.as_str())
    }

    /// Group owning the first channel tag of a column
    pub fn group_of(&self, column: &str) -> Option<&Group> {
        let tag = self.tag(column)?;
        self.groups.iter().find(|g| g.channels.iter().any(|c| c == tag))
    }

    /// Plot label of the column's group, if it has one
    pub fn label(&self, column: &str) -> Option<&str> {
        self.group_of(column)?.label.as_deref()
    }
}

/// Channel groups and comparison settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub groups: Vec<Group>,
    /// Reference group every compared group is reported against
    pub control: String,
    /// Groups reported in the fold change table, in column order
    pub compared: Vec<String>,
    /// Accessions removed before any comparison
    pub exclude: Vec<String>,
    pub p_cutoff: f64,
}

impl Default for Config {
    /// PARP localisation screen with and without inhibitor
    fn default() -> Config {
        let groups = vec![
            Group::new("mitoParp", Some("mP"), &["F3, 127N", "F2, 130N", "F1, 129C"]),
            Group::new("cytoParp", Some("cP"), &["F1, 128C", "F2, 128C", "F3, 131N"]),
            Group::new("erParp", Some("erP"), &["F3, 129C", "F1, 130C", "F2, 131C"]),
            Group::new("pexParp", Some("pP"), &["F1, 128N", "F2, 130C", "F3, 130C"]),
            Group::new("mitoParp_pj", None, &["F1, 129N", "F2, 131N", "F3, 131C"]),
            Group::new("cytoParp_pj", None, &["F3, 127C", "F2, 129C", "F1, 131N"]),
            Group::new("erParp_pj", None, &["F3, 128N", "F2, 129N", "F1, 130N"]),
            Group::new("pexParp_pj", None, &["F2, 128N", "F3, 129N", "F1, 131C"]),
            Group::new("control", Some("293"), &["F1, 127N", "F2, 127C", "F3, 128C"]),
            Group::new("control_pj", None, &["F2, 127N", "F1, 127C", "F3, 130N"]),
        ];
        Config {
            groups,
            control: "control".into(),
            compared: ["mitoParp", "cytoParp", "erParp", "pexParp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: vec!["Q86TN4".into(), "Q9BVA0".into()],
            p_cutoff: 0.001,
        }
    }
}

impl Config {
    /// Read a JSON configuration; missing fields take their default values
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let file = fs::File::open(path)?;
        let config = serde_json::from_reader(io::BufReader::new(file))?;
        Ok(config)
    }

    pub fn channel_groups(&self) -> Result<ChannelGroups> {
        let groups = ChannelGroups::new(self.groups.clone())?;
        groups.get(&self.control)?;
        for name in &self.compared {
            groups.get(name)?;
        }
        Ok(groups)
    }
}
