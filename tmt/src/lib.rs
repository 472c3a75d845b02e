//! Analysis of TMT abundance ratio tables from a PARP localisation screen.
//!
//! This library's API follows the order of the analysis.
//!
//! A protein table is loaded into a [`RatioTable`]. Proteins with missing
//! ratios and known outliers are removed before anything is compared.
//!
//! ```rust,ignore
//! # use tmt::*;
//! let config = Config::default();
//! let table = RatioTable::load("./data/P19-24_1253.tsv")?
//!     .dropna()
//!     .exclude(&config.exclude);
//! ```
//!
//! Ratio columns are assigned to conditions through [`ChannelGroups`].
//! Every ordered pair of groups is compared protein by protein, and the
//! significant comparisons against the control group are collected into a
//! [`FoldChangeTable`]
//!
//! ```rust,ignore
//! # use tmt::*;
//! let groups = config.channel_groups()?;
//! let cmp = compare(&table, &groups, config.p_cutoff)?;
//! let genes = uniprot::GeneNames::load("gene_names.txt")?;
//! let fc = FoldChangeTable::new(&cmp, &config.compared, &config.control, &genes);
//! fc.write("results_p_001.tsv")?;
//! ```
//!
//! A fold change table can be summarised as overlap counts ([`VennSets`]),
//! and the raw table as a principal component analysis ([`pca()`]).

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

mod fold_change;
mod pca;
mod stats;
mod table;
mod venn;

pub use fold_change::{compare, Comparison, Comparisons, FoldChangeRow, FoldChangeTable};
pub use pca::{pca, standard_scale, Pca, Score};
pub use table::{ChannelGroups, Config, Group, RatioTable, CHANNEL_TAG, RATIO_PREFIX};
pub use venn::{venn_labels, write_labels, VennRegion, VennSets};

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing column {0}")]
    MissingColumn(String),
    #[error("line {line}: cannot parse {value:?}")]
    Parse { line: usize, value: String },
    #[error("row {0} does not match the number of columns")]
    Shape(String),
    #[error("unknown group {0}")]
    UnknownGroup(String),
    #[error("{0:?} is not a channel tag")]
    InvalidTag(String),
    #[error("{0}")]
    Empty(&'static str),
    #[error("cannot label the regions of {0} sets, at most 31 are supported")]
    TooManySets(usize),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
