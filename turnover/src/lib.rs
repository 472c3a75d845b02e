//! Estimation of NAD half-lives and turnover from isotope tracing
//! experiments.
//!
//! The library is built around a small pipeline. Raw isotopologue
//! intensities are loaded into [`Sample`]s, which are converted into
//! labelled fractions ([`Labelling`]) for each experiment and time point.
//!
//! ```rust,ignore
//! # use turnover::*;
//! let samples = read_samples("./data/HeLa.csv", &Columns::default())?;
//! let rows = labelling(samples, &Isotopologues::default(), &NoCorrection, &Scale::default())?;
//! ```
//!
//! Labelled fractions are fitted by bounded nonlinear least squares
//! ([`curve_fit`]) to one of the exponential [`Model`]s. The half-life and
//! its uncertainty follow from the fitted factors and their covariance.
//!
//! ```rust,ignore
//! # use turnover::*;
//! let est = estimate_half_life(&rows)?;
//! println!("{} +/- {}", pretty_print_time(est.half_life.value), est.half_life.sd);
//! ```
//!
//! Whole-experiment summaries are produced by [`half_life_table`], which
//! runs every experiment in parallel and can be written out as CSV.

use thiserror::Error;

mod estimate;
mod fit;
mod halflife;
mod labelling;
mod model;
mod parser;
pub mod stats;

pub use estimate::*;
pub use fit::{curve_fit, Bounds, Fit, FitOptions};
pub use halflife::*;
pub use labelling::*;
pub use model::{sample_curve, CellDecay, ExpDecay, ExpGrowth, Model, SaturatingGrowth};
pub use parser::{read_model_output, read_samples, Columns, MODEL_START_TIME};

#[derive(Debug, Error)]
pub enum Error {
    #[error("x and y differ in length ({0} != {1})")]
    LengthMismatch(usize, usize),
    #[error("initial guess has {0} parameters, model needs {1}")]
    InitialGuess(usize, usize),
    #[error("{points} data points cannot determine {params} parameters")]
    InsufficientData { points: usize, params: usize },
    #[error("non-finite value in fit input")]
    NonFinite,
    #[error("singular system: {0}")]
    Singular(&'static str),
    #[error("fit did not converge after {0} iterations")]
    NotConverged(usize),
    #[error("no measurements for experiment {0}")]
    MissingExperiment(String),
    #[error("no pool size for {0} and no reference pool")]
    MissingPool(String),
    #[error("missing column {0}")]
    MissingColumn(String),
    #[error("line {line}: cannot parse {value:?} in column {column}")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
