use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tmt::{ChannelGroups, Config, FoldChangeTable, RatioTable, VennSets};
use turnover::*;
use uniprot::GeneNames;

/// NAD turnover from isotope tracing and PARP proteomics analyses
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Half-life of every experiment from the labelled fraction
    HalfLife(HalfLifeArgs),
    /// Separate cytosolic and mitochondrial half-lives
    CytoMito(CytoMitoArgs),
    /// Pool turnover per cell type from the unlabelled decay
    Turnover(TurnoverArgs),
    /// Significant fold changes between channel groups
    FoldChange(FoldChangeArgs),
    /// Overlap counts of a fold change table
    Venn(VennArgs),
    /// Principal component analysis of the ratio columns
    Pca(PcaArgs),
    /// Format durations given in hours
    PrettyTime {
        #[arg(required = true, allow_negative_numbers = true)]
        hours: Vec<f64>,
    },
}

#[derive(Args)]
struct Input {
    /// Measurement tables (CSV), one or more experiments each
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Inputs are tab separated kinetic model output
    #[arg(long)]
    simulation: bool,

    /// Labelling pulse in simulation output, in minutes
    #[arg(long, default_value_t = MODEL_START_TIME)]
    start_time: f64,

    /// Drop samples whose total is below this fraction of the largest
    /// intensity of their experiment
    #[arg(long)]
    threshold: Option<f64>,

    /// Total amount in the analysed cells
    #[arg(long)]
    amount: Option<f64>,

    /// Total amount per dry weight protein
    #[arg(long)]
    per_protein: Option<f64>,

    /// Intracellular concentration
    #[arg(long)]
    concentration: Option<f64>,

    /// Write the labelled fractions of every sample
    #[arg(long)]
    labelling: Option<PathBuf>,
}

impl Input {
    fn scale(&self) -> Scale {
        Scale {
            amount: self.amount,
            per_protein: self.per_protein,
            concentration: self.concentration,
        }
    }

    fn samples(&self, columns: &Columns) -> Result<Vec<Sample>> {
        let samples = self
            .files
            .par_iter()
            .map(|f| read_samples(f, columns).with_context(|| format!("reading {}", f.display())))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        Ok(match self.threshold {
            Some(t) => remove_low_values(samples, t),
            None => samples,
        })
    }

    fn load(&self) -> Result<Vec<Labelling>> {
        let columns = Columns::default();
        let rows = if self.simulation {
            self.files
                .par_iter()
                .map(|f| {
                    read_model_output(f, self.start_time)
                        .with_context(|| format!("reading {}", f.display()))
                })
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect()
        } else {
            labelling(
                self.samples(&columns)?,
                &columns.isotopologues,
                &NoCorrection,
                &self.scale(),
            )?
        };
        if rows.is_empty() {
            bail!("no measurements left after cleaning");
        }
        if let Some(path) = &self.labelling {
            let iso = match self.simulation {
                true => Isotopologues {
                    labelled: vec!["labelled".into()],
                    ..columns.isotopologues.clone()
                },
                false => columns.isotopologues.clone(),
            };
            write_labelling(path, &iso, &rows)?;
        }
        Ok(rows)
    }
}

#[derive(Args)]
struct HalfLifeArgs {
    #[command(flatten)]
    input: Input,

    /// Resample the replicates of each time point
    #[arg(long)]
    resample: bool,

    #[arg(long, default_value_t = 200)]
    runs: usize,

    /// Fraction of replicates drawn per time point
    #[arg(long, default_value_t = 0.5)]
    fraction: f64,

    /// Draw replicates with replacement
    #[arg(long)]
    replace: bool,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Measured pool mean used to scale the per time point means
    #[arg(long)]
    pool_mean: Option<f64>,

    #[arg(long, requires = "pool_mean")]
    pool_sd: Option<f64>,

    /// Write per time point means of the labelled fraction
    #[arg(long)]
    means: Option<PathBuf>,

    /// Write the fitted labelling curve of every experiment, 0 to 50 h
    #[arg(long)]
    curves: Option<PathBuf>,

    #[arg(short, long, default_value = "half_life.csv")]
    output: PathBuf,
}

#[derive(Args)]
struct CytoMitoArgs {
    #[command(flatten)]
    input: Input,

    /// JSON list of compartment estimations
    #[arg(long)]
    config: PathBuf,

    #[arg(short, long, default_value = "half_life_cyto_mito.csv")]
    output: PathBuf,
}

#[derive(Args)]
struct TurnoverArgs {
    #[command(flatten)]
    input: Input,

    /// CSV with `cell type`, `mean` and `sd` of every measured pool
    #[arg(long)]
    pools: PathBuf,

    /// Pool used for cell types without a measurement of their own
    #[arg(long, default_value = "wt")]
    reference: String,

    /// Remove exponential growth from the labelled intensities
    #[arg(long)]
    growth_correction: bool,

    /// Replicates per cell type, for the pairwise t statistics
    #[arg(long)]
    n_samples: Option<usize>,

    /// Write the pool corrected labelled and unlabelled amounts
    #[arg(long)]
    pool_corrected: Option<PathBuf>,

    #[arg(short, long, default_value = "turnover.csv")]
    output: PathBuf,

    #[arg(long, default_value = "turnover_t_statistics.csv")]
    statistics: PathBuf,
}

#[derive(Args)]
struct Proteomics {
    /// Tab delimited protein table with abundance ratio columns
    table: PathBuf,

    /// JSON channel group configuration, defaults to the PARP screen
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Proteomics {
    fn load(&self) -> Result<(Config, ChannelGroups, RatioTable)> {
        let config = match &self.config {
            Some(p) => Config::load(p).with_context(|| format!("reading {}", p.display()))?,
            None => Config::default(),
        };
        let groups = config.channel_groups()?;
        let table = RatioTable::load(&self.table)
            .with_context(|| format!("reading {}", self.table.display()))?
            .dropna()
            .exclude(&config.exclude);
        Ok((config, groups, table))
    }
}

#[derive(Args)]
struct FoldChangeArgs {
    #[command(flatten)]
    input: Proteomics,

    /// Tab delimited `accession\tgene` table
    #[arg(long)]
    genes: Option<PathBuf>,

    /// Override the configured p-value cutoff
    #[arg(long)]
    p_cutoff: Option<f64>,

    #[arg(short, long, default_value = "results_p_001.tsv")]
    output: PathBuf,
}

#[derive(Args)]
struct VennArgs {
    /// Fold change table written by `fold-change`
    results: PathBuf,

    #[arg(short, long, default_value = "venn_labels.tsv")]
    output: PathBuf,
}

#[derive(Args)]
struct PcaArgs {
    #[command(flatten)]
    input: Proteomics,

    /// Share of variance the kept components must explain
    #[arg(long, default_value_t = 0.95)]
    variance: f64,

    #[arg(short, long, default_value = "pca_results")]
    outdir: PathBuf,
}

fn half_life(args: HalfLifeArgs) -> Result<()> {
    let rows = args.input.load()?;
    let opts = ResampleOptions {
        runs: args.runs,
        fraction: args.fraction,
        replace: args.replace,
        seed: args.seed,
    };
    let table = half_life_table(&rows, &Mode::Single(Some(opts)), args.resample)?;
    if let HalfLifeTable::Single(entries) = &table {
        for e in entries {
            println!(
                "{}\t{} +/- {}\t(n = {})",
                e.experiment,
                pretty_print_time(e.half_life_time),
                pretty_print_time(e.standard_deviation),
                e.n_samples
            );
        }
    }
    table.write(&args.output)?;
    log::info!("wrote {} experiments to {}", table.len(), args.output.display());

    if let Some(path) = &args.means {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&["time", "mean", "sd"])?;
        for (time, e) in labelled_mean(&rows, args.pool_mean, args.pool_sd) {
            wtr.write_record(&[time.to_string(), e.value.to_string(), e.sd.to_string()])?;
        }
        wtr.flush()?;
    }

    if let (Some(path), HalfLifeTable::Single(entries)) = (&args.curves, &table) {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&["experiment", "time", "labelled_fraction"])?;
        for e in entries {
            for (t, y) in sample_curve(&SaturatingGrowth, &[e.prefactor, e.exp_factor], 0.0, 50.0, 0.1) {
                wtr.write_record(&[e.experiment.clone(), t.to_string(), y.to_string()])?;
            }
        }
        wtr.flush()?;
    }
    Ok(())
}

fn cyto_mito(args: CytoMitoArgs) -> Result<()> {
    let file = fs::File::open(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let compartments: Vec<Compartments> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", args.config.display()))?;

    let rows = args.input.load()?;
    let table = half_life_table(&rows, &Mode::CytoMito(compartments), false)?;
    if let HalfLifeTable::CytoMito(entries) = &table {
        for e in entries {
            println!(
                "{}\tcyto {}\tmito {}",
                e.name,
                pretty_print_time(e.half_life_time_cyto),
                pretty_print_time(e.half_life_time_mito)
            );
        }
    }
    table.write(&args.output)?;
    Ok(())
}

#[derive(Deserialize)]
struct PoolRecord {
    #[serde(rename = "cell type")]
    cell_type: String,
    mean: f64,
    sd: f64,
}

fn read_pools<P: AsRef<Path>>(path: P) -> Result<HashMap<String, PoolSize>> {
    let mut rdr = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("reading {}", path.as_ref().display()))?;
    let mut pools = HashMap::new();
    for record in rdr.deserialize() {
        let r: PoolRecord = record?;
        pools.insert(r.cell_type, PoolSize::new(r.mean, r.sd));
    }
    Ok(pools)
}

fn turnover(args: TurnoverArgs) -> Result<()> {
    let pools = read_pools(&args.pools)?;
    let columns = Columns::default();

    let (rows, growth) = if args.growth_correction {
        if args.input.simulation {
            bail!("growth correction needs measured isotopologues");
        }
        let (rows, growth) = growth_corrected_labelling(
            args.input.samples(&columns)?,
            &columns.isotopologues,
            &NoCorrection,
            &args.input.scale(),
        )
        .context("growth correction")?;
        (rows, growth)
    } else {
        (args.input.load()?, HashMap::new())
    };

    if let Some(path) = &args.pool_corrected {
        write_csv(path, &pool_corrected(&rows, &pools, &args.reference)?)?;
    }

    let decay = decay_parameters(&rows, &growth)?;
    let table = turnover_table(&decay, &pools, &args.reference)?;
    for t in &table {
        println!(
            "{}\thalf-life {}\tturnover {:.3} +/- {:.3}",
            t.cell_type,
            pretty_print_time(t.half_life),
            t.turnover,
            t.turnover_error
        );
    }
    write_csv(&args.output, &table)?;

    if let Some(n) = args.n_samples {
        write_csv(&args.statistics, &turnover_t_statistics(&table, n)?)?;
    }
    Ok(())
}

fn fold_change(args: FoldChangeArgs) -> Result<()> {
    let (config, groups, table) = args.input.load()?;
    let genes = match &args.genes {
        Some(p) => GeneNames::load(p).with_context(|| format!("reading {}", p.display()))?,
        None => GeneNames::default(),
    };
    let cutoff = args.p_cutoff.unwrap_or(config.p_cutoff);
    let cmp = tmt::compare(&table, &groups, cutoff)?;
    let fc = FoldChangeTable::new(&cmp, &config.compared, &config.control, &genes);
    fc.write(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("{} proteins with significant fold changes", fc.rows.len());
    Ok(())
}

fn venn(args: VennArgs) -> Result<()> {
    let results = FoldChangeTable::load(&args.results)
        .with_context(|| format!("reading {}", args.results.display()))?;
    let sets = VennSets::from_table(&results);
    for region in sets.labels()? {
        println!("{}\t{}", region.key, region.combined().replace('\n', " "));
    }
    tmt::write_labels(&args.output, &sets)?;
    Ok(())
}

fn pca(args: PcaArgs) -> Result<()> {
    let (_, groups, table) = args.input.load()?;
    let result = tmt::pca(&table, &groups, args.variance)?;
    fs::create_dir_all(&args.outdir)?;
    result.write_explained_variance(args.outdir.join("explained_variance.tsv"))?;
    result.write_scores(args.outdir.join("scores.tsv"))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::HalfLife(args) => half_life(args),
        Commands::CytoMito(args) => cyto_mito(args),
        Commands::Turnover(args) => turnover(args),
        Commands::FoldChange(args) => fold_change(args),
        Commands::Venn(args) => venn(args),
        Commands::Pca(args) => pca(args),
        Commands::PrettyTime { hours } => {
            for h in hours {
                println!("{}", pretty_print_time(h));
            }
            Ok(())
        }
    }
}
