use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rona::{
    io::{self as rio, LfmmEnvironment},
    Association, CovariateTable, FrequencyTable, OutlierConfig, PopulationOrder, Rona, RonaConfig,
    RonaResults, ScoreRule,
};

#[derive(Parser, Debug)]
#[command(
    name = "rona",
    version,
    about = "Calculates the Risk of Non-Adaptedness (RONA) from BayPass or LFMM results"
)]
struct Cli {
    #[command(subcommand)]
    upstream: Upstream,
}

#[derive(Subcommand, Debug)]
enum Upstream {
    /// Use BayPass betai and pij summaries
    Baypass(BaypassArgs),
    /// Use an LFMM results file and its genotype input
    Lfmm(LfmmArgs),
}

#[derive(Args, Debug)]
struct SharedArgs {
    /// File with present environmental data
    #[arg(long = "pc", required = true)]
    present_covars_file: PathBuf,

    /// File with future environmental data
    #[arg(long = "fc", required = true)]
    future_covars_file: PathBuf,

    /// Number of covariates to report, most represented first
    #[arg(
        long = "covars",
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    num_covars: u64,

    /// Outlier removal: 0 keeps every point, 1 removes at most one, 2 removes any number
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
    outliers: u8,

    /// Immutable covariates (e.g. latitude, longitude, altitude) to leave out
    #[arg(long, num_args = 1.., default_values = ["1", "2", "3"])]
    immutables: Vec<String>,

    /// RONA type: 'diff', 'absdiff' or 'dist'
    #[arg(long = "ronatype", default_value = "absdiff")]
    score_rule: ScoreRule,

    /// Use plain instead of R²-weighted means across markers
    #[arg(long)]
    no_weighted_means: bool,

    /// Where to write the summary table (stdout if omitted)
    #[arg(long = "out")]
    outfile: Option<PathBuf>,

    /// Also write the standard errors of the average RONA
    #[arg(long)]
    stderr: bool,
}

impl SharedArgs {
    fn config(&self) -> RonaConfig {
        RonaConfig::builder()
            .score_rule(self.score_rule)
            .use_weights(!self.no_weighted_means)
            .outliers(OutlierConfig::from_level(self.outliers).unwrap_or_default())
            .num_covars(self.num_covars as usize)
            .build()
    }
}

#[derive(Args, Debug)]
struct BaypassArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// File with population names, in BayPass input order
    #[arg(long = "pop", required = true)]
    popnames_file: PathBuf,

    /// BayPass summary betai file
    #[arg(long = "beta", required = true)]
    betai_file: PathBuf,

    /// BayPass summary pij file
    #[arg(long = "pij", required = true)]
    pij_file: PathBuf,

    /// Bayes factor threshold for considering associations
    #[arg(long = "bf", default_value_t = 20.0)]
    bayes_factor: f64,
}

#[derive(Args, Debug)]
struct LfmmArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// LFMM association results (comma separated p-values)
    #[arg(long = "assoc", required = true)]
    assoc_file: PathBuf,

    /// LFMM genotype input file
    #[arg(long = "genotypes", required = true)]
    genotypes_file: PathBuf,

    /// P-value threshold for considering associations
    #[arg(long = "p-thres", default_value_t = 0.01)]
    p_thres: f64,
}

/// Everything the estimation needs, however it was read
struct Inputs {
    populations: PopulationOrder,
    present: CovariateTable,
    future: CovariateTable,
    frequencies: FrequencyTable,
    associations: Vec<Association>,
}

fn load_baypass(args: &BaypassArgs) -> Result<Inputs> {
    let shared = &args.shared;
    let present = rio::read_baypass_envfile(rio::open(&shared.present_covars_file)?)
        .context("Failed to read present covariates")?;
    let future = rio::read_baypass_envfile(rio::open(&shared.future_covars_file)?)
        .context("Failed to read future covariates")?;
    let populations = rio::read_popnames(rio::open(&args.popnames_file)?)
        .context("Failed to read population names")?;
    let associations = rio::read_baypass_betai(
        rio::open(&args.betai_file)?,
        args.bayes_factor,
        &shared.immutables,
    )
    .context("Failed to read betai summary")?;
    let frequencies = rio::read_baypass_pij(rio::open(&args.pij_file)?, &associations)
        .context("Failed to read pij summary")?;
    Ok(Inputs {
        populations,
        present,
        future,
        frequencies,
        associations,
    })
}

fn load_lfmm(args: &LfmmArgs) -> Result<Inputs> {
    let shared = &args.shared;
    let present: LfmmEnvironment = rio::read_lfmm_envfile(rio::open(&shared.present_covars_file)?)
        .context("Failed to read present covariates")?;
    let future = rio::read_lfmm_envfile(rio::open(&shared.future_covars_file)?)
        .context("Failed to read future covariates")?;
    if future.populations != present.populations {
        anyhow::bail!("Present and future environment files list different populations");
    }
    let associations = rio::read_lfmm_results(
        rio::open(&args.assoc_file)?,
        args.p_thres,
        &shared.immutables,
    )
    .context("Failed to read LFMM results")?;
    let frequencies = rio::read_lfmm_genotypes(
        rio::open(&args.genotypes_file)?,
        &present.sizes,
        &associations,
    )
    .context("Failed to read LFMM genotypes")?;
    Ok(Inputs {
        populations: present.populations,
        present: present.covariates,
        future: future.covariates,
        frequencies,
        associations,
    })
}

fn write_results(results: &RonaResults, shared: &SharedArgs) -> Result<()> {
    let mut writer: Box<dyn Write> = match &shared.outfile {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Unable to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    results.write_summary(&mut writer)?;
    if shared.stderr {
        writeln!(writer)?;
        results.write_stderr(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let (inputs, shared) = match &cli.upstream {
        Upstream::Baypass(args) => (load_baypass(args)?, &args.shared),
        Upstream::Lfmm(args) => (load_lfmm(args)?, &args.shared),
    };
    log::info!(
        "Loaded {} populations, {} covariates and {} associations",
        inputs.populations.len(),
        inputs.present.len(),
        inputs.associations.len()
    );

    let results = Rona::new(
        &inputs.populations,
        &inputs.present,
        &inputs.future,
        &inputs.frequencies,
        shared.config(),
    )
    .run(&inputs.associations)?;

    if results.is_empty() {
        log::warn!("No covariate had any scorable marker");
    }
    write_results(&results, shared)
}
