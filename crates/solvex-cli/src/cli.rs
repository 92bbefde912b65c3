use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Solvex CLI - Predict the solubility (logS) of small molecules and find the solvent and temperature that maximize it.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S training.seed=7
    #[arg(short = 'S', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean and featurize a raw solubility dataset.
    Prepare(PrepareArgs),
    /// Train the model roster on a raw dataset and keep the best model.
    Train(TrainArgs),
    /// Find the solvent and temperature with the highest predicted solubility.
    Optimize(OptimizeArgs),
    /// Print the molecular descriptors of a structure.
    Describe(DescribeArgs),
    /// Manage the local data directory where trained models are stored.
    Data(DataArgs),
}

/// Arguments for the `prepare` subcommand.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Path to the raw solubility CSV.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Path for the featurized CSV.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Also write a plain-text statistics report to this path.
    #[arg(long, value_name = "PATH")]
    pub stats: Option<PathBuf>,

    /// Lower bound of the logS window kept while cleaning.
    #[arg(long, value_name = "FLOAT", allow_hyphen_values = true)]
    pub log_s_min: Option<f64>,

    /// Upper bound of the logS window kept while cleaning.
    #[arg(long, value_name = "FLOAT", allow_hyphen_values = true)]
    pub log_s_max: Option<f64>,
}

/// Arguments for the `train` subcommand.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to the raw solubility CSV.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Also write the featurized dataset to this path.
    #[arg(long, value_name = "PATH")]
    pub features_out: Option<PathBuf>,

    /// Where to store the best model. Defaults to the data directory.
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Comma-separated roster ids to evaluate, in order (e.g. 'linear,random-forest').
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Fraction of rows held out for evaluation.
    #[arg(long, value_name = "FLOAT")]
    pub test_fraction: Option<f64>,

    /// Seed for the train/test split and the stochastic models.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}

/// Arguments for the `optimize` subcommand.
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// SMILES of the query compound.
    #[arg(required = true, value_name = "SMILES")]
    pub smiles: String,

    /// Lowest temperature to search, in Kelvin.
    #[arg(long, value_name = "K")]
    pub t_min: Option<f64>,

    /// Highest temperature to search, in Kelvin.
    #[arg(long, value_name = "K")]
    pub t_max: Option<f64>,

    /// Temperature step, in Kelvin.
    #[arg(long, value_name = "K")]
    pub t_step: Option<f64>,

    /// Candidate solvent as a SMILES or a common name. Can be used multiple times.
    #[arg(short, long = "solvent", value_name = "SOLVENT")]
    pub solvents: Vec<String>,

    /// Number of ranked conditions to report.
    #[arg(long, value_name = "INT")]
    pub top_k: Option<usize>,

    /// Path of the trained model. Defaults to the data directory.
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Print the result as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `describe` subcommand.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// SMILES of the compound to describe.
    #[arg(required = true, value_name = "SMILES")]
    pub smiles: String,

    /// Print the descriptors as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `data` subcommand.
#[derive(Args, Debug)]
pub struct DataArgs {
    #[command(subcommand)]
    pub command: DataCommands,
}

/// Available commands for data management.
#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Show the absolute path to the local data directory.
    Path,
    /// Set a custom path for the local data directory.
    SetPath {
        /// The new path to use for storing trained models.
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Reset the data path to its default, OS-specific location.
    ResetPath,
}
