use crate::utils::parser::parse_charge_model;
use clap::{Args, Parser, Subcommand};
use p3m::engine::tuning::ChargeModel;
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
    about = "P3M CLI - Reciprocal-space Coulomb forces for periodic particle systems with the analytically differentiated P3M method.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress bars and all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute reciprocal-space forces for a random neutral test system.
    Forces(ForcesArgs),
    /// Rank candidate (mesh, cao, alpha) triples by their estimated RMS force error.
    Tune(TuneArgs),
}

/// Options shared by every command that generates a test system.
#[derive(Args, Debug, Clone, Default)]
pub struct SystemArgs {
    /// Path to a TOML run configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of particles in the generated system
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub particles: Option<usize>,

    /// Seed of the particle generator
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Edge length of the cubic box
    #[arg(short = 'L', long = "box", value_name = "LENGTH")]
    pub box_length: Option<f64>,

    /// Override any configuration value (e.g., -S method.brillouin=2)
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ForcesArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Mesh points per dimension
    #[arg(short, long, value_name = "M", help_heading = "Method Overrides")]
    pub mesh: Option<usize>,

    /// Charge assignment order (1..=7)
    #[arg(long, value_name = "ORDER", help_heading = "Method Overrides")]
    pub cao: Option<usize>,

    /// Ewald splitting parameter
    #[arg(short, long, value_name = "ALPHA", help_heading = "Method Overrides")]
    pub alpha: Option<f64>,

    /// Add a second grid shifted by half a mesh spacing
    #[arg(long, help_heading = "Method Overrides")]
    pub interlaced: bool,

    /// Number of per-particle forces to print
    #[arg(long, value_name = "COUNT", default_value_t = 10)]
    pub show: usize,
}

#[derive(Args, Debug, Clone)]
pub struct TuneArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    /// Candidate mesh sizes
    #[arg(long, value_delimiter = ',', value_name = "LIST", help_heading = "Candidates")]
    pub meshes: Option<Vec<usize>>,

    /// Candidate charge assignment orders
    #[arg(long, value_delimiter = ',', value_name = "LIST", help_heading = "Candidates")]
    pub caos: Option<Vec<usize>>,

    /// Candidate splitting parameters
    #[arg(long, value_delimiter = ',', value_name = "LIST", help_heading = "Candidates")]
    pub alphas: Option<Vec<f64>>,

    /// Real-space cutoff used by the Kolafa-Perram estimate
    #[arg(long, value_name = "RADIUS")]
    pub r_cut: Option<f64>,

    /// Also report the Hockney-Eastwood functional for this charge model
    /// (point-charge, correlated-dipole, water)
    #[arg(long, value_name = "MODEL", value_parser = parse_charge_model)]
    pub charge_model: Option<ChargeModel>,

    /// Number of ranked candidates to print
    #[arg(long, value_name = "COUNT", default_value_t = 10)]
    pub top: usize,
}
