pub mod commands;
pub mod formatter;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "binqc",
    version,
    about = "Completeness and contamination estimates for genome bins",
    long_about = "binqc calls genes in each bin, annotates the proteins against a KEGG-annotated \
                  reference database and feeds the resulting features to two trained models. \
                  A similarity rule picks, per bin, which model's estimate to report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict completeness and contamination of genome bins
    Predict(commands::predict::PredictArgs),

    /// Set or show the location of the annotation database
    Database(commands::database::DatabaseArgs),
}

impl Cli {
    /// Default tracing directive implied by -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
