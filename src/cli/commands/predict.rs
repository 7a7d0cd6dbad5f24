use crate::cli::formatter::{self, print_stats_table, print_success, print_tip, print_warning};
use crate::core::config::{load_config, Config};
use crate::core::database::resolve_database;
use crate::core::inputs::discover_bins;
use crate::core::pipeline::{Predictor, PredictorOptions};
use crate::report::RunMode;
use crate::tools::{DiamondOptions, DiamondRunner, ProdigalOptions, ProdigalRunner};
use crate::utils::parallel::resolve_threads;
use crate::utils::progress::progress_visible;
use crate::utils::workspace::OutputLayout;
use clap::{ArgGroup, Args};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("model").args(["general", "specific", "allmodels"])))]
pub struct PredictArgs {
    /// Bin directory or one or more bin files
    #[arg(short, long, required = true, num_args = 1.., value_name = "PATH")]
    pub input: Vec<PathBuf>,

    /// Directory for the report and intermediate files
    #[arg(short, long = "output-directory", value_name = "DIR")]
    pub output_directory: PathBuf,

    /// Bin file extension when the input is a directory [default: .fna, .faa with --genes]
    #[arg(short = 'x', long)]
    pub extension: Option<String>,

    /// Inputs are protein files; skip gene calling
    #[arg(long)]
    pub genes: bool,

    /// Clear the output directory if it is not empty
    #[arg(long)]
    pub force: bool,

    /// Smaller search block size for machines with little memory
    #[arg(long)]
    pub lowmem: bool,

    /// Report only the general model
    #[arg(long)]
    pub general: bool,

    /// Report only the specific model
    #[arg(long)]
    pub specific: bool,

    /// Report both models side by side
    #[arg(long)]
    pub allmodels: bool,

    /// Add the cosine similarity to the reference set to the report
    #[arg(long = "dbg-cos")]
    pub dbg_cos: bool,

    /// Write the scaled feature vectors next to the report
    #[arg(long = "dbg-vectors")]
    pub dbg_vectors: bool,

    /// Also print the report to the terminal
    #[arg(long)]
    pub stdout: bool,

    /// Delete protein and search files once the report is written
    #[arg(long)]
    pub remove_intermediates: bool,

    /// Annotation database to search against
    #[arg(long, value_name = "FILE")]
    pub database_path: Option<PathBuf>,

    /// Genomes per similarity search invocation
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl PredictArgs {
    pub fn mode(&self) -> RunMode {
        if self.general {
            RunMode::General
        } else if self.specific {
            RunMode::Specific
        } else if self.allmodels {
            RunMode::Both
        } else {
            RunMode::Auto
        }
    }

    pub fn extension(&self) -> String {
        match &self.extension {
            Some(ext) => ext.clone(),
            None if self.genes => ".faa".to_string(),
            None => ".fna".to_string(),
        }
    }

    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) if path.exists() => load_config(path)?,
            Some(path) => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Config::default()
            }
            None => Config::default(),
        };
        if let Some(chunk_size) = self.chunk_size {
            config.search.chunk_size = chunk_size;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn run(args: PredictArgs, threads: usize) -> anyhow::Result<()> {
    formatter::init();
    let threads = resolve_threads(threads);
    let config = args.load_config()?;

    // Tools, database and models are all checked before any bin is read
    let database = resolve_database(args.database_path.as_deref(), &config)?;
    tracing::info!("Using annotation database {}", database.display());
    let searcher = DiamondRunner::new(DiamondOptions::from_config(
        &config.search,
        database,
        threads,
        args.lowmem,
    ))?;
    let (reference, ensemble) = Predictor::load_resources(&config)?;

    let options = PredictorOptions {
        mode: args.mode(),
        threads,
        genes_supplied: args.genes,
        debug_cosine: args.dbg_cos,
        dump_vectors: args.dbg_vectors,
        remove_intermediates: args.remove_intermediates,
        show_progress: progress_visible(),
    };

    let mut predictor = Predictor::new(config.clone(), options, reference, ensemble, Box::new(searcher));
    if !args.genes {
        let caller = ProdigalRunner::new(ProdigalOptions::from(&config.gene_calling))?;
        predictor = predictor.with_gene_caller(Box::new(caller));
    }

    let bins = discover_bins(&args.input, &args.extension())?;
    tracing::info!("Found {} bins", bins.len());
    let total = bins.len();

    let layout = OutputLayout::prepare(&args.output_directory, args.force)?;
    let summary = predictor.run(bins, &layout)?;

    print_stats_table(
        "binqc predict",
        &[
            ("Bins found", formatter::format_number(total)),
            ("Bins reported", formatter::format_number(summary.records.len())),
            ("Bins excluded", formatter::format_number(summary.skipped.len())),
            ("Threads", threads.to_string()),
        ],
    );
    for skipped in &summary.skipped {
        print_warning(&skipped.to_string());
    }
    if args.stdout {
        println!("\n{}", summary.render_table());
    }
    print_success(&format!("Report written to {}", summary.report_path.display()));
    if !args.remove_intermediates {
        print_tip("use --remove-intermediates to delete protein and search files after the run");
    }
    Ok(())
}
