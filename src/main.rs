use binqc::cli::{Cli, Commands};
use binqc::BinqcError;
use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // BINQC_LOG wins over -v / -q
    let log_level = std::env::var("BINQC_LOG").unwrap_or_else(|_| cli.log_level().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(exit_code(&e));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|e| e.downcast_ref::<BinqcError>()) {
        Some(BinqcError::Config(_)) => 2,
        Some(BinqcError::Io(_)) => 3,
        Some(BinqcError::Parse(_)) | Some(BinqcError::Schema(_)) => 4,
        Some(BinqcError::Setup(_)) => 5,
        Some(BinqcError::Search(_)) | Some(BinqcError::Tool(_)) => 6,
        _ => 1,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    binqc::utils::parallel::configure_thread_pool(cli.threads)?;
    tracing::debug!(
        "Using {} threads",
        binqc::utils::parallel::resolve_threads(cli.threads)
    );

    match cli.command {
        Commands::Predict(args) => binqc::cli::commands::predict::run(args, cli.threads),
        Commands::Database(args) => binqc::cli::commands::database::run(args),
    }
}
