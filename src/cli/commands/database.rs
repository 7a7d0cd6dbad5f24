use crate::cli::formatter::{self, info_box, print_section, print_success, print_warning};
use crate::core::config::{load_config, Config};
use crate::core::database::{load_definition, resolve_database, set_location};
use crate::core::paths;
use crate::tools::Tool;
use clap::{ArgGroup, Args};
use std::path::PathBuf;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("action").required(true).args(["setdblocation", "show"])))]
pub struct DatabaseArgs {
    /// Remember this annotation database as the default
    #[arg(long, value_name = "FILE")]
    pub setdblocation: Option<PathBuf>,

    /// Show where the database, reference data and tools are found
    #[arg(long)]
    pub show: bool,

    /// Configuration file consulted by --show
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: DatabaseArgs) -> anyhow::Result<()> {
    formatter::init();
    let definition_path = paths::db_location_definition();

    if let Some(database) = &args.setdblocation {
        let stored = set_location(&definition_path, database)?;
        print_success(&format!("Database location set to {}", stored.display()));
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    print_section("Annotation database");
    let definition = load_definition(&definition_path)?;
    let stored = definition
        .location()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| definition.db_path.clone());
    let stored_line = format!("Definition file: {} ({})", definition_path.display(), stored);

    match resolve_database(None, &config) {
        Ok(path) => {
            let exists = if path.is_file() { "" } else { " (missing)" };
            let resolved_line = format!("Used by predict: {}{}", path.display(), exists);
            info_box("Database", &[&stored_line, &resolved_line]);
        }
        Err(e) => {
            info_box("Database", &[&stored_line]);
            print_warning(&e.to_string());
        }
    }

    let data_line = format!("Reference data: {}", config.data_dir().display());
    let models_line = format!("Models: {}", config.models_dir().display());
    info_box("Paths", &[&data_line, &models_line]);
    tracing::debug!("{}", paths::describe_paths());

    let tool_lines: Vec<String> = [Tool::Prodigal, Tool::Diamond]
        .iter()
        .map(|tool| match tool.find_in_path() {
            Some(path) => format!("{}: {}", tool.display_name(), path.display()),
            None => format!("{}: not found on PATH", tool.display_name()),
        })
        .collect();
    let tool_refs: Vec<&str> = tool_lines.iter().map(String::as_str).collect();
    info_box("Tools", &tool_refs);
    Ok(())
}
