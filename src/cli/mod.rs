//! CLI module for declgraph

mod args;

pub use args::{Args, Command};

use crate::analysis::{BuildResult, GraphBuilder};
use crate::config::Config;
use crate::error::{ModuleFailure, Result};
use crate::graph::ModuleSet;
use crate::parser::extract_docstrings;
use crate::snapshot::{self, LoadResult, UnresolvedReference};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// How many failures or unresolved references to print before summarizing
const LIST_LIMIT: usize = 10;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_tracing(args.verbose);

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut cfg = Config::load_or_default(&args.config);
    cfg.merge_cli(
        args.cache_dir.clone(),
        args.incremental,
        args.strict_optional,
        args.follow_imports,
        args.no_docstrings,
    );
    cfg.validate()?;
    Ok(cfg)
}

fn execute(args: Args) -> Result<()> {
    let cfg = load_config(&args)?;
    let builder = GraphBuilder::new(cfg.build.clone()).with_progress(args.verbose);

    match args.command {
        Command::Build { paths } => {
            let result = builder.build(&paths)?;
            print_build_summary(&result);
            Ok(())
        }

        Command::Snapshot { paths, output } => {
            let output = output.unwrap_or_else(|| cfg.snapshot.output.clone());
            let result = if cfg.snapshot.pretty {
                snapshot::build_and_write(&builder, &paths, &output)?
            } else {
                let result = builder.build(&paths)?;
                snapshot::serialize_modules(&result.modules)?.write(&output, false)?;
                result
            };
            print_build_summary(&result);
            println!("Snapshot written to: {}", output.display());
            Ok(())
        }

        Command::Load { snapshot, previous } => {
            let loaded = load_previous(&previous)?;
            let result = snapshot::load_snapshot(&snapshot, &loaded)?;
            print_load_summary(&snapshot, &result);
            Ok(())
        }

        Command::Docstrings { file, module } => {
            let index = extract_docstrings(&file, &module)?;
            println!("{}", serde_json::to_string_pretty(&index)?);
            Ok(())
        }

        Command::Lookup { file } => {
            match builder.nodes_for_file(&file)? {
                Some(module) => println!("{}", snapshot::module_to_string(&module)?),
                None => println!("not found: {}", file.display()),
            }
            Ok(())
        }

        Command::Version => {
            println!("declgraph {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load snapshots in order, each against everything loaded before it
fn load_previous(paths: &[PathBuf]) -> Result<ModuleSet> {
    let mut loaded = ModuleSet::new();
    for path in paths {
        let result = snapshot::load_snapshot(path, &loaded)?;
        if !result.is_clean() {
            print_load_summary(path, &result);
        }
        loaded.merge(result.modules);
    }
    Ok(loaded)
}

fn print_build_summary(result: &BuildResult) {
    println!(
        "Built {} modules ({} from cache)",
        result.modules.len(),
        result.cached
    );
    print_failures(&result.failures);
    print_unresolved(&result.unresolved);
}

fn print_load_summary(path: &Path, result: &LoadResult) {
    println!(
        "Loaded {} modules from {}",
        result.modules.len(),
        path.display()
    );
    print_failures(&result.failures);
    print_unresolved(&result.unresolved);
}

fn print_failures(failures: &[ModuleFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("\nFailures ({}):", failures.len());
    for failure in failures.iter().take(LIST_LIMIT) {
        println!("  {}", failure);
    }
    if failures.len() > LIST_LIMIT {
        println!("  ... and {} more", failures.len() - LIST_LIMIT);
    }
}

fn print_unresolved(unresolved: &[UnresolvedReference]) {
    if unresolved.is_empty() {
        return;
    }
    println!("\nUnresolved references ({}):", unresolved.len());
    for reference in unresolved.iter().take(LIST_LIMIT) {
        println!("  {}", reference);
    }
    if unresolved.len() > LIST_LIMIT {
        println!("  ... and {} more", unresolved.len() - LIST_LIMIT);
    }
}
