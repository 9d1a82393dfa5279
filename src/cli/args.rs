//! CLI argument parsing

use crate::config::FollowImports;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build, persist and reload declaration graphs for Python code
#[derive(Parser, Debug)]
#[command(name = "declgraph")]
#[command(about = "Build, persist and reload declaration graphs for Python code")]
#[command(version)]
pub struct Args {
    /// Config file path
    #[arg(long, global = true, default_value = "declgraph.toml")]
    pub config: PathBuf,

    /// Analyzer cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Read and write the analyzer cache
    #[arg(long, global = true)]
    pub incremental: bool,

    /// Keep None as a distinct union member
    #[arg(long, global = true)]
    pub strict_optional: bool,

    /// Import following policy (normal, silent, skip, error)
    #[arg(long, global = true)]
    pub follow_imports: Option<FollowImports>,

    /// Leave docstrings off declarations
    #[arg(long, global = true)]
    pub no_docstrings: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the declaration graph and summarize it
    Build {
        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Build the declaration graph and write it as a snapshot
    Snapshot {
        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Snapshot file (defaults to the configured output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a snapshot, resolving against previously loaded ones
    Load {
        /// Snapshot to load
        snapshot: PathBuf,

        /// Snapshots loaded first, in order (can be repeated)
        #[arg(long)]
        previous: Vec<PathBuf>,
    },

    /// Print the docstrings of one file as JSON
    Docstrings {
        /// Python source file
        file: PathBuf,

        /// Fully-qualified module name of the file
        #[arg(short, long)]
        module: String,
    },

    /// Print the serialized module built from one file
    Lookup {
        /// Python source file
        file: PathBuf,
    },

    /// Show version information
    Version,
}
