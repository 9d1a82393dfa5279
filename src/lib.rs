//! declgraph - cross-module declaration graphs for Python code
//!
//! Builds fully resolved declaration graphs from Python sources, writes them
//! as JSON snapshots, and loads snapshots back, resolving references against
//! modules loaded earlier.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod snapshot;

// Re-export main types
pub use analysis::{Analyzer, BuildResult, BuildSource, GraphBuilder, TreeSitterAnalyzer};
pub use config::{BuildOptions, Config, FollowImports};
pub use error::{Error, ModuleFailure, Result};
pub use graph::{DeclId, Declaration, Module, ModuleSet, Reference, Resolution, Target};
pub use parser::{extract_docstrings, DocstringIndex};
pub use snapshot::{
    fixup, load_snapshot, write_snapshot, FixupReport, LoadResult, Snapshot, UnresolvedReference,
};
