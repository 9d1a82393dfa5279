// Declaration graph building: discover sources, run the analyzer, fix up references

pub mod analyzer;
pub mod cache;
pub mod imports;
pub mod lower;

pub use analyzer::{TreeSitterAnalyzer, ANALYZER_VERSION};
pub use cache::{AnalysisCache, Manifest};
pub use imports::{ImportResolver, ImportType, ResolvedModule};

use crate::config::{BuildOptions, FollowImports};
use crate::error::{Error, ModuleFailure, Result};
use crate::graph::{Module, ModuleSet};
use crate::snapshot::{fixup, UnresolvedReference};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// One source file handed to an analyzer
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSource {
    pub path: PathBuf,
    /// Fully-qualified module name
    pub module: String,
    /// Directory the top-level package lives in
    pub base_dir: PathBuf,
}

impl BuildSource {
    /// Describe a file, deriving its module name from the package layout
    pub fn from_path(path: &Path) -> Self {
        let path = crate::graph::set::absolute(path);
        let (module, base_dir) = module_name_for(&path);
        Self {
            path,
            module,
            base_dir,
        }
    }
}

/// Module name of a file and the directory its top-level package sits in.
///
/// Walks up through every directory holding an `__init__.py`.
pub fn module_name_for(path: &Path) -> (String, PathBuf) {
    let mut parts: Vec<String> = Vec::new();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem != "__init__" {
        parts.push(stem);
    }

    let mut dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    while dir.join("__init__.py").is_file() {
        let Some(name) = dir.file_name() else {
            break;
        };
        parts.push(name.to_string_lossy().into_owned());
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }

    parts.reverse();
    (parts.join("."), dir)
}

/// What an analyzer produced for one batch of sources
#[derive(Debug, Default)]
pub struct Analysis {
    /// Skeleton modules, references still pending
    pub modules: ModuleSet,
    pub failures: Vec<ModuleFailure>,
    /// Modules served from the cache
    pub cached: usize,
}

/// The external analysis engine behind [`GraphBuilder`]
pub trait Analyzer: Send + Sync {
    /// Version stamp written into cache entries
    fn version(&self) -> &str;

    /// Analyze every source, reporting per-module failures next to the
    /// modules that succeeded.
    ///
    /// A corrupt cache manifest is returned as [`Error::CacheCorruption`].
    fn analyze(&self, sources: &[BuildSource], options: &BuildOptions) -> Result<Analysis>;

    /// Drop everything cached under `cache_dir`
    fn invalidate_cache(&self, cache_dir: &Path) -> Result<()>;
}

/// Result of one build call
#[derive(Debug)]
pub struct BuildResult {
    /// Every analyzed module, references resolved against each other
    pub modules: ModuleSet,
    pub failures: Vec<ModuleFailure>,
    pub unresolved: Vec<UnresolvedReference>,
    /// Modules served from the analyzer cache
    pub cached: usize,
}

impl BuildResult {
    /// The module analyzed from `path`, if any
    pub fn module_for_path(&self, path: &Path) -> Option<&Module> {
        self.modules.module_for_path(path)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unresolved.is_empty()
    }
}

/// Builds fully resolved declaration graphs for a set of source paths
pub struct GraphBuilder {
    options: BuildOptions,
    analyzer: Box<dyn Analyzer>,
    show_progress: bool,
}

impl GraphBuilder {
    /// Builder using the bundled tree-sitter analyzer
    pub fn new(options: BuildOptions) -> Self {
        Self::with_analyzer(options, Box::new(TreeSitterAnalyzer::new()))
    }

    pub fn with_analyzer(options: BuildOptions, analyzer: Box<dyn Analyzer>) -> Self {
        Self {
            options,
            analyzer,
            show_progress: false,
        }
    }

    /// Show a spinner while analyzing
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Analyze `paths` (files or directories) and resolve every reference
    /// against the modules analyzed in this call.
    pub fn build(&self, paths: &[PathBuf]) -> Result<BuildResult> {
        if paths.is_empty() {
            return Err(Error::EmptyInput);
        }
        self.options.validate()?;

        let mut failures = Vec::new();
        let sources = self.collect_sources(paths, &mut failures)?;
        tracing::debug!("Collected {} source files", sources.len());

        let analysis = if sources.is_empty() {
            Analysis::default()
        } else {
            self.run_analyzer(&sources)?
        };
        failures.extend(analysis.failures);

        if self.options.follow_imports != FollowImports::Silent {
            if let Some(pos) = failures.iter().position(ModuleFailure::is_analysis) {
                return Err(failures.swap_remove(pos).error);
            }
        }

        let mut modules = analysis.modules;
        let report = fixup(&mut modules, &ModuleSet::new());

        tracing::info!(
            "Built {} modules ({} from cache), {} failures, {} references resolved, {} unresolved",
            modules.len(),
            analysis.cached,
            failures.len(),
            report.resolved,
            report.unresolved.len()
        );

        Ok(BuildResult {
            modules,
            failures,
            unresolved: report.unresolved,
            cached: analysis.cached,
        })
    }

    /// Build a single file and return its module.
    ///
    /// `None` means the file was not part of any analyzed module.
    pub fn nodes_for_file(&self, path: &Path) -> Result<Option<Module>> {
        let result = self.build(&[path.to_path_buf()])?;
        Ok(result.module_for_path(path).cloned())
    }

    fn run_analyzer(&self, sources: &[BuildSource]) -> Result<Analysis> {
        let progress = self.progress(sources.len());

        let result = match self.analyzer.analyze(sources, &self.options) {
            Err(Error::CacheCorruption(reason)) => {
                tracing::warn!("{}; rebuilding without the cache", reason);
                self.analyzer.invalidate_cache(&self.options.cache_dir)?;
                self.analyzer.analyze(sources, &self.options)
            }
            other => other,
        };

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        result
    }

    fn progress(&self, count: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(format!("Analyzing {} files", count));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Expand input paths into build sources, one per module name
    fn collect_sources(
        &self,
        paths: &[PathBuf],
        failures: &mut Vec<ModuleFailure>,
    ) -> Result<Vec<BuildSource>> {
        let excludes = self
            .options
            .exclude
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                for entry in WalkDir::new(path).sort_by_file_name() {
                    let entry = entry?;
                    let file = entry.path();
                    if !entry.file_type().is_file() || !is_python_file(file) {
                        continue;
                    }
                    let relative = file.strip_prefix(path).unwrap_or(file);
                    if is_excluded(relative, &excludes) {
                        tracing::debug!("Excluding {}", file.display());
                        continue;
                    }
                    files.push(file.to_path_buf());
                }
            } else if path.is_file() {
                files.push(path.clone());
            } else {
                tracing::warn!("Source not found: {}", path.display());
                failures.push(ModuleFailure::not_found(path.clone()));
            }
        }

        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for file in files {
            let source = BuildSource::from_path(&file);
            if seen.insert(source.module.clone()) {
                sources.push(source);
            } else {
                tracing::warn!(
                    "Skipping {}: module {} already provided",
                    file.display(),
                    source.module
                );
            }
        }
        Ok(sources)
    }
}

fn is_python_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("py") | Some("pyi")
    )
}

/// Whether any trailing part of `relative` matches an exclude pattern
fn is_excluded(relative: &Path, patterns: &[glob::Pattern]) -> bool {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (0..parts.len()).any(|i| {
        let tail = parts[i..].join("/");
        patterns.iter().any(|p| p.matches(&tail))
    })
}
