use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildOptions,
    pub snapshot: SnapshotConfig,
}

/// Options passed to the analyzer on every build.
///
/// This value is threaded explicitly through [`crate::analysis::GraphBuilder`]
/// and [`crate::analysis::Analyzer::analyze`]; nothing reads it from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Read and write the analyzer cache
    pub incremental: bool,
    /// Reuse cache entries module by module instead of all-or-nothing
    pub fine_grained_incremental: bool,
    /// Keep source spans and initializer text on declarations
    pub preserve_asts: bool,
    /// Accept cache entries written by a different analyzer version
    pub skip_version_check: bool,
    /// Keep `None` as a distinct member of union types
    pub strict_optional: bool,
    /// How imports of modules outside the input set are handled
    pub follow_imports: FollowImports,
    /// Attach docstrings to declarations
    pub include_docstrings: bool,
    /// Analyzer cache directory
    pub cache_dir: PathBuf,
    /// Glob patterns skipped when an input path is a directory
    pub exclude: Vec<String>,
}

/// Import following policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FollowImports {
    /// Follow local imports and report their failures
    Normal,
    /// Follow local imports; failures never fail the build
    #[default]
    Silent,
    /// Analyze only the given inputs
    Skip,
    /// Report every local import outside the input set as a failure
    Error,
}

impl FollowImports {
    pub fn follows(&self) -> bool {
        matches!(self, FollowImports::Normal | FollowImports::Silent)
    }
}

impl std::str::FromStr for FollowImports {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(FollowImports::Normal),
            "silent" => Ok(FollowImports::Silent),
            "skip" => Ok(FollowImports::Skip),
            "error" => Ok(FollowImports::Error),
            other => Err(Error::config_validation(format!(
                "unknown follow_imports value: {}",
                other
            ))),
        }
    }
}

/// Snapshot output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Pretty-print snapshot JSON
    pub pretty: bool,
    /// Default snapshot output path for the CLI
    pub output: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            incremental: false,
            fine_grained_incremental: false,
            preserve_asts: true,
            skip_version_check: true,
            strict_optional: false,
            follow_imports: FollowImports::default(),
            include_docstrings: true,
            cache_dir: PathBuf::from(".declgraph_cache"),
            exclude: vec![
                "__pycache__/**".to_string(),
                ".git/**".to_string(),
                "venv/**".to_string(),
                ".venv/**".to_string(),
            ],
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            output: PathBuf::from("declgraph-snapshot.json"),
        }
    }
}

impl BuildOptions {
    /// Options for a throwaway build against the given cache directory
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Validate option combinations
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::config_validation("cache_dir must not be empty"));
        }

        if self.fine_grained_incremental && !self.incremental {
            return Err(Error::config_validation(
                "fine_grained_incremental requires incremental",
            ));
        }

        for pattern in &self.exclude {
            glob::Pattern::new(pattern)?;
        }

        Ok(())
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Ignoring config {}: {}", path.display(), e);
                }
                Config::default()
            }
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        cache_dir: Option<PathBuf>,
        incremental: bool,
        strict_optional: bool,
        follow_imports: Option<FollowImports>,
        no_docstrings: bool,
    ) {
        if let Some(dir) = cache_dir {
            self.build.cache_dir = dir;
        }

        if incremental {
            self.build.incremental = true;
        }

        if strict_optional {
            self.build.strict_optional = true;
        }

        if let Some(follow) = follow_imports {
            self.build.follow_imports = follow;
        }

        if no_docstrings {
            self.build.include_docstrings = false;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.build.validate()?;

        if self.snapshot.output.as_os_str().is_empty() {
            return Err(Error::config_validation("snapshot output must not be empty"));
        }

        Ok(())
    }
}
