use std::path::PathBuf;
use thiserror::Error;

/// Declgraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Analysis failed in {path}: {message}")]
    Analysis { path: PathBuf, message: String },

    #[error("Malformed snapshot entry '{module}': {message}")]
    MalformedSnapshot { module: String, message: String },

    #[error("Analyzer cache is corrupt: {0}")]
    CacheCorruption(String),

    #[error("No source paths given")]
    EmptyInput,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for declgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// A failure confined to one module, reported next to the modules that succeeded
#[derive(Debug)]
pub struct ModuleFailure {
    /// Module name, when known
    pub module: Option<String>,
    /// Source or snapshot file, when known
    pub path: Option<PathBuf>,
    pub error: Error,
}

impl ModuleFailure {
    pub fn new(module: Option<String>, path: Option<PathBuf>, error: Error) -> Self {
        Self { module, path, error }
    }

    /// Failure for a source file that does not exist
    pub fn not_found(path: PathBuf) -> Self {
        Self {
            module: None,
            path: Some(path.clone()),
            error: Error::SourceNotFound(path),
        }
    }

    pub fn is_analysis(&self) -> bool {
        matches!(self.error, Error::Analysis { .. })
    }
}

impl std::fmt::Display for ModuleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}: {}", module, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create an analysis error for one source file
    pub fn analysis(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Analysis {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed snapshot error scoped to one module
    pub fn malformed(module: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedSnapshot {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error only affects the file or module it was raised for.
    ///
    /// Scoped errors are collected alongside sibling results instead of
    /// aborting a batch.
    pub fn is_module_scoped(&self) -> bool {
        matches!(
            self,
            Error::SourceNotFound(_) | Error::Analysis { .. } | Error::MalformedSnapshot { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_source_not_found_display() {
        let err = Error::SourceNotFound(PathBuf::from("/some/a.py"));
        assert_eq!(err.to_string(), "Source not found: /some/a.py");
    }

    #[test]
    fn test_analysis_error_display() {
        let err = Error::analysis("/foo/bar.py", "invalid syntax");
        assert!(err.to_string().contains("/foo/bar.py"));
        assert!(err.to_string().contains("invalid syntax"));
    }

    #[test]
    fn test_malformed_display() {
        let err = Error::malformed("pkg.mod", "missing field `defs`");
        assert_eq!(
            err.to_string(),
            "Malformed snapshot entry 'pkg.mod': missing field `defs`"
        );
    }

    #[test]
    fn test_config_validation_display() {
        let err = Error::config_validation("cache_dir must not be empty");
        assert_eq!(err.to_string(), "Config validation error: cache_dir must not be empty");
    }

    #[test]
    fn test_module_scoped() {
        assert!(Error::SourceNotFound(PathBuf::from("x.py")).is_module_scoped());
        assert!(Error::malformed("m", "bad").is_module_scoped());
        assert!(!Error::EmptyInput.is_module_scoped());
        assert!(!Error::CacheCorruption("manifest".into()).is_module_scoped());
    }

    #[test]
    fn test_module_failure_display() {
        let failure = ModuleFailure::new(
            Some("b".to_string()),
            Some(PathBuf::from("/src/b.py")),
            Error::analysis("/src/b.py", "syntax error at line 3"),
        );
        assert!(failure.is_analysis());
        assert_eq!(
            failure.to_string(),
            "b: Analysis failed in /src/b.py: syntax error at line 3"
        );

        let missing = ModuleFailure::not_found(PathBuf::from("/gone.py"));
        assert!(!missing.is_analysis());
        assert_eq!(missing.to_string(), "Source not found: /gone.py");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
