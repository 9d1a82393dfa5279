// Bundled analyzer: tree-sitter parsing, lexical name binding, disk cache

use crate::analysis::cache::{content_hash, inputs_hash, AnalysisCache, Manifest};
use crate::analysis::imports::ImportResolver;
use crate::analysis::lower::lower_module;
use crate::analysis::{Analysis, Analyzer, BuildSource};
use crate::config::{BuildOptions, FollowImports};
use crate::error::{Error, ModuleFailure, Result};
use crate::graph::{Module, ModuleSet};
use crate::parser::{read_source, PythonParser};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Version stamped on cache entries
pub const ANALYZER_VERSION: &str = concat!("declgraph-", env!("CARGO_PKG_VERSION"));

/// Syntactic analyzer backed by tree-sitter-python
#[derive(Debug, Clone, Default)]
pub struct TreeSitterAnalyzer;

struct Analyzed {
    module: Module,
    hash: String,
    fresh: bool,
}

struct FileOutcome {
    source: BuildSource,
    /// Reached through an import rather than given as input
    followed: bool,
    result: Result<Analyzed>,
}

/// Cache key of one source file under the given options
fn entry_hash(source: &BuildSource, text: &str, options: &BuildOptions) -> String {
    let stamp = format!(
        "{}|so={}|pa={}|ds={}\n",
        source.path.display(),
        options.strict_optional,
        options.preserve_asts,
        options.include_docstrings
    );
    content_hash(&(stamp + text))
}

impl TreeSitterAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn analyze_file(
        parser: &mut PythonParser,
        source: &BuildSource,
        options: &BuildOptions,
        cache: Option<&AnalysisCache>,
    ) -> Result<Analyzed> {
        let text = read_source(&source.path)?;
        let hash = entry_hash(source, &text, options);

        if let Some(module) = cache.and_then(|c| c.get(&source.module, &hash)) {
            tracing::debug!("Cache hit for {}", source.module);
            return Ok(Analyzed {
                module,
                hash,
                fresh: false,
            });
        }

        let parsed = parser.parse_source(&text, source.path.clone(), source.module.clone())?;
        if let Some(line) = parsed.syntax_error {
            return Err(Error::analysis(
                &source.path,
                format!("syntax error at line {}", line),
            ));
        }

        Ok(Analyzed {
            module: lower_module(&parsed, options),
            hash,
            fresh: true,
        })
    }

    /// Combined hash of the input files as they are on disk now
    fn hash_inputs(sources: &[BuildSource], options: &BuildOptions) -> String {
        let hashes: Vec<(String, String)> = sources
            .iter()
            .filter_map(|s| {
                read_source(&s.path)
                    .ok()
                    .map(|text| (s.module.clone(), entry_hash(s, &text, options)))
            })
            .collect();
        inputs_hash(hashes.iter().map(|(m, h)| (m.as_str(), h.as_str())))
    }

    /// Keys this module imports that may name other modules
    fn import_keys(module: &Module) -> BTreeSet<&str> {
        module.imports.iter().map(|s| s.target.key()).collect()
    }
}

impl Analyzer for TreeSitterAnalyzer {
    fn version(&self) -> &str {
        ANALYZER_VERSION
    }

    fn analyze(&self, sources: &[BuildSource], options: &BuildOptions) -> Result<Analysis> {
        let cache = if options.incremental {
            Some(AnalysisCache::open(
                &options.cache_dir,
                self.version(),
                options.skip_version_check,
            )?)
        } else {
            None
        };

        // A corrupt manifest surfaces here as CacheCorruption
        let manifest = match &cache {
            Some(cache) => cache.load_manifest()?,
            None => None,
        };
        let current_inputs = Self::hash_inputs(sources, options);
        let usable_cache = match &cache {
            Some(_) if options.fine_grained_incremental => cache.as_ref(),
            Some(_) if manifest.as_ref().map(|m| &m.inputs_hash) == Some(&current_inputs) => {
                cache.as_ref()
            }
            Some(_) => {
                tracing::debug!("Input set changed; rebuilding every module");
                None
            }
            None => None,
        };

        let resolver = ImportResolver::new(sources.iter().map(|s| s.base_dir.clone()).collect());
        let mut seen: HashSet<String> = sources.iter().map(|s| s.module.clone()).collect();
        let mut queue: Vec<(BuildSource, bool)> = sources.iter().cloned().map(|s| (s, false)).collect();
        let mut outcomes: Vec<FileOutcome> = Vec::new();
        let mut failures: Vec<ModuleFailure> = Vec::new();
        let inspect_imports = options.follow_imports.follows()
            || options.follow_imports == FollowImports::Error;

        while !queue.is_empty() {
            let batch = std::mem::take(&mut queue);
            tracing::debug!("Analyzing {} files", batch.len());

            let results: Vec<FileOutcome> = batch
                .into_par_iter()
                .map_init(PythonParser::new, |parser, (source, followed)| {
                    let result = match parser {
                        Ok(parser) => Self::analyze_file(parser, &source, options, usable_cache),
                        Err(e) => Err(Error::parser(e.to_string())),
                    };
                    FileOutcome {
                        source,
                        followed,
                        result,
                    }
                })
                .collect();

            for outcome in results {
                if let (Ok(analyzed), true) = (&outcome.result, inspect_imports) {
                    let mut found_modules = BTreeSet::new();
                    for key in Self::import_keys(&analyzed.module) {
                        if let Some(found) = resolver.resolve_key(key) {
                            if !seen.contains(&found.module) {
                                found_modules.insert((found.module, found.path, found.root));
                            }
                        }
                    }

                    for (module, path, root) in found_modules {
                        let (Some(path), Some(root)) = (path, root) else {
                            continue;
                        };
                        if !options.follow_imports.follows() {
                            failures.push(ModuleFailure::new(
                                Some(outcome.source.module.clone()),
                                Some(outcome.source.path.clone()),
                                Error::analysis(
                                    &outcome.source.path,
                                    format!("imports '{}', which is outside the input set", module),
                                ),
                            ));
                            continue;
                        }
                        tracing::debug!("Following import of {} from {}", module, outcome.source.module);
                        seen.insert(module.clone());
                        queue.push((
                            BuildSource {
                                path,
                                module,
                                base_dir: root,
                            },
                            true,
                        ));
                    }
                }
                outcomes.push(outcome);
            }
        }

        let mut modules = ModuleSet::new();
        let mut manifest = Manifest {
            version: self.version().to_string(),
            inputs_hash: current_inputs,
            ..Manifest::default()
        };
        let mut cached = 0;

        for outcome in outcomes {
            match outcome.result {
                Ok(analyzed) => {
                    if analyzed.fresh {
                        if let Some(cache) = &cache {
                            if let Err(e) = cache.put(&analyzed.module, &analyzed.hash) {
                                tracing::warn!("Could not cache {}: {}", analyzed.module.name, e);
                            }
                        }
                    } else {
                        cached += 1;
                    }
                    manifest
                        .modules
                        .insert(analyzed.module.name.clone(), analyzed.hash);
                    modules.insert(analyzed.module);
                }
                Err(e) if outcome.followed && options.follow_imports == FollowImports::Silent => {
                    tracing::debug!("Ignoring failure in followed module {}: {}", outcome.source.module, e);
                }
                Err(e) => {
                    tracing::warn!("{}: {}", outcome.source.module, e);
                    failures.push(ModuleFailure::new(
                        Some(outcome.source.module),
                        Some(outcome.source.path),
                        e,
                    ));
                }
            }
        }

        if let Some(cache) = &cache {
            cache.write_manifest(&manifest)?;
        }

        Ok(Analysis {
            modules,
            failures,
            cached,
        })
    }

    fn invalidate_cache(&self, cache_dir: &Path) -> Result<()> {
        AnalysisCache::invalidate(cache_dir)
    }
}
