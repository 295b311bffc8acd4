//! File-level compilation: options, the multi-target driver, statistics and
//! output writing.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::ast::{Expression, DEFAULT_THEME};
use crate::cache::CompilationCache;
use crate::codegen::{transpile_with, CodegenOptions, Target};
use crate::document::generate_documentation;
use crate::error::LamiaError;
use crate::lexer::tokenize;
use crate::parse::{parse_with, ParserOptions};
use crate::token::Token;
use crate::validate::Diagnostic;
use crate::visitor::count_nodes;

pub const CONFIG_FILE_NAME: &str = "lamia.json";
pub const DOCS_EXTENSION: &str = "purple.html";

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub targets: Vec<Target>,
    pub default_theme: String,
    /// Document title; the source file stem when unset.
    pub title: Option<String>,
    pub generate_docs: bool,
    pub cache: bool,
    /// Persist cache entries here; memory only when unset.
    pub cache_dir: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            targets: vec![
                Target::Es6,
                Target::TypeScript,
                Target::Html5,
                Target::Css3,
                Target::Native,
            ],
            default_theme: DEFAULT_THEME.to_string(),
            title: None,
            generate_docs: false,
            cache: true,
            cache_dir: None,
        }
    }
}

impl CompileOptions {
    pub fn load(path: &Path) -> Result<Self, LamiaError> {
        let data = fs::read_to_string(path).map_err(|e| LamiaError::io(path, e))?;
        serde_json::from_str(&data).map_err(|e| LamiaError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// `lamia.json` in the input directory, or next to the input file.
    pub fn discover(input: &Path) -> Option<PathBuf> {
        let dir = if input.is_dir() {
            input
        } else {
            input.parent()?
        };
        let candidate = dir.join(CONFIG_FILE_NAME);
        candidate.is_file().then_some(candidate)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationStats {
    pub tokens: usize,
    pub ast_nodes: usize,
    pub output_lines: usize,
    pub errors: usize,
    pub warnings: usize,
    pub elapsed_ms: f64,
}

/// Front-end result for one source.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub root: Option<Expression>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutput {
    pub target: Target,
    pub text: String,
    pub from_cache: bool,
}

#[derive(Debug)]
pub struct FileReport {
    pub input: PathBuf,
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, LamiaError)>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: CompilationStats,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Compiler {
    options: CompileOptions,
    cache: Option<CompilationCache>,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let cache = options.cache.then(|| match &options.cache_dir {
            Some(dir) => CompilationCache::persistent(dir),
            None => CompilationCache::in_memory(),
        });
        Self { options, cache }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Lex and parse once.
    pub fn analyze(&self, source: &str) -> Compilation {
        let tokens = tokenize(source);
        let parser_options = ParserOptions {
            default_theme: self.options.default_theme.clone(),
        };
        let result = parse_with(&tokens, &parser_options);
        Compilation {
            tokens,
            root: result.root,
            diagnostics: result.diagnostics,
        }
    }

    /// Render every configured target in parallel.
    pub fn render(
        &self,
        source: &str,
        compilation: &Compilation,
        codegen: &CodegenOptions,
    ) -> Vec<TargetOutput> {
        let root = compilation.root.as_ref();
        let key = root.map(|_| {
            let fingerprint = format!("{}\u{1f}{}", self.options.default_theme, codegen.fingerprint());
            CompilationCache::key_for(source, &fingerprint)
        });

        self.options
            .targets
            .par_iter()
            .map(|&target| {
                let cached = match (&self.cache, &key) {
                    (Some(cache), Some(key)) => cache.get(key, target),
                    _ => None,
                };
                if let Some(text) = cached {
                    return TargetOutput {
                        target,
                        text,
                        from_cache: true,
                    };
                }
                let text = transpile_with(root, target, codegen);
                if let (Some(cache), Some(key)) = (&self.cache, &key) {
                    cache.set(key, target, &text);
                }
                TargetOutput {
                    target,
                    text,
                    from_cache: false,
                }
            })
            .collect()
    }

    pub fn compile_targets(
        &self,
        source: &str,
        codegen: &CodegenOptions,
    ) -> (Compilation, Vec<TargetOutput>) {
        let compilation = self.analyze(source);
        let outputs = self.render(source, &compilation, codegen);
        (compilation, outputs)
    }

    /// Compile one file into `output_dir` as `<stem>.<ext>`.
    ///
    /// Diagnostics are handed to `on_diagnostic` before any code is generated.
    /// A compilation without a root writes nothing and returns
    /// [`LamiaError::NoRoot`]; individual write failures are collected in the
    /// report instead.
    pub fn compile_file(
        &self,
        input: &Path,
        output_dir: &Path,
        on_diagnostic: &(dyn Fn(&Path, &Diagnostic) + Sync),
    ) -> Result<FileReport, LamiaError> {
        let started = Instant::now();
        let source = fs::read_to_string(input).map_err(|e| LamiaError::io(input, e))?;
        let compilation = self.analyze(&source);
        for diagnostic in &compilation.diagnostics {
            on_diagnostic(input, diagnostic);
        }

        let Some(root) = compilation.root.as_ref() else {
            return Err(LamiaError::NoRoot {
                path: input.to_path_buf(),
            });
        };

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string());
        let codegen = CodegenOptions {
            title: self.options.title.clone().unwrap_or_else(|| stem.clone()),
            stylesheet_href: format!("{}.{}", stem, Target::Css3.extension()),
            script_src: format!("{}.{}", stem, Target::Es6.extension()),
        };

        fs::create_dir_all(output_dir).map_err(|e| LamiaError::io(output_dir, e))?;
        let outputs = self.render(&source, &compilation, &codegen);

        let mut written = Vec::new();
        let mut failed = Vec::new();
        for output in &outputs {
            let path = output_dir.join(format!("{}.{}", stem, output.target.extension()));
            match fs::write(&path, &output.text) {
                Ok(()) => written.push(path),
                Err(e) => {
                    log::error!("Failed to write {}: {}", path.display(), e);
                    failed.push((path.clone(), LamiaError::io(&path, e)));
                }
            }
        }

        let counter = count_nodes(root);
        log::debug!(
            "{}: {} widgets, {} manifests, {} blueprints",
            input.display(),
            counter.widgets,
            counter.manifests,
            counter.blueprints
        );
        let mut stats = CompilationStats {
            tokens: compilation.tokens.len(),
            ast_nodes: counter.total,
            output_lines: outputs.iter().map(|o| o.text.lines().count()).sum(),
            errors: compilation.error_count(),
            warnings: compilation.warning_count(),
            elapsed_ms: 0.0,
        };

        if self.options.generate_docs {
            let es6 = match outputs.iter().find(|o| o.target == Target::Es6) {
                Some(output) => output.text.clone(),
                None => transpile_with(Some(root), Target::Es6, &codegen),
            };
            stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| stem.clone());
            let page = generate_documentation(&file_name, &compilation.tokens, Some(root), &stats, &es6);
            let path = output_dir.join(format!("{}.{}", stem, DOCS_EXTENSION));
            match fs::write(&path, page) {
                Ok(()) => written.push(path),
                Err(e) => {
                    log::error!("Failed to write {}: {}", path.display(), e);
                    failed.push((path.clone(), LamiaError::io(&path, e)));
                }
            }
        }

        stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let cached = outputs.iter().filter(|o| o.from_cache).count();
        log::info!(
            "{}: {} tokens, {} nodes, {} output lines, {} errors, {} warnings, {}/{} cached, {:.2} ms",
            input.display(),
            stats.tokens,
            stats.ast_nodes,
            stats.output_lines,
            stats.errors,
            stats.warnings,
            cached,
            outputs.len(),
            stats.elapsed_ms
        );

        Ok(FileReport {
            input: input.to_path_buf(),
            written,
            failed,
            diagnostics: compilation.diagnostics,
            stats,
        })
    }
}
