//! Single-file and batch compilation.
//!
//! One file runs through load → resolve → map → render. If resolution
//! fails, the module is built directly from the raw document instead, so a
//! single unusual schema does not block the rest of a corpus.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CompileError, GenerateError};
use crate::generator::{render, render_mod_index};
use crate::loader::{absolute_path, collect_schema_files, is_generatable, load_schema_from};
use crate::loader::{FsSource, SchemaSource};
use crate::module_spec::ModuleSpec;
use crate::namespace::Namespace;
use crate::resolver::Resolver;
use crate::types::{CompileOptions, SchemaDocument};

/// Name of the index module written next to batch output.
pub const MOD_INDEX: &str = "mod.rs";

/// Output of compiling one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModule {
    pub spec: ModuleSpec,
    /// Rendered Rust source.
    pub source: String,
    /// True if the module was built by the direct pass after resolution failed.
    pub fallback: bool,
}

/// How one file fared in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Generated,
    Fallback,
    Skipped,
    Failed,
}

/// Result for a single file of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Path relative to the batch root.
    pub file: PathBuf,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated result of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    /// Includes fallback modules.
    pub generated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Returns true if no file failed.
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Drives the pipeline for one file or a whole directory tree.
#[derive(Debug, Clone)]
pub struct Compiler<S = FsSource> {
    resolver: Resolver<S>,
}

impl Compiler<FsSource> {
    /// Compiler reading schemas from disk.
    pub fn new(options: CompileOptions) -> Self {
        Self::with_source(FsSource, options)
    }
}

impl<S: SchemaSource + Clone> Compiler<S> {
    /// Compiler reading schemas through `source`.
    pub fn with_source(source: S, options: CompileOptions) -> Self {
        Self {
            resolver: Resolver::with_source(source, options),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        self.resolver.options()
    }

    /// Load and compile the schema at `path`.
    ///
    /// `module_name` overrides the name derived from the file's location.
    ///
    /// # Errors
    ///
    /// Any load error, `GenerateError::NotGeneratable` for pure definition
    /// containers, or `GenerateError::Unsupported` if neither full nor
    /// fallback generation can represent the schema.
    pub fn compile_file(
        &self,
        path: &Path,
        module_name: Option<&str>,
    ) -> Result<CompiledModule, CompileError> {
        let document = load_schema_from(self.resolver.source(), path)?;
        self.compile_document(&document, module_name)
    }

    /// Compile an already loaded document.
    pub fn compile_document(
        &self,
        document: &SchemaDocument,
        module_name: Option<&str>,
    ) -> Result<CompiledModule, CompileError> {
        if !is_generatable(document) {
            return Err(GenerateError::NotGeneratable {
                path: document.path().to_path_buf(),
            }
            .into());
        }

        let module_name = match module_name {
            Some(name) => name.to_string(),
            None => Namespace::detect(self.options(), document.path()).module_for(document.path()),
        };

        let (spec, fallback) = match self.resolver.resolve(document) {
            Ok(resolved) => (
                ModuleSpec::from_resolved(&resolved, &module_name, &document.basename()),
                false,
            ),
            Err(resolve_err) => {
                warn!(
                    file = %document.path().display(),
                    error = %resolve_err,
                    "resolution failed, using direct generation"
                );
                let spec = ModuleSpec::from_document(document, &module_name).map_err(|e| {
                    match e {
                        GenerateError::Unsupported { message } => GenerateError::Unsupported {
                            message: format!("{} (after resolution failed: {})", message, resolve_err),
                        },
                        other => other,
                    }
                })?;
                (spec, true)
            }
        };

        info!(file = %document.path().display(), module = %spec.module_name, fallback, "compiled schema");
        let source = render(&spec);
        Ok(CompiledModule {
            spec,
            source,
            fallback,
        })
    }

    /// Compile every schema under `root` into `output_dir`.
    ///
    /// Files are processed in sorted order, one at a time. Per-file failures
    /// are recorded in the report and never abort the run. Unless `dry_run`
    /// is set, `output_dir` is cleared and then repopulated, followed by a
    /// `mod.rs` index.
    ///
    /// # Errors
    ///
    /// `GenerateError::UnsafeOutputDir` if clearing `output_dir` would
    /// delete the schemas themselves, and `GenerateError::Write` on I/O
    /// failure while writing.
    pub fn batch(
        &self,
        root: &Path,
        output_dir: &Path,
        dry_run: bool,
    ) -> Result<BatchReport, GenerateError> {
        let root = absolute_path(root);
        let output_dir = absolute_path(output_dir);
        if root.starts_with(&output_dir) {
            return Err(GenerateError::UnsafeOutputDir { path: output_dir });
        }

        // Names are relative to the batch root unless a root was pinned
        let mut options = self.options().clone();
        if options.schema_root.is_none() {
            options.schema_root = Some(root.clone());
        }
        let namespace = Namespace::new(options.module_prefix.clone(), options.schema_root.clone());
        let compiler = Compiler::with_source(self.resolver.source().clone(), options);

        let mut report = BatchReport {
            root: root.clone(),
            output_dir: output_dir.clone(),
            dry_run,
            generated: 0,
            failed: 0,
            skipped: 0,
            outcomes: Vec::new(),
        };
        let mut taken: HashSet<String> = HashSet::from([MOD_INDEX.to_string()]);
        let mut modules: Vec<(String, String)> = Vec::new();

        for file in collect_schema_files(&root) {
            let relative = file.strip_prefix(&root).unwrap_or(&file).to_path_buf();
            let outcome = compiler.batch_one(&file, &namespace, &mut taken, &mut modules);
            let outcome = FileOutcome {
                file: relative,
                ..outcome
            };
            match outcome.status {
                OutcomeStatus::Generated | OutcomeStatus::Fallback => report.generated += 1,
                OutcomeStatus::Skipped => report.skipped += 1,
                OutcomeStatus::Failed => report.failed += 1,
            }
            report.outcomes.push(outcome);
        }

        if !dry_run {
            write_outputs(&output_dir, &modules)?;
        }

        info!(
            root = %root.display(),
            generated = report.generated,
            failed = report.failed,
            skipped = report.skipped,
            "batch complete"
        );
        Ok(report)
    }

    fn batch_one(
        &self,
        file: &Path,
        namespace: &Namespace,
        taken: &mut HashSet<String>,
        modules: &mut Vec<(String, String)>,
    ) -> FileOutcome {
        let mut outcome = FileOutcome {
            file: file.to_path_buf(),
            status: OutcomeStatus::Failed,
            module: None,
            output: None,
            error: None,
        };

        let document = match load_schema_from(self.resolver.source(), file) {
            Ok(document) => document,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "failed to load schema");
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        if !is_generatable(&document) {
            outcome.status = OutcomeStatus::Skipped;
            return outcome;
        }

        let file_name = namespace.file_name_for(file);
        if taken.contains(&file_name) {
            warn!(file = %file.display(), output = %file_name, "output name already taken");
            outcome.error = Some(format!("output file name {} is already taken", file_name));
            return outcome;
        }

        match self.compile_document(&document, None) {
            Ok(compiled) => {
                outcome.status = if compiled.fallback {
                    OutcomeStatus::Fallback
                } else {
                    OutcomeStatus::Generated
                };
                outcome.module = Some(compiled.spec.module_name);
                outcome.output = Some(PathBuf::from(&file_name));
                taken.insert(file_name.clone());
                modules.push((file_name, compiled.source));
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "failed to compile schema");
                outcome.error = Some(e.to_string());
            }
        }
        outcome
    }
}

/// Clear `dir`, then write each module and the `mod.rs` index.
fn write_outputs(dir: &Path, modules: &[(String, String)]) -> Result<(), GenerateError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(write_err(dir))?;
    }
    std::fs::create_dir_all(dir).map_err(write_err(dir))?;

    for (name, source) in modules {
        let path = dir.join(name);
        std::fs::write(&path, source).map_err(write_err(&path))?;
    }

    let stems: Vec<String> = modules
        .iter()
        .map(|(name, _)| name.trim_end_matches(".rs").to_string())
        .collect();
    let index = dir.join(MOD_INDEX);
    std::fs::write(&index, render_mod_index(&stems)).map_err(write_err(&index))?;
    Ok(())
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError {
    let path = path.to_path_buf();
    move |source| GenerateError::Write { path, source }
}
