/*!
# Batch Transpilation

Drives a whole method tree through the [`Transpiler`]:

1. discover source files (sorted, so runs are reproducible)
2. build the command registry and the method index once
3. map chunks of files over a rayon pool, one unit per file
4. reduce usage tallies and pass statistics, then build the reports

A unit that panics or cannot be read becomes an `Internal` error for that
file; every other file still produces its module.
*/

mod stats;

pub use stats::BatchStatistics;

use std::any::Any;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tracing::{info, warn};

use crate::codegen::{GeneratedModule, MethodIndex};
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticReporter, TranspilationReport};
use crate::registry::{has_extension, CommandRegistry, RegistryReport, UsageTally};
use crate::transpiler::{Transpiler, UnitOutcome};
use crate::unit::SourceFile;
use crate::{RelayError, Result, TranspileConfig};

pub const TRANSPILATION_REPORT: &str = "transpilation-report.json";
pub const REGISTRY_REPORT: &str = "command-registry-report.json";
pub const STATISTICS_REPORT: &str = "statistics-report.json";

/// Everything a run produced, ready to be written
#[derive(Debug)]
pub struct BatchOutcome {
    /// Sorted by output path
    pub modules: Vec<GeneratedModule>,
    pub report: TranspilationReport,
    pub registry_report: RegistryReport,
    pub statistics: BatchStatistics,
}

impl BatchOutcome {
    pub fn error_count(&self) -> usize {
        self.report.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.report.warning_count()
    }

    pub fn module(&self, output_path: impl AsRef<Path>) -> Option<&GeneratedModule> {
        let output_path = output_path.as_ref();
        self.modules.iter().find(|m| m.output_path == output_path)
    }

    /// Write modules, optional position maps and the three reports under `out_dir`.
    pub fn write(&self, out_dir: &Path, position_maps: bool) -> Result<()> {
        fs::create_dir_all(out_dir).map_err(|e| RelayError::io(out_dir, e))?;

        for module in &self.modules {
            let path = out_dir.join(&module.output_path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| RelayError::io(parent, e))?;
            }
            fs::write(&path, &module.code).map_err(|e| RelayError::io(&path, e))?;

            if position_maps {
                let mut map_path = path.clone().into_os_string();
                map_path.push(".map.json");
                let map_path = PathBuf::from(map_path);
                fs::write(&map_path, module.position_map.to_json()?).map_err(|e| RelayError::io(&map_path, e))?;
            }
        }

        write_json(&out_dir.join(TRANSPILATION_REPORT), &self.report)?;
        write_json(&out_dir.join(REGISTRY_REPORT), &self.registry_report)?;
        write_json(&out_dir.join(STATISTICS_REPORT), &self.statistics)?;

        info!(
            out_dir = %out_dir.display(),
            modules = self.modules.len(),
            "wrote batch output"
        );
        Ok(())
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| RelayError::io(path, e))
}

pub struct BatchTranspiler {
    config: TranspileConfig,
}

impl BatchTranspiler {
    pub fn new(config: TranspileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranspileConfig {
        &self.config
    }

    /// Transpile every source under `input` against the commands under `commands`.
    pub fn run(&self, input: &Path, commands: &Path) -> Result<BatchOutcome> {
        let registry = CommandRegistry::discover(commands, &self.config)?;
        self.run_with_registry(input, &registry)
    }

    pub fn run_with_registry(&self, input: &Path, registry: &CommandRegistry) -> Result<BatchOutcome> {
        self.config.validate()?;
        let started = Instant::now();

        let sources = discover_sources(input, &self.config)?;
        let methods = MethodIndex::build(&sources);

        let reporter = DiagnosticReporter::default();
        reporter.report_all(registry.diagnostics().iter().cloned());
        reporter.report_all(methods.diagnostics().iter().cloned());

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| RelayError::Config(format!("cannot start worker pool: {e}")))?;

        info!(
            input = %input.display(),
            files = sources.len(),
            commands = registry.len(),
            threads = pool.current_num_threads(),
            "starting batch"
        );

        let transpiler = Transpiler::new(registry, &methods, &self.config);
        let processed: Vec<(UnitOutcome, usize)> = pool.install(|| {
            sources
                .par_chunks(self.config.chunk_size)
                .flat_map_iter(|chunk| {
                    chunk.iter().map(|source| {
                        let mut outcome = transpile_isolated(&transpiler, source);
                        let errors = outcome.error_count();
                        reporter.report_all(std::mem::take(&mut outcome.diagnostics));
                        (outcome, errors)
                    })
                })
                .collect()
        });

        let mut statistics = BatchStatistics {
            threads: pool.current_num_threads(),
            chunk_size: self.config.chunk_size,
            ..BatchStatistics::new()
        };
        let mut usage = UsageTally::new();
        let mut modules = Vec::with_capacity(processed.len());

        for (outcome, errors) in processed {
            statistics.files_processed += 1;
            statistics.total_lines += outcome.source_lines as u64;
            statistics.record_passes(&outcome.stats);
            if errors > 0 {
                statistics.files_with_errors += 1;
            }
            usage.merge(outcome.usage);
            if let Some(module) = outcome.module {
                statistics.files_transformed += 1;
                statistics.generated_lines += module.line_count() as u64;
                modules.push(module);
            }
        }
        modules.sort_by(|a, b| a.output_path.cmp(&b.output_path));
        let usage = usage.sorted();

        let report = reporter.finish(sources.len(), &self.config.thresholds);
        let registry_report = RegistryReport::build(registry, &usage, &report.diagnostics);
        statistics.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            files = statistics.files_processed,
            errors = report.error_count(),
            warnings = report.warning_count(),
            duration_ms = statistics.duration_ms,
            "batch complete"
        );

        Ok(BatchOutcome {
            modules,
            report,
            registry_report,
            statistics,
        })
    }
}

/// Transpile one file; a panic becomes an `Internal` error for that file only.
fn transpile_isolated(transpiler: &Transpiler<'_>, source: &SourceFile) -> UnitOutcome {
    match catch_unwind(AssertUnwindSafe(|| transpiler.transpile_file(source.clone()))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(file = %source.display_name(), %message, "unit panicked");
            UnitOutcome::failed(
                source.clone(),
                Diagnostic::new(DiagnosticCategory::Internal, format!("transpiler panicked: {message}")),
            )
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Every source file under `root`, sorted by relative path.
pub fn discover_sources(root: &Path, config: &TranspileConfig) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        return Err(RelayError::MissingDirectory(root.to_path_buf()));
    }
    let mut paths = Vec::new();
    walk_sources(root, &config.source_extensions, &mut paths)?;

    let mut sources: Vec<SourceFile> = paths
        .iter()
        .map(|path| SourceFile::new(root, path, &config.output_extension))
        .collect();
    sources.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(sources)
}

fn walk_sources(current: &Path, extensions: &[String], found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(current).map_err(|e| RelayError::io(current, e))?;
    for entry in entries {
        let path = entry.map_err(|e| RelayError::io(current, e))?.path();
        if path.is_dir() {
            walk_sources(&path, extensions, found)?;
        } else if has_extension(&path, extensions) {
            found.push(path);
        }
    }
    Ok(())
}
