//! Compile command handler
//!
//! Handles `slugforge compile <BUILD_DIR> <CACHE_DIR> [ENV_DIR]`.

use anyhow::{Context, Result, bail};
use colored::*;
use std::path::Path;

use crate::bootstrap::{self, BootstrapReport};
use crate::build::{self, BuildPipeline, CompileOutcome, FeedbackAnalyzer, Toolchain};
use crate::cache::ArtifactCache;
use crate::config::{self, ConfigResolver, ConfigWarning, Severity};
use crate::error::BuildError;
use crate::fetch::{HttpFetcher, SourceFetcher};
use crate::package::PackageProfile;
use crate::ui;

/// Lines of captured tool output replayed after a quiet failure.
const FAILURE_TAIL_LINES: usize = 40;

/// Everything one `compile` run produced.
#[derive(Debug)]
pub struct CompileSummary {
    pub outcome: CompileOutcome,
    pub warnings: Vec<ConfigWarning>,
    pub bootstrap: BootstrapReport,
}

pub fn run_compile(
    profile: &PackageProfile,
    build_dir: &Path,
    cache_dir: &Path,
    env_dir: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let toolchain = Toolchain {
        quiet,
        ..Toolchain::default()
    };
    run_compile_with(
        profile,
        build_dir,
        cache_dir,
        env_dir,
        HttpFetcher { quiet },
        toolchain,
    )
    .map(|_| ())
}

/// `compile` with the fetcher and toolchain supplied by the caller.
pub fn run_compile_with<F: SourceFetcher>(
    profile: &PackageProfile,
    build_dir: &Path,
    cache_dir: &Path,
    env_dir: Option<&Path>,
    fetcher: F,
    toolchain: Toolchain,
) -> Result<CompileSummary> {
    if !build_dir.is_dir() {
        bail!("Build directory {} does not exist", build_dir.display());
    }

    ui::topic(&format!("Resolving {} build options", profile.name));
    let overrides = config::collect_overrides(profile, env_dir);
    let resolution = ConfigResolver::new(profile).resolve_from(build_dir, &overrides);
    print_warnings(&resolution.warnings);
    let request = resolution.request;

    let quiet = toolchain.quiet;
    let cache = ArtifactCache::new(cache_dir, profile);
    let pipeline = BuildPipeline::new(profile, fetcher, toolchain);

    let outcome = build::compile_package(profile, &request, build_dir, &cache, &pipeline)
        .inspect_err(|e| report_failure(e, quiet))
        .with_context(|| format!("Could not produce {} {}", profile.name, request.package_version))?;

    let report = bootstrap::generate(profile, build_dir)
        .context("Failed to write runtime bootstrap files")?;
    for path in &report.written {
        ui::indent(&format!("Created {}", path.display()));
    }
    for path in &report.kept {
        ui::indent(&format!("Kept existing {}", path.display()));
    }

    let verb = if outcome.decision.is_reuse() {
        "restored from cache"
    } else {
        "compiled"
    };
    ui::topic(&format!(
        "{} {} {} ({})",
        "Done:".green().bold(),
        profile.name,
        verb,
        outcome.fingerprint
    ));
    ui::indent(&format!("Binary: {}", outcome.binary_path.display()));

    Ok(CompileSummary {
        outcome,
        warnings: resolution.warnings,
        bootstrap: report,
    })
}

/// Captured tool output to replay for a failed step. Streaming runs have
/// already shown it, so only quiet runs get the tail back.
pub fn failure_output(err: &BuildError, quiet: bool) -> Vec<&str> {
    match err.tool_output() {
        Some(output) if quiet => {
            let lines: Vec<&str> = output.lines().collect();
            let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
            lines[start..].to_vec()
        }
        _ => Vec::new(),
    }
}

fn report_failure(err: &BuildError, quiet: bool) {
    let lines = failure_output(err, quiet);
    if !lines.is_empty() {
        ui::warn(&format!("Last {} lines of output:", lines.len()));
        for line in lines {
            ui::indent(line);
        }
    }
    if let Some(tip) = err.tool_output().and_then(FeedbackAnalyzer::analyze) {
        ui::tip(&tip);
    }
}

fn print_warnings(warnings: &[ConfigWarning]) {
    for warning in warnings {
        match warning.severity() {
            Severity::Info => ui::tip(&warning.to_string()),
            Severity::Warning => ui::warn(&warning.to_string()),
        }
    }
}
