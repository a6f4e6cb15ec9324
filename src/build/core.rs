use super::pipeline::BuildPipeline;
use crate::cache::{ArtifactCache, CachedArtifact};
use crate::config::BuildRequest;
use crate::error::BuildResult;
use crate::fetch::SourceFetcher;
use crate::fingerprint::{Decision, Fingerprint, RebuildReason, decide};
use crate::package::PackageProfile;
use crate::ui;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub decision: Decision,
    pub fingerprint: Fingerprint,
    /// Binary inside the build directory.
    pub binary_path: PathBuf,
    pub cached: CachedArtifact,
}

/// Reuse the cached binary when the fingerprint matches, otherwise purge the
/// entry, rebuild and store the new artifact.
pub fn compile_package<F: SourceFetcher>(
    profile: &PackageProfile,
    request: &BuildRequest,
    build_dir: &Path,
    cache: &ArtifactCache,
    pipeline: &BuildPipeline<'_, F>,
) -> BuildResult<CompileOutcome> {
    let fingerprint = Fingerprint::of(request);
    let mut decision = decide(&fingerprint, &cache.read_entry()?);
    info!(digest = %fingerprint.digest(), ?decision, "cache decision");

    if decision.is_reuse() {
        if let Some(cached) = cache.restore(build_dir, profile)? {
            ui::topic(&format!(
                "Using cached {} {} ({})",
                profile.name,
                fingerprint.package_version,
                fingerprint.digest()
            ));
            return Ok(CompileOutcome {
                decision,
                binary_path: profile.vendor_bin_dir(build_dir).join(profile.binary),
                fingerprint,
                cached,
            });
        }
        // Entry vanished between the decision and the copy.
        decision = Decision::Rebuild(RebuildReason::MissingBinary);
    }

    if let Decision::Rebuild(reason) = &decision {
        ui::topic(&format!("Rebuilding {}: {}", profile.name, reason));
    }
    cache.purge()?;

    let artifact = pipeline.build(request, build_dir)?;
    let cached = cache.store(&artifact, build_dir)?;

    Ok(CompileOutcome {
        decision,
        fingerprint,
        binary_path: artifact.binary_path,
        cached,
    })
}
