use super::toolchain::Toolchain;
use crate::cache::{Artifact, METADATA_DIR, write_metadata};
use crate::config::{BuildRequest, Secondary};
use crate::error::{BuildError, BuildResult};
use crate::fetch::SourceFetcher;
use crate::fingerprint::Fingerprint;
use crate::package::{PackageProfile, render_url};
use crate::ui;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fetch, configure, compile and install one binary into the build directory.
pub struct BuildPipeline<'a, F: SourceFetcher> {
    profile: &'a PackageProfile,
    fetcher: F,
    toolchain: Toolchain,
}

impl<'a, F: SourceFetcher> BuildPipeline<'a, F> {
    pub fn new(profile: &'a PackageProfile, fetcher: F, toolchain: Toolchain) -> Self {
        Self {
            profile,
            fetcher,
            toolchain,
        }
    }

    /// Build into `<build>/vendor/<package>/bin` and write the metadata
    /// mirror. The source workspace is removed afterwards whether or not the
    /// build succeeded.
    pub fn build(&self, request: &BuildRequest, build_dir: &Path) -> BuildResult<Artifact> {
        let workspace = self.profile.workspace_dir(build_dir);
        if workspace.exists() {
            fs::remove_dir_all(&workspace).map_err(|e| BuildError::workspace(&workspace, e))?;
        }
        fs::create_dir_all(&workspace).map_err(|e| BuildError::workspace(&workspace, e))?;

        let result = self.build_in(request, &workspace, build_dir);

        debug!(path = %workspace.display(), "removing source workspace");
        if let Err(e) = fs::remove_dir_all(&workspace) {
            warn!(path = %workspace.display(), error = %e, "failed to remove source workspace");
        }
        result
    }

    fn build_in(
        &self,
        request: &BuildRequest,
        workspace: &Path,
        build_dir: &Path,
    ) -> BuildResult<Artifact> {
        let profile = self.profile;

        ui::topic(&format!(
            "Fetching {} {}",
            profile.name, request.package_version
        ));
        let primary_url = render_url(&request.primary_url, &request.package_version);
        let source_dir = self.fetcher.fetch(&primary_url, workspace)?;

        let bundled_dir = match &request.secondary {
            Secondary::Bundled(version) => {
                ui::topic(&format!("Fetching {} {}", profile.secondary, version));
                let url = render_url(&request.secondary_url, version);
                let dir = self.fetcher.fetch(&url, &source_dir)?;
                Some(dir_name(&dir))
            }
            Secondary::System => {
                ui::indent(&format!("Using system {}", profile.secondary));
                None
            }
        };

        let options = configure_options(
            profile,
            bundled_dir.as_deref(),
            &request.configure_options,
        );
        info!(options = %options, "configure options");

        ui::topic(&format!("Configuring {}", profile.name));
        self.toolchain.configure(&source_dir, &options)?;
        ui::topic(&format!("Compiling {}", profile.name));
        self.toolchain.compile(&source_dir)?;

        let produced = source_dir.join(profile.binary_output);
        if !produced.is_file() {
            return Err(BuildError::MissingBinary(produced));
        }
        let binary_path = install_binary(&produced, &profile.vendor_bin_dir(build_dir), profile.binary)?;

        let fingerprint = Fingerprint::of(request);
        let meta_dir = build_dir.join(METADATA_DIR);
        if let Err(e) = write_metadata(&meta_dir, &fingerprint) {
            // A binary without its metadata must not look like a finished build.
            if let Err(rm) = fs::remove_file(&binary_path) {
                warn!(path = %binary_path.display(), error = %rm, "failed to remove unrecorded binary");
            }
            return Err(BuildError::workspace(&meta_dir, e));
        }

        Ok(Artifact {
            fingerprint,
            binary_path,
        })
    }
}

/// `<flag>=<dir>` for a bundled secondary dependency, then the user's options
/// untouched.
pub fn configure_options(
    profile: &PackageProfile,
    bundled_dir: Option<&str>,
    user_options: &str,
) -> String {
    let mut parts = Vec::new();
    if let Some(dir) = bundled_dir {
        parts.push(format!("{}={}", profile.secondary_flag, dir));
    }
    if !user_options.is_empty() {
        parts.push(user_options.to_string());
    }
    parts.join(" ")
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn install_binary(produced: &Path, bin_dir: &Path, binary: &str) -> BuildResult<PathBuf> {
    fs::create_dir_all(bin_dir).map_err(|e| BuildError::workspace(bin_dir, e))?;
    let dest = bin_dir.join(binary);
    if fs::rename(produced, &dest).is_err() {
        fs::copy(produced, &dest).map_err(|e| BuildError::workspace(&dest, e))?;
    }
    ui::indent(&format!("Installed {}", dest.display()));
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_flag_precedes_user_options() {
        let profile = PackageProfile::nginx();
        assert_eq!(
            configure_options(&profile, Some("pcre-8.36"), "--with-http_ssl_module"),
            "--with-pcre=pcre-8.36 --with-http_ssl_module"
        );
    }

    #[test]
    fn test_system_secondary_omits_flag() {
        let profile = PackageProfile::nginx();
        assert_eq!(configure_options(&profile, None, "--with-foo"), "--with-foo");
        assert_eq!(configure_options(&profile, None, ""), "");
    }

    #[test]
    fn test_user_options_not_sanitized() {
        let profile = PackageProfile::nginx();
        let raw = "--with-cc-opt='-I /opt/include' ; weird";
        assert!(configure_options(&profile, None, raw).ends_with(raw));
    }
}
