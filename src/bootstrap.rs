//! Runtime bootstrap files.
//!
//! Each file is written only if nothing exists at its path yet, so user edits
//! survive repeated builds. The check is [`should_write`], kept separate from
//! the write so callers and tests can ask without side effects.

use crate::package::PackageProfile;
use crate::templates;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapKind {
    LaunchScript,
    ProcessManifest,
    PathPatch,
    ServerConfig,
}

#[derive(Debug, Clone)]
pub struct BootstrapFile {
    pub kind: BootstrapKind,
    /// Relative to the build directory.
    pub relative: PathBuf,
    pub contents: String,
    pub executable: bool,
}

#[derive(Debug, Default, Clone)]
pub struct BootstrapReport {
    pub written: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
}

/// True when nothing exists at `path`. Broken symlinks count as existing.
pub fn should_write(path: &Path) -> bool {
    fs::symlink_metadata(path).is_err()
}

/// The files a build emits, in write order.
pub fn plan(profile: &PackageProfile) -> Vec<BootstrapFile> {
    vec![
        BootstrapFile {
            kind: BootstrapKind::LaunchScript,
            relative: Path::new("bin").join(profile.launch_script_name()),
            contents: templates::launch_script(profile),
            executable: true,
        },
        BootstrapFile {
            kind: BootstrapKind::ProcessManifest,
            relative: PathBuf::from("Procfile"),
            contents: templates::process_manifest(profile),
            executable: false,
        },
        BootstrapFile {
            kind: BootstrapKind::PathPatch,
            relative: Path::new(".profile.d").join(format!("{}.sh", profile.name)),
            contents: templates::path_patch(profile),
            executable: false,
        },
        BootstrapFile {
            kind: BootstrapKind::ServerConfig,
            relative: Path::new("config").join(format!("{}.conf.erb", profile.name)),
            contents: templates::server_config(profile),
            executable: false,
        },
    ]
}

pub fn generate(profile: &PackageProfile, build_dir: &Path) -> io::Result<BootstrapReport> {
    let mut report = BootstrapReport::default();
    for file in plan(profile) {
        let target = build_dir.join(&file.relative);
        if !should_write(&target) {
            debug!(path = %target.display(), "keeping existing file");
            report.kept.push(file.relative);
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.contents)?;
        if file.executable {
            make_executable(&target)?;
        }
        debug!(path = %target.display(), "wrote bootstrap file");
        report.written.push(file.relative);
    }
    Ok(report)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
