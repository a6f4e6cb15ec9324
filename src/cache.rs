//! Artifact cache that survives between builds.
//!
//! ## Layout
//!
//! ```text
//! <cache>/<package>/bin/<binary>
//! <cache>/<package>/.metadata/primary-version
//! <cache>/<package>/.metadata/secondary-version
//! <cache>/<package>/.metadata/configure-options
//! ```
//!
//! Each metadata file holds exactly one value with no trailing newline. The
//! build directory carries the same three files under `<build>/.metadata/` so
//! the slug records what it was built from.
//!
//! There is no locking. Two invocations sharing a cache directory must be
//! serialized by the caller.

use crate::error::{BuildError, BuildResult};
use crate::fingerprint::{Fingerprint, StoredEntry};
use crate::package::PackageProfile;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const METADATA_DIR: &str = ".metadata";
pub const PRIMARY_VERSION_FILE: &str = "primary-version";
pub const SECONDARY_VERSION_FILE: &str = "secondary-version";
pub const CONFIGURE_OPTIONS_FILE: &str = "configure-options";

/// A compiled binary sitting in the build directory together with the
/// fingerprint it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub fingerprint: Fingerprint,
    pub binary_path: PathBuf,
}

/// An artifact as held by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub fingerprint: Fingerprint,
    pub binary_path: PathBuf,
    pub metadata_files: [PathBuf; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub package: String,
    pub path: PathBuf,
    pub present: bool,
    pub fingerprint: Option<Fingerprint>,
    pub digest: Option<String>,
    pub binary_present: bool,
    pub missing_metadata: Vec<&'static str>,
    pub size_bytes: u64,
}

pub struct ArtifactCache {
    root: PathBuf,
    binary: String,
}

impl ArtifactCache {
    pub fn new(cache_dir: &Path, profile: &PackageProfile) -> Self {
        Self {
            root: cache_dir.join(profile.name),
            binary: profile.binary.to_string(),
        }
    }

    pub fn entry_dir(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.bin_dir().join(&self.binary)
    }

    /// Inspect the entry for the reuse decision.
    pub fn read_entry(&self) -> BuildResult<StoredEntry> {
        if !self.root.is_dir() {
            return Ok(StoredEntry::Absent);
        }
        match read_metadata(&self.metadata_dir())? {
            Ok(fingerprint) => Ok(StoredEntry::Recorded {
                fingerprint,
                has_binary: self.binary_path().is_file(),
            }),
            Err(missing) => Ok(StoredEntry::Incomplete { missing }),
        }
    }

    /// Remove the whole entry. Absent entries are fine.
    pub fn purge(&self) -> BuildResult<()> {
        if !self.root.exists() {
            return Ok(());
        }
        info!(path = %self.root.display(), "purging cache entry");
        fs::remove_dir_all(&self.root).map_err(|e| BuildError::cache_io("purge", &self.root, e))
    }

    /// Copy the cached binary tree into `<build>/vendor/<package>/bin` and
    /// the metadata into `<build>/.metadata`. Returns `None` when nothing is
    /// cached.
    pub fn restore(
        &self,
        build_dir: &Path,
        profile: &PackageProfile,
    ) -> BuildResult<Option<CachedArtifact>> {
        let fingerprint = match self.read_entry()? {
            StoredEntry::Recorded {
                fingerprint,
                has_binary: true,
            } => fingerprint,
            _ => return Ok(None),
        };

        let dest_bin = profile.vendor_bin_dir(build_dir);
        debug!(from = %self.bin_dir().display(), to = %dest_bin.display(), "restoring cached binary");
        copy_tree(&self.bin_dir(), &dest_bin)
            .map_err(|e| BuildError::cache_io("restore", &dest_bin, e))?;

        let dest_meta = build_dir.join(METADATA_DIR);
        copy_tree(&self.metadata_dir(), &dest_meta)
            .map_err(|e| BuildError::cache_io("restore", &dest_meta, e))?;

        Ok(Some(self.cached(fingerprint)))
    }

    /// Copy a freshly built artifact and its metadata into the cache.
    pub fn store(&self, artifact: &Artifact, build_dir: &Path) -> BuildResult<CachedArtifact> {
        let src_bin = artifact
            .binary_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| build_dir.to_path_buf());
        let dest_bin = self.bin_dir();
        info!(path = %self.root.display(), digest = %artifact.fingerprint.digest(), "storing artifact in cache");
        copy_tree(&src_bin, &dest_bin).map_err(|e| BuildError::cache_io("store", &dest_bin, e))?;

        let dest_meta = self.metadata_dir();
        copy_tree(&build_dir.join(METADATA_DIR), &dest_meta)
            .map_err(|e| BuildError::cache_io("store", &dest_meta, e))?;

        Ok(self.cached(artifact.fingerprint.clone()))
    }

    pub fn status(&self, package: &str) -> BuildResult<CacheStatus> {
        let entry = self.read_entry()?;
        let (fingerprint, binary_present, missing) = match entry {
            StoredEntry::Absent => (None, false, Vec::new()),
            StoredEntry::Incomplete { missing } => (None, self.binary_path().is_file(), missing),
            StoredEntry::Recorded {
                fingerprint,
                has_binary,
            } => (Some(fingerprint), has_binary, Vec::new()),
        };
        Ok(CacheStatus {
            package: package.to_string(),
            path: self.root.clone(),
            present: self.root.is_dir(),
            digest: fingerprint.as_ref().map(Fingerprint::digest),
            fingerprint,
            binary_present,
            missing_metadata: missing,
            size_bytes: dir_size(&self.root),
        })
    }

    fn cached(&self, fingerprint: Fingerprint) -> CachedArtifact {
        let meta = self.metadata_dir();
        CachedArtifact {
            fingerprint,
            binary_path: self.binary_path(),
            metadata_files: [
                meta.join(PRIMARY_VERSION_FILE),
                meta.join(SECONDARY_VERSION_FILE),
                meta.join(CONFIGURE_OPTIONS_FILE),
            ],
        }
    }
}

/// Write the three metadata files into `dir`.
pub fn write_metadata(dir: &Path, fingerprint: &Fingerprint) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(PRIMARY_VERSION_FILE), &fingerprint.package_version)?;
    fs::write(dir.join(SECONDARY_VERSION_FILE), &fingerprint.secondary_version)?;
    fs::write(dir.join(CONFIGURE_OPTIONS_FILE), &fingerprint.configure_options)?;
    Ok(())
}

/// Read the metadata files in `dir`. The inner `Err` lists files that are
/// missing or hold something other than UTF-8 text; either way the entry
/// cannot be trusted and gets rebuilt.
pub fn read_metadata(dir: &Path) -> BuildResult<Result<Fingerprint, Vec<&'static str>>> {
    let mut values = Vec::with_capacity(3);
    let mut missing = Vec::new();
    for name in [
        PRIMARY_VERSION_FILE,
        SECONDARY_VERSION_FILE,
        CONFIGURE_OPTIONS_FILE,
    ] {
        let path = dir.join(name);
        match fs::read_to_string(&path) {
            Ok(v) => values.push(v),
            Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(name),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(path = %path.display(), "corrupt cache metadata, treating as missing");
                missing.push(name);
            }
            Err(e) => return Err(BuildError::cache_io("read", path, e)),
        }
    }
    if !missing.is_empty() {
        return Ok(Err(missing));
    }
    let mut values = values.into_iter();
    Ok(Ok(Fingerprint {
        package_version: values.next().unwrap_or_default(),
        secondary_version: values.next().unwrap_or_default(),
        configure_options: values.next().unwrap_or_default(),
    }))
}

/// Recursive copy; file permissions travel with `fs::copy`.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}
