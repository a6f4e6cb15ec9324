//! Cache command handler
//!
//! Handles `slugforge cache status` and `slugforge cache purge`.

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};

use crate::cache::ArtifactCache;
use crate::package::PackageProfile;
use crate::ui;

/// `~/.cache/slugforge` when no directory is given.
pub fn default_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not find a user cache directory")?;
    Ok(base.join("slugforge"))
}

fn resolve_dir(cache_dir: Option<&Path>) -> Result<PathBuf> {
    match cache_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => default_cache_dir(),
    }
}

pub fn status(profile: &PackageProfile, cache_dir: Option<&Path>, json: bool) -> Result<()> {
    let dir = resolve_dir(cache_dir)?;
    let cache = ArtifactCache::new(&dir, profile);
    let status = cache.status(profile.name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    if !status.present {
        println!("{} No cached {} in {}", "ℹ".blue(), profile.name, dir.display());
        return Ok(());
    }

    let mut table = ui::Table::new(&["Field", "Value"]);
    table.add_row(vec!["path".into(), status.path.display().to_string()]);
    if let Some(fp) = &status.fingerprint {
        table.add_row(vec!["primary-version".into(), fp.package_version.clone()]);
        table.add_row(vec!["secondary-version".into(), fp.secondary_version.clone()]);
        table.add_row(vec!["configure-options".into(), format!("{:?}", fp.configure_options)]);
    }
    if let Some(digest) = &status.digest {
        table.add_row(vec!["digest".into(), digest.clone()]);
    }
    table.add_row(vec![
        "binary".into(),
        if status.binary_present { "present" } else { "missing" }.into(),
    ]);
    if !status.missing_metadata.is_empty() {
        table.add_row(vec!["missing".into(), status.missing_metadata.join(", ")]);
    }
    table.add_row(vec!["size".into(), format!("{} KiB", status.size_bytes / 1024)]);
    table.print();
    Ok(())
}

pub fn purge(profile: &PackageProfile, cache_dir: Option<&Path>) -> Result<()> {
    let dir = resolve_dir(cache_dir)?;
    let cache = ArtifactCache::new(&dir, profile);
    if !cache.entry_dir().exists() {
        println!("{} Cache already empty.", "✓".green());
        return Ok(());
    }
    cache.purge()?;
    println!("{} Purged {}", "✓".green(), cache.entry_dir().display());
    Ok(())
}
