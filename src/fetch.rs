//! Source archive download and extraction.
//!
//! Archives are unpacked as-is, keeping their top-level directory
//! (`nginx-1.7.9/`, `pcre-8.36/`), because the configure flag for the bundled
//! dependency refers to that directory name. Nothing is retried.

use crate::error::{BuildError, BuildResult};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tracing::{debug, info};

/// Downloads a source archive and unpacks it.
pub trait SourceFetcher {
    /// Fetch `url` and unpack it under `dest`. Returns the top-level
    /// directory the archive created.
    fn fetch(&self, url: &str, dest: &Path) -> BuildResult<PathBuf>;
}

/// Plain HTTP(S) downloads through `ureq`.
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher {
    /// Hide progress bars (non-interactive output).
    pub quiet: bool,
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> BuildResult<PathBuf> {
        fs::create_dir_all(dest).map_err(|e| BuildError::workspace(dest, e))?;
        let archive = dest.join(archive_file_name(url));
        self.download(url, &archive)?;
        let top = unpack_archive(&archive, dest)?;
        fs::remove_file(&archive).map_err(|e| BuildError::workspace(&archive, e))?;
        Ok(top)
    }
}

impl HttpFetcher {
    fn download(&self, url: &str, path: &Path) -> BuildResult<()> {
        info!(url = %url, "downloading");
        let fetch_err = |message: String| BuildError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = ureq::get(url).call().map_err(|e| fetch_err(e.to_string()))?;
        let total_size = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let pb = if self.quiet {
            ProgressBar::hidden()
        } else if total_size > 0 {
            let pb = ProgressBar::new(total_size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("       [{bar:40.green/black}] {bytes}/{total_bytes} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("━━╸"),
            );
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("       {spinner:.blue} {bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };

        let mut file = File::create(path).map_err(|e| BuildError::workspace(path, e))?;
        let mut reader = response.into_body().into_reader();
        let mut buffer = [0; 8192];
        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|e| fetch_err(format!("read interrupted: {}", e)))?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])
                .map_err(|e| BuildError::workspace(path, e))?;
            pb.inc(n as u64);
        }
        pb.finish_and_clear();

        debug!(path = %path.display(), bytes = pb.position(), "download complete");
        Ok(())
    }
}

/// Last URL path segment without query string, sanitized.
pub fn archive_file_name(url: &str) -> String {
    let last = url.rsplit('/').next().unwrap_or(url);
    let last = last.split('?').next().unwrap_or(last);
    let sanitized: String = last
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        "source.tar.gz".to_string()
    } else {
        sanitized
    }
}

/// Unpack `.tar.gz`/`.tgz`, `.tar` or `.zip` into `dest` and return the
/// archive's top-level directory.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> BuildResult<PathBuf> {
    let name = archive_path.to_string_lossy();
    let unpack_err = |source: io::Error| BuildError::Unpack {
        archive: archive_path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dest).map_err(|e| BuildError::workspace(dest, e))?;
    let top = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let file = File::open(archive_path).map_err(unpack_err)?;
        unpack_tar(GzDecoder::new(BufReader::new(file)), dest).map_err(unpack_err)?
    } else if name.ends_with(".tar") {
        let file = File::open(archive_path).map_err(unpack_err)?;
        unpack_tar(BufReader::new(file), dest).map_err(unpack_err)?
    } else if name.ends_with(".zip") {
        unpack_zip(archive_path, dest).map_err(unpack_err)?
    } else {
        return Err(BuildError::UnsupportedArchive(name.to_string()));
    };

    let top = top.ok_or_else(|| unpack_err(io::Error::other("archive is empty")))?;
    info!(dir = %top.display(), "unpacked");
    Ok(top)
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> io::Result<Option<PathBuf>> {
    let mut archive = Archive::new(reader);
    let mut top = None;
    for entry in archive.entries()? {
        let mut entry = entry?;
        if top.is_none() {
            top = first_component(&entry.path()?);
        }
        entry.unpack_in(dest)?;
    }
    Ok(top.map(|t| dest.join(t)))
}

fn unpack_zip(archive_path: &Path, dest: &Path) -> io::Result<Option<PathBuf>> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(io::Error::other)?;
    let mut top = None;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(io::Error::other)?;
        let Some(relative) = file.enclosed_name() else {
            continue;
        };
        if top.is_none() {
            top = first_component(&relative);
        }
        let outpath = dest.join(relative);
        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent() {
                fs::create_dir_all(p)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
        }
    }
    Ok(top.map(|t| dest.join(t)))
}

fn first_component(path: &Path) -> Option<PathBuf> {
    path.components().find_map(|c| match c {
        Component::Normal(name) => Some(PathBuf::from(name)),
        _ => None,
    })
}
