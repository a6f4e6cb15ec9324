//! Offline stand-ins for the network and the package's own build system.
//!
//! `FakeFetcher` "downloads" an archive by creating its top-level directory
//! with a `configure` script and a `make.sh`, both of which log to a file
//! outside the workspace so tests can count invocations after cleanup.

#![allow(dead_code)]

use slugforge::build::{BuildPipeline, Toolchain};
use slugforge::config::{BuildRequest, ConfigResolver, ConfigValues};
use slugforge::error::BuildResult;
use slugforge::fetch::{SourceFetcher, archive_file_name};
use slugforge::package::PackageProfile;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const NGINX_URL: &str = "https://fake.invalid/nginx-{version}.tar.gz";
pub const PCRE_URL: &str = "https://fake.invalid/pcre-{version}.tar.gz";

#[derive(Clone)]
pub struct FakeFetcher {
    pub calls: Rc<RefCell<Vec<String>>>,
    pub log_dir: PathBuf,
    /// Exit status of the generated `make.sh`.
    pub make_status: i32,
}

impl FakeFetcher {
    pub fn new(log_dir: &Path) -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            log_dir: log_dir.to_path_buf(),
            make_status: 0,
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn configure_log(&self) -> Vec<String> {
        read_lines(&self.log_dir.join("configure.log"))
    }

    pub fn compile_count(&self) -> usize {
        read_lines(&self.log_dir.join("make.log")).len()
    }
}

impl SourceFetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> BuildResult<PathBuf> {
        self.calls.borrow_mut().push(url.to_string());
        let name = archive_file_name(url);
        let dir = dest.join(name.trim_end_matches(".tar.gz"));
        fs::create_dir_all(&dir).unwrap();

        let configure_log = self.log_dir.join("configure.log");
        let make_log = self.log_dir.join("make.log");
        fs::write(
            dir.join("configure"),
            format!("echo \"$*\" >> '{}'\n", configure_log.display()),
        )
        .unwrap();
        fs::write(
            dir.join("make.sh"),
            format!(
                "echo built >> '{}'\nmkdir -p objs\nprintf 'nginx-binary' > objs/nginx\nexit {}\n",
                make_log.display(),
                self.make_status
            ),
        )
        .unwrap();
        Ok(dir)
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn toolchain() -> Toolchain {
    Toolchain {
        configure: "sh ./configure".into(),
        make: "sh ./make.sh".into(),
        quiet: true,
    }
}

pub fn pipeline(profile: &PackageProfile, fetcher: FakeFetcher) -> BuildPipeline<'_, FakeFetcher> {
    BuildPipeline::new(profile, fetcher, toolchain())
}

/// Resolve a request the way `compile` does, from file-style values.
pub fn request(profile: &PackageProfile, pairs: &[(&str, &str)]) -> BuildRequest {
    let mut file: ConfigValues = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    file.insert("NGINX_SOURCE_URL".into(), NGINX_URL.into());
    file.insert("PCRE_SOURCE_URL".into(), PCRE_URL.into());
    ConfigResolver::new(profile)
        .resolve(&file, &ConfigValues::new())
        .request
}
