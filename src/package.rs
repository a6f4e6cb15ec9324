//! Static description of the package this buildpack compiles.
//!
//! A [`PackageProfile`] names everything that differs between wrapped
//! packages: the binary, known-good versions, where sources come from and how
//! the bundled secondary dependency is handed to `configure`. Directory and
//! file names used by the cache, the pipeline and the bootstrap generator are
//! all derived from it.

use std::path::{Path, PathBuf};

/// Reserved secondary version meaning "use the host copy, do not fetch".
pub const SYSTEM_SENTINEL: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageProfile {
    /// Package name, used for cache and vendor directories.
    pub name: &'static str,
    /// Name of the produced executable.
    pub binary: &'static str,
    /// Path of the produced executable relative to the primary source tree.
    pub binary_output: &'static str,
    pub default_version: &'static str,
    pub primary_url: &'static str,
    /// Name of the bundled secondary dependency.
    pub secondary: &'static str,
    pub default_secondary_version: &'static str,
    pub secondary_url: &'static str,
    /// Configure flag pointing at the extracted secondary source tree.
    pub secondary_flag: &'static str,
    /// Process type declared in the manifest.
    pub process_type: &'static str,
    /// Arguments that keep the server in the foreground.
    pub foreground_args: &'static str,
}

impl PackageProfile {
    pub const fn nginx() -> Self {
        Self {
            name: "nginx",
            binary: "nginx",
            binary_output: "objs/nginx",
            default_version: "1.6.2",
            primary_url: "https://nginx.org/download/nginx-{version}.tar.gz",
            secondary: "pcre",
            default_secondary_version: "8.36",
            secondary_url: "https://downloads.sourceforge.net/project/pcre/pcre/{version}/pcre-{version}.tar.gz",
            secondary_flag: "--with-pcre",
            process_type: "web",
            foreground_args: "-g 'daemon off;' -p . -c config/nginx.conf",
        }
    }

    /// Prefix for configuration keys of the primary package (`NGINX`).
    pub fn key_prefix(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    /// Prefix for configuration keys of the secondary dependency (`PCRE`).
    pub fn secondary_key_prefix(&self) -> String {
        self.secondary.to_ascii_uppercase()
    }

    pub fn config_file(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(self.config_file_relative())
    }

    /// Path of the build options file relative to the app root. The launch
    /// script sources the same file at runtime.
    pub fn config_file_relative(&self) -> String {
        format!("config/{}_build.sh", self.name)
    }

    pub fn launch_script_name(&self) -> String {
        format!("start-{}", self.name)
    }

    pub fn vendor_dir(&self, build_dir: &Path) -> PathBuf {
        build_dir.join("vendor").join(self.name)
    }

    pub fn vendor_bin_dir(&self, build_dir: &Path) -> PathBuf {
        self.vendor_dir(build_dir).join("bin")
    }

    pub fn workspace_dir(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(".slugforge")
    }
}

impl Default for PackageProfile {
    fn default() -> Self {
        Self::nginx()
    }
}

/// Fill a `{version}` URL template.
pub fn render_url(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}
