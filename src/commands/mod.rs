//! CLI Command handlers
//!
//! One module per subcommand that does real work; `detect` and `release`
//! only print and live here.

pub mod cache;
pub mod compile;

use crate::package::PackageProfile;
use crate::templates;
use std::path::Path;
use tracing::debug;

/// Buildpack detection always succeeds and names the package.
pub fn detect(profile: &PackageProfile, build_dir: &Path) {
    debug!(
        config = profile.config_file(build_dir).exists(),
        "detect"
    );
    println!("{}", profile.name);
}

pub fn release(profile: &PackageProfile, build_dir: &Path) {
    debug!(build_dir = %build_dir.display(), "release");
    print!("{}", templates::release_yaml(profile));
}
