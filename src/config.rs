//! Build option resolution.
//!
//! Three layers are merged into one [`BuildRequest`], last writer wins:
//!
//! 1. Profile defaults (known-good versions, no extra configure options)
//! 2. The project file `config/<package>_build.sh` (shell `KEY=value` lines)
//! 3. Named overrides from the buildpack `ENV_DIR` and the process environment
//!
//! Resolution never fails. Anything unusable falls back to a default and is
//! reported as a [`ConfigWarning`].

use crate::package::{PackageProfile, SYSTEM_SENTINEL};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

pub type ConfigValues = BTreeMap<String, String>;

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("valid assignment regex")
});

/// Secondary dependency selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Secondary {
    /// Fetch and compile this version into the binary.
    Bundled(String),
    /// Link against the host copy.
    System,
}

impl Secondary {
    pub fn as_str(&self) -> &str {
        match self {
            Secondary::Bundled(v) => v,
            Secondary::System => SYSTEM_SENTINEL,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Secondary::System)
    }
}

/// Fully resolved parameters for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRequest {
    pub package_version: String,
    pub secondary: Secondary,
    /// Passed to `configure` verbatim.
    pub configure_options: String,
    pub primary_url: String,
    pub secondary_url: String,
}

/// Non-fatal resolution diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    MissingVersion { key: String, default: String },
    UnsafeRange { key: String, value: String, default: String },
    ReleaseChannel { key: String, channel: String, default: String },
    MissingOptions { key: String },
    UnreadableFile { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

impl ConfigWarning {
    pub fn severity(&self) -> Severity {
        match self {
            ConfigWarning::MissingVersion { .. }
            | ConfigWarning::ReleaseChannel { .. }
            | ConfigWarning::MissingOptions { .. } => Severity::Info,
            ConfigWarning::UnsafeRange { .. } | ConfigWarning::UnreadableFile { .. } => {
                Severity::Warning
            }
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::MissingVersion { key, default } => write!(
                f,
                "No {key} set, using {default}. Pin a version with {key}=<version> to keep builds reproducible."
            ),
            ConfigWarning::UnsafeRange { key, value, default } => write!(
                f,
                "{key}={value:?} is an open version range and may pick up untested releases. Using {default} instead; pin an exact version."
            ),
            ConfigWarning::ReleaseChannel { key, channel, default } => write!(
                f,
                "Release channel {channel:?} in {key} is not supported yet, using {default}."
            ),
            ConfigWarning::MissingOptions { key } => write!(
                f,
                "No {key} set, configuring with upstream defaults."
            ),
            ConfigWarning::UnreadableFile { path, message } => write!(
                f,
                "Could not read {} ({message}), using defaults.",
                path.display()
            ),
        }
    }
}

/// Result of resolution: the request plus anything worth telling the user.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub request: BuildRequest,
    pub warnings: Vec<ConfigWarning>,
}

/// Configuration key names for a profile.
#[derive(Debug, Clone)]
pub struct ConfigKeys {
    pub version: String,
    pub secondary_version: String,
    pub configure_options: String,
    pub primary_url: String,
    pub secondary_url: String,
}

impl ConfigKeys {
    pub fn for_profile(profile: &PackageProfile) -> Self {
        let p = profile.key_prefix();
        let s = profile.secondary_key_prefix();
        Self {
            version: format!("{p}_VERSION"),
            secondary_version: format!("{s}_VERSION"),
            configure_options: format!("{p}_CONFIGURE_OPTIONS"),
            primary_url: format!("{p}_SOURCE_URL"),
            secondary_url: format!("{s}_SOURCE_URL"),
        }
    }

    pub fn all(&self) -> [&str; 5] {
        [
            &self.version,
            &self.secondary_version,
            &self.configure_options,
            &self.primary_url,
            &self.secondary_url,
        ]
    }
}

pub struct ConfigResolver<'a> {
    profile: &'a PackageProfile,
    keys: ConfigKeys,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(profile: &'a PackageProfile) -> Self {
        Self {
            profile,
            keys: ConfigKeys::for_profile(profile),
        }
    }

    pub fn keys(&self) -> &ConfigKeys {
        &self.keys
    }

    /// Load the project file from `build_dir` and resolve against `overrides`.
    pub fn resolve_from(&self, build_dir: &Path, overrides: &ConfigValues) -> Resolution {
        let path = self.profile.config_file(build_dir);
        let mut warnings = Vec::new();
        let file = match load_config_file(&path) {
            Ok(values) => values,
            Err(e) => {
                warnings.push(ConfigWarning::UnreadableFile {
                    path,
                    message: e.to_string(),
                });
                ConfigValues::new()
            }
        };
        let mut resolution = self.resolve(&file, overrides);
        warnings.append(&mut resolution.warnings);
        resolution.warnings = warnings;
        resolution
    }

    pub fn resolve(&self, file: &ConfigValues, overrides: &ConfigValues) -> Resolution {
        let get = |key: &str| lookup(file, overrides, key);
        let mut warnings = Vec::new();

        let package_version = resolve_version(
            &self.keys.version,
            get(&self.keys.version),
            self.profile.default_version,
            &mut warnings,
        );

        let secondary = match get(&self.keys.secondary_version).map(str::trim) {
            Some(SYSTEM_SENTINEL) => Secondary::System,
            raw => Secondary::Bundled(resolve_version(
                &self.keys.secondary_version,
                raw,
                self.profile.default_secondary_version,
                &mut warnings,
            )),
        };

        // Options go to configure and into the fingerprint byte for byte.
        let configure_options = match get(&self.keys.configure_options) {
            Some(opts) if !opts.trim().is_empty() => opts.to_string(),
            _ => {
                warnings.push(ConfigWarning::MissingOptions {
                    key: self.keys.configure_options.clone(),
                });
                String::new()
            }
        };

        let primary_url = get(&self.keys.primary_url)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.profile.primary_url)
            .to_string();
        let secondary_url = get(&self.keys.secondary_url)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.profile.secondary_url)
            .to_string();

        let request = BuildRequest {
            package_version,
            secondary,
            configure_options,
            primary_url,
            secondary_url,
        };
        debug!(?request, "resolved build request");

        Resolution { request, warnings }
    }
}

fn lookup<'v>(file: &'v ConfigValues, overrides: &'v ConfigValues, key: &str) -> Option<&'v str> {
    overrides
        .get(key)
        .or_else(|| file.get(key))
        .map(String::as_str)
}

fn resolve_version(
    key: &str,
    raw: Option<&str>,
    default: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> String {
    let value = match raw.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => {
            warnings.push(ConfigWarning::MissingVersion {
                key: key.to_string(),
                default: default.to_string(),
            });
            return default.to_string();
        }
    };

    if is_unsafe_range(value) {
        warnings.push(ConfigWarning::UnsafeRange {
            key: key.to_string(),
            value: value.to_string(),
            default: default.to_string(),
        });
        return default.to_string();
    }

    match value {
        "default" => default.to_string(),
        "mainline" | "stable" => {
            warnings.push(ConfigWarning::ReleaseChannel {
                key: key.to_string(),
                channel: value.to_string(),
                default: default.to_string(),
            });
            default.to_string()
        }
        _ => value.to_string(),
    }
}

/// `*` and open-ended `>`/`>=` comparators.
pub fn is_unsafe_range(value: &str) -> bool {
    let value = value.trim();
    value == "*" || value.starts_with('>')
}

/// Parse shell `KEY=value` lines. Comments, blank lines and anything that is
/// not a plain assignment are skipped.
pub fn parse_config_str(content: &str) -> ConfigValues {
    let mut values = ConfigValues::new();
    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(caps) = ASSIGNMENT.captures(line) else {
            debug!(line = lineno + 1, "skipping non-assignment line");
            continue;
        };
        let key = caps[1].to_string();
        let value = unquote(caps[2].trim());
        values.insert(key, value.to_string());
    }
    values
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Missing file is an empty layer, not an error.
pub fn load_config_file(path: &Path) -> std::io::Result<ConfigValues> {
    if !path.exists() {
        debug!(path = %path.display(), "no project config file");
        return Ok(ConfigValues::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(parse_config_str(&content))
}

/// Read a buildpack `ENV_DIR`: one file per variable, file name is the key.
pub fn read_env_dir(env_dir: &Path) -> ConfigValues {
    let mut values = ConfigValues::new();
    let Ok(entries) = fs::read_dir(env_dir) else {
        warn!(path = %env_dir.display(), "env dir not readable, ignoring");
        return values;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let key = entry.file_name().to_string_lossy().to_string();
        match fs::read_to_string(&path) {
            Ok(content) => {
                values.insert(key, content.trim_end_matches(['\n', '\r']).to_string());
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable env file"),
        }
    }
    values
}

/// Overrides for the recognized keys. A variable already set in the process
/// environment wins over the same key in `ENV_DIR`.
pub fn collect_overrides(profile: &PackageProfile, env_dir: Option<&Path>) -> ConfigValues {
    let keys = ConfigKeys::for_profile(profile);
    let from_dir = env_dir.map(read_env_dir).unwrap_or_default();
    let process: ConfigValues = keys
        .all()
        .iter()
        .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v)))
        .collect();
    merge_overrides(&keys, from_dir, process)
}

fn merge_overrides(keys: &ConfigKeys, env_dir: ConfigValues, process: ConfigValues) -> ConfigValues {
    let mut merged = ConfigValues::new();
    for key in keys.all() {
        if let Some(v) = process.get(key).or_else(|| env_dir.get(key)) {
            merged.insert(key.to_string(), v.clone());
        }
    }
    merged
}
