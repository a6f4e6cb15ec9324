//! Cache eligibility.
//!
//! A fingerprint is the literal (version, secondary version, configure
//! options) triple. Equality is byte equality on all three; there is no
//! semantic version comparison and configure options are never parsed.

use crate::config::BuildRequest;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub package_version: String,
    pub secondary_version: String,
    pub configure_options: String,
}

impl Fingerprint {
    pub fn new(
        package_version: impl Into<String>,
        secondary_version: impl Into<String>,
        configure_options: impl Into<String>,
    ) -> Self {
        Self {
            package_version: package_version.into(),
            secondary_version: secondary_version.into(),
            configure_options: configure_options.into(),
        }
    }

    pub fn of(request: &BuildRequest) -> Self {
        Self::new(
            request.package_version.as_str(),
            request.secondary.as_str(),
            request.configure_options.as_str(),
        )
    }

    /// Short id for logs. Not used for the reuse decision.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            &self.package_version,
            &self.secondary_version,
            &self.configure_options,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())[..12].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {:?}",
            self.package_version, self.secondary_version, self.configure_options
        )
    }
}

/// What the cache currently holds, as far as the decision is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredEntry {
    /// No cache directory for the package.
    Absent,
    /// Directory exists but metadata files are missing or unreadable.
    Incomplete { missing: Vec<&'static str> },
    /// All metadata present.
    Recorded {
        fingerprint: Fingerprint,
        has_binary: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    NoCache,
    MissingMetadata(Vec<&'static str>),
    MissingBinary,
    Changed { previous: Fingerprint },
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::NoCache => write!(f, "no cached build"),
            RebuildReason::MissingMetadata(files) => {
                write!(f, "cache metadata missing or unreadable ({})", files.join(", "))
            }
            RebuildReason::MissingBinary => write!(f, "cached binary missing"),
            RebuildReason::Changed { previous } => {
                write!(f, "build options changed (cached: {})", previous)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Reuse,
    Rebuild(RebuildReason),
}

impl Decision {
    pub fn is_reuse(&self) -> bool {
        matches!(self, Decision::Reuse)
    }
}

/// All-or-nothing: any difference in any component means a full rebuild.
pub fn decide(current: &Fingerprint, stored: &StoredEntry) -> Decision {
    match stored {
        StoredEntry::Absent => Decision::Rebuild(RebuildReason::NoCache),
        StoredEntry::Incomplete { missing } => {
            Decision::Rebuild(RebuildReason::MissingMetadata(missing.clone()))
        }
        StoredEntry::Recorded { fingerprint, .. } if fingerprint != current => {
            Decision::Rebuild(RebuildReason::Changed {
                previous: fingerprint.clone(),
            })
        }
        StoredEntry::Recorded {
            has_binary: false, ..
        } => Decision::Rebuild(RebuildReason::MissingBinary),
        StoredEntry::Recorded { .. } => Decision::Reuse,
    }
}
