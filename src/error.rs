//! Fatal error taxonomy for the build.
//!
//! Configuration problems are never errors; they degrade to defaults and are
//! reported as [`crate::config::ConfigWarning`]. Everything here aborts the
//! invocation.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// External build step that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Configure,
    Compile,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Configure => write!(f, "configure"),
            BuildStep::Compile => write!(f, "compile"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to download {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to unpack {}: {source}", .archive.display())]
    Unpack {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),

    #[error("The {step} step exited with {}", exit_label(.code))]
    ExternalTool {
        step: BuildStep,
        code: Option<i32>,
        /// Combined stdout/stderr of the step.
        output: String,
    },

    #[error("Build finished but no binary was produced at {}", .0.display())]
    MissingBinary(PathBuf),

    #[error("Cache {action} failed at {}: {source}", .path.display())]
    CacheIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace error at {}: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}

impl BuildError {
    pub fn cache_io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::CacheIo {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Captured tool output, if the failure came from an external step.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            BuildError::ExternalTool { output, .. } => Some(output),
            _ => None,
        }
    }
}
