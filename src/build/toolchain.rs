use crate::error::{BuildError, BuildResult, BuildStep};
use crate::ui;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// The wrapped package's own build tools. Both commands are run through
/// `sh -c` from the primary source directory, so the configure options are
/// word-split by the shell exactly as written.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub configure: String,
    pub make: String,
    /// Capture output without echoing it.
    pub quiet: bool,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            configure: "./configure".to_string(),
            make: "make".to_string(),
            quiet: false,
        }
    }
}

impl Toolchain {
    pub fn configure(&self, source_dir: &Path, options: &str) -> BuildResult<String> {
        let command = if options.is_empty() {
            self.configure.clone()
        } else {
            format!("{} {}", self.configure, options)
        };
        self.run(BuildStep::Configure, &command, source_dir)
    }

    pub fn compile(&self, source_dir: &Path) -> BuildResult<String> {
        self.run(BuildStep::Compile, &self.make, source_dir)
    }

    /// Run `command`, streaming combined stdout/stderr indented. Returns the
    /// captured output; a nonzero exit becomes [`BuildError::ExternalTool`].
    fn run(&self, step: BuildStep, command: &str, dir: &Path) -> BuildResult<String> {
        info!(%step, command, dir = %dir.display(), "running external step");
        let script = format!("exec 2>&1\n{}", command);
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::ExternalTool {
                step,
                code: None,
                output: format!("failed to start sh: {}", e),
            })?;

        let mut output = String::new();
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\n', '\r']);
                        if !self.quiet {
                            ui::indent(line);
                        }
                        output.push_str(line);
                        output.push('\n');
                    }
                    Err(e) => {
                        debug!(error = %e, "output stream closed early");
                        break;
                    }
                }
            }
        }

        let status = child.wait().map_err(|e| BuildError::ExternalTool {
            step,
            code: None,
            output: format!("{}failed to wait for {}: {}", output, step, e),
        })?;

        if status.success() {
            Ok(output)
        } else {
            Err(BuildError::ExternalTool {
                step,
                code: status.code(),
                output,
            })
        }
    }
}
