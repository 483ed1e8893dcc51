//! One-shot command runner.
//!
//! Some operations cannot go through the command server, because the server
//! itself needs an existing repository to start in (`init`, `clone`). Those
//! spawn the binary once per call and capture its output.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{HgError, Result};

/// Runs the Mercurial binary once per call.
#[derive(Debug, Clone)]
pub struct Runner {
    binary: String,
}

impl Default for Runner {
    fn default() -> Self {
        Self::with_binary("hg")
    }
}

impl Runner {
    /// Use a specific binary name or path.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run the binary with `args`, optionally in `cwd`, and return its
    /// stdout. A non-zero exit fails with the captured stderr.
    pub fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        debug!(binary = %self.binary, ?args, "one-shot invocation");

        let mut command = Command::new(&self.binary);
        command.args(args);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = command.output()?;
        if !output.status.success() {
            return Err(HgError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
