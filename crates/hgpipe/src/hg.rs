//! Operations that happen outside an existing repository.

use std::path::Path;

use crate::error::Result;
use crate::parsers;
use crate::repo::Repo;
use crate::runner::Runner;

/// Entry point for clone/create/version, the tasks the command server
/// cannot bootstrap itself.
#[derive(Debug, Clone, Default)]
pub struct Hg {
    runner: Runner,
}

impl Hg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific binary name or path.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            runner: Runner::with_binary(binary),
        }
    }

    /// Clone `source` into `dest` and bind the resulting repository.
    pub fn clone_repo(&self, source: &str, dest: impl AsRef<Path>) -> Result<Repo> {
        let dest = dest.as_ref();
        let dest_arg = dest.to_string_lossy();
        self.runner
            .run(&["clone", source, dest_arg.as_ref()], None)?;
        Ok(Repo::open(dest))
    }

    /// Create a fresh repository at `path` and bind it.
    pub fn create(&self, path: impl AsRef<Path>) -> Result<Repo> {
        Repo::init(path.as_ref())
    }

    /// Version of the Mercurial binary.
    pub fn version(&self) -> Result<String> {
        let output = self.runner.run(&["--version"], None)?;
        parsers::version(&output)
    }
}
