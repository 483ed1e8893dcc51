//! Repository handle.
//!
//! Each operation starts a fresh command-server session in the repository's
//! working directory, runs one `runcommand`, and stops the session. The
//! protocol's result frame plus process exit bound exactly one logical
//! command per server, so per-operation servers keep the lifecycle simple.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use hgpipe_session::{CommandOutput, CommandServer, SessionConfig};

use crate::error::Result;
use crate::parsers;
use crate::runner::Runner;

/// A Mercurial repository bound to a working directory.
#[derive(Debug, Clone)]
pub struct Repo {
    path: PathBuf,
    config: SessionConfig,
}

impl Repo {
    /// Bind an existing repository. No validation happens until the first
    /// operation runs.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, SessionConfig::default())
    }

    /// Bind a repository with explicit session configuration.
    pub fn with_config(path: impl Into<PathBuf>, config: SessionConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// Initialize a new repository at `path` and bind it.
    ///
    /// Runs `hg init` as a one-shot invocation: the command server itself
    /// needs an existing repository to start in.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = SessionConfig::default();

        let path_arg = path.to_string_lossy();
        Runner::with_binary(config.hg_binary.clone()).run(&["init", path_arg.as_ref()], None)?;

        debug!(path = %path.display(), "initialized repository");
        Ok(Self { path, config })
    }

    /// The repository's working directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one Mercurial command through a fresh command-server session.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandOutput> {
        let mut session = CommandServer::new(self.config.clone());
        session.start(&self.path)?;
        Ok(session.run_command(args)?)
    }

    fn run_with(&self, command: &str, extra: &[&str]) -> Result<CommandOutput> {
        let mut args = vec![command];
        args.extend_from_slice(extra);
        self.run(&args)
    }

    /// Schedule files for addition. With no paths, adds everything
    /// untracked.
    pub fn add(&self, paths: &[&str]) -> Result<CommandOutput> {
        self.run_with("add", paths)
    }

    /// Schedule files for removal.
    pub fn remove(&self, paths: &[&str]) -> Result<CommandOutput> {
        self.run_with("remove", paths)
    }

    /// Commit outstanding changes.
    pub fn commit(&self, message: &str) -> Result<CommandOutput> {
        self.run(&["commit", "-m", message])
    }

    /// Pull changes, from `source` or the default path.
    pub fn pull(&self, source: Option<&str>) -> Result<CommandOutput> {
        match source {
            Some(source) => self.run(&["pull", source]),
            None => self.run(&["pull"]),
        }
    }

    /// Push changes, to `dest` or the default path.
    pub fn push(&self, dest: Option<&str>) -> Result<CommandOutput> {
        match dest {
            Some(dest) => self.run(&["push", dest]),
            None => self.run(&["push"]),
        }
    }

    /// Update the working directory to the latest changes.
    pub fn update(&self, extra: &[&str]) -> Result<CommandOutput> {
        self.run_with("update", extra)
    }

    /// Merge another head into the working directory.
    pub fn merge(&self, extra: &[&str]) -> Result<CommandOutput> {
        self.run_with("merge", extra)
    }

    /// Resolve merge conflicts.
    pub fn resolve(&self, extra: &[&str]) -> Result<CommandOutput> {
        self.run_with("resolve", extra)
    }

    /// Create a tag.
    pub fn tag(&self, name: &str) -> Result<CommandOutput> {
        self.run(&["tag", name])
    }

    /// List tags as tag name → (revision number, revision hash).
    pub fn tags(&self) -> Result<BTreeMap<String, (u64, String)>> {
        let out = self.run(&["tags"])?;
        parsers::tags(&parsers::text(&out.messages))
    }

    /// Working-directory status as file name → status code.
    pub fn status(&self) -> Result<BTreeMap<String, char>> {
        let out = self.run(&["status"])?;
        parsers::status(&parsers::text(&out.messages))
    }

    /// List branches.
    pub fn branches(&self, extra: &[&str]) -> Result<CommandOutput> {
        self.run_with("branches", extra)
    }

    /// List repository heads.
    pub fn heads(&self) -> Result<CommandOutput> {
        self.run(&["heads"])
    }

    /// Show differences in the working directory.
    pub fn diff(&self, extra: &[&str]) -> Result<CommandOutput> {
        self.run_with("diff", extra)
    }

    /// Repository summary.
    pub fn summary(&self) -> Result<CommandOutput> {
        self.run(&["summary"])
    }

    /// Commit log. `extra` takes flags such as `-l 5` or `-Tjson`.
    pub fn log(&self, extra: &[&str]) -> Result<CommandOutput> {
        self.run_with("log", extra)
    }

    /// Version of the Mercurial binary serving this repository.
    pub fn version(&self) -> Result<String> {
        let out = self.run(&["version"])?;
        parsers::version(&parsers::text(&out.messages))
    }
}
