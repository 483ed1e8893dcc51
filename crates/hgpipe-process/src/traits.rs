use std::io::{Read, Write};
use std::path::PathBuf;

use crate::error::Result;

/// Everything needed to launch a subprocess: program, arguments, working
/// directory, and environment overrides layered on top of the inherited
/// environment.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl SpawnSpec {
    /// Create a spec with no arguments or environment overrides.
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }
}

/// A running child process with piped stdio.
///
/// The stdio accessors are take-once: the session moves stdout and stderr
/// into reader threads and keeps stdin for itself.
pub trait ChildHandle: Send {
    /// Take the child's stdin. Dropping the returned writer closes the pipe,
    /// which is how the session signals end-of-commands.
    fn take_stdin(&mut self) -> Option<Box<dyn Write + Send>>;

    /// Take the child's stdout.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Take the child's stderr.
    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Block until the child exits. Returns the exit code, or `None` if the
    /// child was terminated by a signal.
    fn wait(&mut self) -> Result<Option<i32>>;

    /// Forcibly terminate the child. Used on abnormal teardown only; the
    /// graceful path closes stdin and waits.
    fn kill(&mut self) -> Result<()>;
}

impl std::fmt::Debug for dyn ChildHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChildHandle")
    }
}

/// Launches subprocesses described by a [`SpawnSpec`].
pub trait Spawner: Send + Sync {
    fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ChildHandle>>;
}
