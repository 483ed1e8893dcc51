use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::error::{ProcessError, Result};
use crate::traits::{ChildHandle, SpawnSpec, Spawner};

/// The production [`Spawner`], backed by `std::process::Command`.
///
/// All three stdio streams are piped. The child inherits the parent
/// environment with the spec's overrides applied on top.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdSpawner;

impl Spawner for StdSpawner {
    fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ChildHandle>> {
        debug!(program = %spec.program, cwd = %spec.cwd.display(), "spawning subprocess");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: spec.program.clone(),
                cwd: spec.cwd.clone(),
                source,
            })?;

        Ok(Box::new(StdChild { child }))
    }
}

struct StdChild {
    child: Child,
}

impl ChildHandle for StdChild {
    fn take_stdin(&mut self) -> Option<Box<dyn Write + Send>> {
        self.child
            .stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn Write + Send>)
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn wait(&mut self) -> Result<Option<i32>> {
        let status = self.child.wait().map_err(ProcessError::Wait)?;
        Ok(status.code())
    }

    fn kill(&mut self) -> Result<()> {
        // Already-exited children report InvalidInput; that is not a failure.
        match self.child.kill() {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(err) => Err(ProcessError::Io(err)),
        }
    }
}
