use std::path::PathBuf;

/// Errors that can occur when spawning or reaping a subprocess.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Failed to launch the program.
    #[error("failed to spawn {program} in {cwd}: {source}")]
    Spawn {
        program: String,
        cwd: PathBuf,
        source: std::io::Error,
    },

    /// Failed to wait for the child to exit.
    #[error("failed to wait for child exit: {0}")]
    Wait(std::io::Error),

    /// An I/O error occurred on one of the child's stdio streams.
    #[error("child I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
