/// Errors that can occur in repository operations.
#[derive(Debug, thiserror::Error)]
pub enum HgError {
    /// Command-server session error (spawn, handshake, protocol, or a
    /// failed command).
    #[error("session error: {0}")]
    Session(#[from] hgpipe_session::SessionError),

    /// A one-shot `hg` invocation exited non-zero. Carries the raw stderr.
    #[error("hg {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Command output did not have the expected shape.
    #[error("unable to parse command output: {0}")]
    Parse(String),

    /// JSON deserialization of templated output failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error outside the subprocess pipes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HgError>;
