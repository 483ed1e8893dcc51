/// Errors that can occur in command-server sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The subprocess could not be spawned or reaped.
    #[error("process error: {0}")]
    Process(#[from] hgpipe_process::ProcessError),

    /// The server wrote to stderr (or exited) before completing its
    /// handshake. Carries the raw stderr text for diagnostics.
    #[error("command server failed to start: {stderr}")]
    StartupFailed { stderr: String },

    /// The startup banner matched neither accepted format. Carries the raw
    /// banner text for diagnostics.
    #[error("unrecognized command server banner: {banner:?}")]
    HandshakeParse { banner: String },

    /// The spawner handed back a child missing one of its stdio pipes.
    #[error("child process stdio was not piped")]
    StdioUnavailable,

    /// `start` was called on a session that already ran.
    #[error("session already started")]
    AlreadyStarted,

    /// A command was issued outside the running state.
    #[error("session is not running")]
    NotRunning,

    /// The command name was not advertised in the handshake capabilities.
    #[error("command {0:?} not advertised by the server")]
    UnsupportedCommand(String),

    /// A command is already awaiting its result; the protocol is
    /// single-command-at-a-time over one pipe.
    #[error("another command is already in flight")]
    CommandInFlight,

    /// The server reported a command failure on its error channel (or wrote
    /// to stderr mid-command). Carries the raw diagnostic text.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// The server exited before reporting a result for the in-flight
    /// command.
    #[error("command server exited before reporting a result")]
    UnexpectedExit,

    /// Frame-level protocol violation (malformed frame, unknown channel,
    /// unencodable command).
    #[error("frame error: {0}")]
    Frame(#[from] hgpipe_frame::FrameError),

    /// An I/O error on the server's stdin.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
