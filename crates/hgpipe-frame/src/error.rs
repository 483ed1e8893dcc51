/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer ended before a complete frame could be decoded.
    #[error("malformed frame: needed {needed} bytes, only {available} available")]
    MalformedFrame { needed: usize, available: usize },

    /// The channel tag is not one of `o`, `r`, `e`, `d`.
    #[error("unknown channel tag 0x{0:02x}")]
    UnknownChannel(u8),

    /// A command name or argument cannot be represented on the wire.
    #[error("encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
