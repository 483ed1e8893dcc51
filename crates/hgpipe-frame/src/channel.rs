//! The four output channels multiplexed over the server's stdout.

use crate::error::{FrameError, Result};

/// Semantic channel of a server message.
///
/// The command server tags every frame with a single-character channel.
/// There are exactly four; anything else is a protocol violation and is
/// rejected rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Normal command output.
    Output,
    /// Command completion, carrying the return code.
    Result,
    /// Error output (bodies starting with "warning" are non-fatal).
    Error,
    /// Debug output, only seen when the server runs with debugging on.
    Debug,
}

impl Channel {
    /// The wire tag byte for this channel.
    pub const fn tag(self) -> u8 {
        match self {
            Channel::Output => b'o',
            Channel::Result => b'r',
            Channel::Error => b'e',
            Channel::Debug => b'd',
        }
    }

    /// Map a wire tag byte to a channel.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'o' => Ok(Channel::Output),
            b'r' => Ok(Channel::Result),
            b'e' => Ok(Channel::Error),
            b'd' => Ok(Channel::Debug),
            other => Err(FrameError::UnknownChannel(other)),
        }
    }

    /// Human-readable channel name.
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Output => "output",
            Channel::Result => "result",
            Channel::Error => "error",
            Channel::Debug => "debug",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for chan in [
            Channel::Output,
            Channel::Result,
            Channel::Error,
            Channel::Debug,
        ] {
            assert_eq!(Channel::from_tag(chan.tag()).unwrap(), chan);
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        let err = Channel::from_tag(b'x').unwrap_err();
        assert!(matches!(err, FrameError::UnknownChannel(b'x')));
    }

    #[test]
    fn names() {
        assert_eq!(Channel::Output.name(), "output");
        assert_eq!(Channel::Result.name(), "result");
        assert_eq!(Channel::Error.name(), "error");
        assert_eq!(Channel::Debug.name(), "debug");
    }
}
