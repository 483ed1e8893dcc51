//! Text encodings negotiated in the command-server handshake.

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Encoding applied to frame payloads and command arguments.
///
/// The session forces `HGENCODING=UTF-8` on the subprocess, so UTF-8 is the
/// steady state; Latin-1 covers servers that report it anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    /// Map a handshake encoding label to an encoding.
    ///
    /// Returns `None` for labels this client cannot decode.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" | "ascii" | "us-ascii" => Some(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(TextEncoding::Latin1),
            _ => None,
        }
    }

    /// Decode payload bytes to text, stripping embedded NULs.
    ///
    /// Invalid UTF-8 sequences decode as replacement characters rather than
    /// failing: payload text is diagnostic output, not protocol structure.
    pub fn decode(self, bytes: &[u8]) -> String {
        let text = match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        };

        if text.contains('\0') {
            text.replace('\0', "")
        } else {
            text
        }
    }

    /// Encode text into `dst`, failing if a character is unrepresentable.
    pub fn encode(self, text: &str, dst: &mut BytesMut) -> Result<()> {
        match self {
            TextEncoding::Utf8 => {
                dst.put_slice(text.as_bytes());
                Ok(())
            }
            TextEncoding::Latin1 => {
                for ch in text.chars() {
                    let code = ch as u32;
                    if code > 0xFF {
                        return Err(FrameError::Encoding(format!(
                            "character {ch:?} not representable in latin-1"
                        )));
                    }
                    dst.put_u8(code as u8);
                }
                Ok(())
            }
        }
    }
}
