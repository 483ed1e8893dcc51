use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::channel::Channel;
use crate::encoding::TextEncoding;
use crate::error::{FrameError, Result};

/// Frame header: channel tag (1) + payload length (4, big-endian) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// One decoded unit from the server's stdout stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The channel this message arrived on.
    pub channel: Channel,
    /// Declared payload length in bytes.
    pub length: u32,
    /// The decoded payload.
    pub body: MessageBody,
}

/// Payload of a [`Message`]: text for `o`/`e`/`d`, a return code for `r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    ReturnCode(i32),
}

impl Message {
    /// The text body, or the empty string for a result message.
    pub fn text(&self) -> &str {
        match &self.body {
            MessageBody::Text(text) => text,
            MessageBody::ReturnCode(_) => "",
        }
    }

    /// The return code, if this is a result message.
    pub fn return_code(&self) -> Option<i32> {
        match self.body {
            MessageBody::ReturnCode(code) => Some(code),
            MessageBody::Text(_) => None,
        }
    }
}

/// Encode a command for the server's stdin.
///
/// Wire format:
/// ```text
/// <name> "\n" <argLength: u32 BE> <arg1> "\0" <arg2> "\0" ... <argN>
/// ```
/// Only the argument block is length-prefixed; the command name is
/// newline-terminated. Fails with [`FrameError::Encoding`] if the name or an
/// argument cannot be represented on the wire: unrepresentable characters, a
/// NUL inside an argument, or a newline inside the name. Either would
/// corrupt the framing.
pub fn encode_command(
    name: &str,
    args: &[String],
    encoding: TextEncoding,
    dst: &mut BytesMut,
) -> Result<()> {
    if name.is_empty() || name.contains('\n') || name.contains('\0') {
        return Err(FrameError::Encoding(format!(
            "invalid command name {name:?}"
        )));
    }

    let mut payload = BytesMut::new();
    for (i, arg) in args.iter().enumerate() {
        if arg.contains('\0') {
            return Err(FrameError::Encoding(format!(
                "argument {arg:?} contains a NUL byte"
            )));
        }
        if i > 0 {
            payload.put_u8(0);
        }
        encoding.encode(arg, &mut payload)?;
    }

    encoding.encode(name, dst)?;
    dst.put_u8(b'\n');
    dst.put_u32(payload.len() as u32);
    dst.put_slice(&payload);
    Ok(())
}

/// Decode one message starting at `offset`.
///
/// Returns the message and the number of bytes consumed (`5 + length`).
/// Fails with [`FrameError::MalformedFrame`] if fewer than 5 header bytes or
/// fewer than `length` payload bytes remain; nothing is consumed on failure.
pub fn decode_message(
    buf: &[u8],
    offset: usize,
    encoding: TextEncoding,
) -> Result<(Message, usize)> {
    let available = buf.len().saturating_sub(offset);
    if available < HEADER_SIZE {
        return Err(FrameError::MalformedFrame {
            needed: HEADER_SIZE,
            available,
        });
    }

    let channel = Channel::from_tag(buf[offset])?;
    let length = u32::from_be_bytes(
        buf[offset + 1..offset + HEADER_SIZE]
            .try_into()
            .expect("slice is exactly 4 bytes"),
    );

    let needed = HEADER_SIZE + length as usize;
    if available < needed {
        return Err(FrameError::MalformedFrame { needed, available });
    }

    let payload = &buf[offset + HEADER_SIZE..offset + needed];
    let body = match channel {
        Channel::Result => {
            if payload.len() < 4 {
                return Err(FrameError::MalformedFrame {
                    needed: HEADER_SIZE + 4,
                    available: HEADER_SIZE + payload.len(),
                });
            }
            MessageBody::ReturnCode(i32::from_be_bytes(
                payload[..4].try_into().expect("slice is exactly 4 bytes"),
            ))
        }
        _ => MessageBody::Text(encoding.decode(payload)),
    };

    Ok((
        Message {
            channel,
            length,
            body,
        },
        needed,
    ))
}

/// Decode every message in a chunk, in order.
///
/// One pass per chunk: decoding starts at offset 0 and advances by each
/// message's consumed size until the buffer is exhausted. A malformed or
/// unknown-channel frame anywhere fails the whole chunk.
pub fn decode_chunk(buf: &[u8], encoding: TextEncoding) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let (message, consumed) = decode_message(buf, offset, encoding)?;
        offset += consumed;
        messages.push(message);
    }

    trace!(count = messages.len(), bytes = buf.len(), "decoded chunk");
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn encode_command_wire_bytes() {
        let mut buf = BytesMut::new();
        encode_command(
            "runcommand",
            &["log".to_string(), "-l".to_string(), "5".to_string()],
            TextEncoding::Utf8,
            &mut buf,
        )
        .unwrap();

        let mut expected = b"runcommand\n".to_vec();
        expected.extend_from_slice(&8u32.to_be_bytes());
        expected.extend_from_slice(b"log\0-l\05");
        assert_eq!(buf.as_ref(), expected.as_slice());
    }

    #[test]
    fn encode_command_no_args() {
        let mut buf = BytesMut::new();
        encode_command("getencoding", &[], TextEncoding::Utf8, &mut buf).unwrap();

        let mut expected = b"getencoding\n".to_vec();
        expected.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(buf.as_ref(), expected.as_slice());
    }

    #[test]
    fn encode_rejects_nul_in_argument() {
        let mut buf = BytesMut::new();
        let err = encode_command(
            "runcommand",
            &["bad\0arg".to_string()],
            TextEncoding::Utf8,
            &mut buf,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::Encoding(_)));
    }

    #[test]
    fn encode_rejects_newline_in_name() {
        let mut buf = BytesMut::new();
        let err = encode_command("run\ncommand", &[], TextEncoding::Utf8, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::Encoding(_)));
    }

    #[test]
    fn text_frame_roundtrip() {
        for tag in [b'o', b'e', b'd'] {
            let wire = frame(tag, "two lines\nof output".as_bytes());
            let (msg, consumed) = decode_message(&wire, 0, TextEncoding::Utf8).unwrap();

            assert_eq!(consumed, wire.len());
            assert_eq!(msg.channel.tag(), tag);
            assert_eq!(msg.length as usize, "two lines\nof output".len());
            assert_eq!(msg.text(), "two lines\nof output");
        }
    }

    #[test]
    fn result_frame_boundary_codes() {
        for code in [0, 1, -1, i32::MAX, i32::MIN] {
            let wire = frame(b'r', &code.to_be_bytes());
            let (msg, consumed) = decode_message(&wire, 0, TextEncoding::Utf8).unwrap();

            assert_eq!(consumed, 9);
            assert_eq!(msg.channel, Channel::Result);
            assert_eq!(msg.return_code(), Some(code));
        }
    }

    #[test]
    fn decode_strips_embedded_nuls() {
        let wire = frame(b'o', b"a\0b");
        let (msg, _) = decode_message(&wire, 0, TextEncoding::Utf8).unwrap();
        assert_eq!(msg.text(), "ab");
        // The declared length still counts the raw payload bytes.
        assert_eq!(msg.length, 3);
    }

    #[test]
    fn short_header_is_malformed() {
        let err = decode_message(&[b'o', 0, 0], 0, TextEncoding::Utf8).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MalformedFrame {
                needed: HEADER_SIZE,
                available: 3
            }
        ));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut wire = frame(b'o', b"hello");
        wire.truncate(HEADER_SIZE + 2);

        let err = decode_message(&wire, 0, TextEncoding::Utf8).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MalformedFrame {
                needed: 10,
                available: 7
            }
        ));
    }

    #[test]
    fn unknown_channel_tag_rejected() {
        let wire = frame(b'x', b"?");
        let err = decode_message(&wire, 0, TextEncoding::Utf8).unwrap_err();
        assert!(matches!(err, FrameError::UnknownChannel(b'x')));
    }

    #[test]
    fn chunk_with_multiple_messages() {
        let mut wire = frame(b'o', b"changeset: 0:abc");
        wire.extend(frame(b'o', b"summary: init"));
        wire.extend(frame(b'r', &0i32.to_be_bytes()));

        let messages = decode_chunk(&wire, TextEncoding::Utf8).unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text(), "changeset: 0:abc");
        assert_eq!(messages[1].text(), "summary: init");
        assert_eq!(messages[2].return_code(), Some(0));
    }

    #[test]
    fn empty_chunk_yields_no_messages() {
        assert!(decode_chunk(&[], TextEncoding::Utf8).unwrap().is_empty());
    }

    #[test]
    fn chunk_with_malformed_tail_fails() {
        let mut wire = frame(b'o', b"good");
        wire.extend_from_slice(&[b'o', 0, 0]);

        let err = decode_chunk(&wire, TextEncoding::Utf8).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame { .. }));
    }

    #[test]
    fn empty_payload_text_frame() {
        let wire = frame(b'o', b"");
        let (msg, consumed) = decode_message(&wire, 0, TextEncoding::Utf8).unwrap();
        assert_eq!(consumed, HEADER_SIZE);
        assert_eq!(msg.text(), "");
        assert_eq!(msg.length, 0);
    }
}
