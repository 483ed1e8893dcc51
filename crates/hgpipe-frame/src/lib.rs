//! Wire framing and channel demultiplexing for the Mercurial command server.
//!
//! This is the core value-add layer of hgpipe. Every message the server
//! emits is framed with:
//! - A 1-byte channel tag (`o`utput, `r`esult, `e`rror, `d`ebug)
//! - A 4-byte big-endian payload length
//!
//! The `result` channel carries a signed 32-bit big-endian return code;
//! every other channel carries text in the session's negotiated encoding.
//! Commands travel the other way as `<name>\n` followed by a length-prefixed
//! NUL-joined argument block.
//!
//! No partial decodes: a message either comes out whole or the chunk fails.

pub mod channel;
pub mod codec;
pub mod demux;
pub mod encoding;
pub mod error;

pub use channel::Channel;
pub use codec::{decode_chunk, decode_message, encode_command, Message, MessageBody, HEADER_SIZE};
pub use demux::{group_by_channel, ChannelGroup};
pub use encoding::TextEncoding;
pub use error::{FrameError, Result};
