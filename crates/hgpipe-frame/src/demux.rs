//! Channel demultiplexing: turn an ordered message sequence into logical
//! events.
//!
//! The server may split one logical burst of output across many frames (one
//! per source line is common). Callers want one event per coherent burst, so
//! contiguous same-channel messages are grouped and their bodies joined.

use crate::channel::Channel;
use crate::codec::Message;

/// A maximal run of consecutive same-channel messages, delivered as one
/// logical event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    /// The channel shared by every member.
    pub channel: Channel,
    /// The raw messages in arrival order.
    pub messages: Vec<Message>,
}

impl ChannelGroup {
    /// Member text bodies joined with newlines.
    pub fn body(&self) -> String {
        let texts: Vec<&str> = self.messages.iter().map(Message::text).collect();
        texts.join("\n")
    }

    /// The return code, for result groups. A result group is almost always a
    /// single frame; if the server ever sends several, the last one wins.
    pub fn return_code(&self) -> Option<i32> {
        self.messages.iter().rev().find_map(Message::return_code)
    }
}

/// Group an ordered message sequence into per-channel events.
///
/// Consecutive messages on the same channel accumulate into one group; a
/// channel change closes the current group; the trailing group is closed at
/// the end of the sequence. An empty sequence yields no groups.
pub fn group_by_channel(messages: Vec<Message>) -> Vec<ChannelGroup> {
    let mut groups = Vec::new();
    let mut current: Option<ChannelGroup> = None;

    for message in messages {
        match current.as_mut() {
            Some(group) if group.channel == message.channel => {
                group.messages.push(message);
            }
            _ => {
                if let Some(done) = current.take() {
                    groups.push(done);
                }
                current = Some(ChannelGroup {
                    channel: message.channel,
                    messages: vec![message],
                });
            }
        }
    }

    if let Some(done) = current {
        groups.push(done);
    }

    groups
}
