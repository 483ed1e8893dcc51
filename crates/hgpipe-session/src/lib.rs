//! Process session management for the Mercurial command server.
//!
//! This is the "just works" layer over the wire protocol. A
//! [`CommandServer`] spawns `hg serve --cmdserver pipe`, parses the startup
//! banner into capabilities and encoding, then exchanges framed commands and
//! demultiplexed channel events with the subprocess until it is stopped.

pub mod config;
pub mod error;
pub mod handshake;
pub mod session;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use handshake::{parse_banner, Handshake};
pub use session::{CommandOutput, CommandServer, SessionEvent, SessionState};
