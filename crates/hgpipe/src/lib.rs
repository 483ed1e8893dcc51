//! Mercurial client library over the command-server pipe protocol.
//!
//! This is the "just works" layer. [`Repo`] binds a working directory and
//! runs repository operations through a fresh command-server session per
//! call; [`Hg`] covers the operations that must happen outside a repository
//! (clone, create); [`parsers`] turns raw command output into typed values.
//!
//! ```no_run
//! use hgpipe::Repo;
//!
//! let repo = Repo::open("/path/to/repo");
//! let log = repo.log(&["-l", "5"])?;
//! println!("{}", log.output);
//! # Ok::<(), hgpipe::HgError>(())
//! ```

pub mod error;
pub mod hg;
pub mod parsers;
pub mod repo;
pub mod runner;

pub use error::{HgError, Result};
pub use hg::Hg;
pub use repo::Repo;
pub use runner::Runner;

pub use hgpipe_frame::{Channel, ChannelGroup, Message, MessageBody};
pub use hgpipe_session::{CommandOutput, CommandServer, SessionConfig, SessionEvent, SessionState};
