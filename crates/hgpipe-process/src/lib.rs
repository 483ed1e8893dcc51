//! Subprocess spawning abstraction.
//!
//! Provides the seam between the protocol session and the operating system:
//! a [`Spawner`] launches a program and hands back a [`ChildHandle`] exposing
//! its stdio streams and exit notification.
//!
//! This is the lowest layer of hgpipe. The session crate drives the child
//! through these traits and never touches `std::process` directly, which is
//! what lets tests substitute a scripted child for the real `hg` binary.

pub mod error;
pub mod spawn;
pub mod traits;

pub use error::{ProcessError, Result};
pub use spawn::StdSpawner;
pub use traits::{ChildHandle, SpawnSpec, Spawner};
