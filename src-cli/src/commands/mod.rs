//! Commands of the `loopshare` command-line front end.
//!
//! This module is organized into submodules by feature area:
//! - `state`: Application state built from the configuration
//! - `error`: Error reporting for commands
//! - `playlist`: Link resolution and playlist management
//! - `subscription`: Plans and subscription billing

mod error;
mod playlist;
mod state;
mod subscription;

pub use error::{CommandError, CommandResult, map_err};
pub use playlist::{add, create, explore, list, play, remove, resolve, share, toggle};
pub use state::AppState;
pub use subscription::{checkout, pause, plans, portal, status};
