//! Append-only source watchers for Claw.
//!
//! Poll-driven file tailers feeding raw lines to the parsers, plus a
//! session-directory watcher that picks up dynamically appearing files.
//! Only complete, newline-terminated lines are ever forwarded.

pub mod session_watcher;
pub mod tailer;

pub use session_watcher::{watch_session_dir, SessionWatcherConfig};
pub use tailer::{tail_file, TailerConfig};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Enumerates supported `WatchError` values.
pub enum WatchError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to scan {}: {source}", path.display())]
    Scan { path: PathBuf, source: io::Error },
}

#[cfg(test)]
mod tests;
