//! Single-file tailer.
//!
//! Polls an append-only file for newly written bytes, buffering any trailing
//! partial line until its newline arrives. Tolerates files that do not exist
//! yet and restarts from the top when the file shrinks (rotation).

use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};

use crate::WatchError;

#[derive(Debug, Clone)]
/// Public struct `TailerConfig` describing one tailed file.
pub struct TailerConfig {
    pub path: PathBuf,
    pub poll_interval: Duration,
    /// Read existing content instead of seeking to the end first. Used for
    /// files that appeared after the watcher started.
    pub read_from_start: bool,
}

/// Tails `config.path` until shutdown, sending each complete non-empty line.
///
/// Returns `Ok(())` on shutdown or when the receiver side is dropped;
/// returns `WatchError` on I/O failure so the caller decides whether the
/// failure is fatal (single-file mode) or isolated (session mode).
pub async fn tail_file(
    config: TailerConfig,
    mut shutdown: watch::Receiver<bool>,
    lines: mpsc::UnboundedSender<String>,
) -> Result<(), WatchError> {
    let mut file: Option<File> = None;
    let mut position: u64 = 0;
    let mut pending = String::new();
    // Existing content is skipped only for the file present at startup;
    // anything appearing at the path afterwards is read whole.
    let mut skip_existing = !config.read_from_start;

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        // Stat the path, not the open handle: rename-based rotation leaves
        // the handle on a stale inode while a new file takes the path.
        let len = match tokio::fs::metadata(&config.path).await {
            Ok(metadata) => metadata.len(),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                if file.is_some() {
                    tracing::warn!(
                        file = %config.path.display(),
                        "file disappeared, waiting for it to return"
                    );
                    file = None;
                    position = 0;
                    pending.clear();
                    skip_existing = false;
                }
                if sleep_or_shutdown(&mut shutdown, config.poll_interval).await {
                    return Ok(());
                }
                continue;
            }
            Err(source) => {
                return Err(WatchError::Read {
                    path: config.path.clone(),
                    source,
                })
            }
        };
        if len < position {
            tracing::warn!(file = %config.path.display(), "file shrank, restarting from top");
            file = None;
            position = 0;
            pending.clear();
        }

        if file.is_none() {
            match File::open(&config.path).await {
                Ok(mut handle) => {
                    if skip_existing {
                        position = handle.seek(SeekFrom::End(0)).await.map_err(|source| {
                            WatchError::Read {
                                path: config.path.clone(),
                                source,
                            }
                        })?;
                    }
                    skip_existing = false;
                    file = Some(handle);
                }
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    if sleep_or_shutdown(&mut shutdown, config.poll_interval).await {
                        return Ok(());
                    }
                    continue;
                }
                Err(source) => {
                    return Err(WatchError::Open {
                        path: config.path.clone(),
                        source,
                    })
                }
            }
        }
        let Some(handle) = file.as_mut() else {
            continue;
        };

        let mut chunk = Vec::new();
        let read = handle
            .read_to_end(&mut chunk)
            .await
            .map_err(|source| WatchError::Read {
                path: config.path.clone(),
                source,
            })?;
        if read > 0 {
            position += read as u64;
            pending.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(newline) = pending.find('\n') {
                let line: String = pending.drain(..=newline).collect();
                let line = line.trim_end_matches(['\n', '\r']);
                if line.trim().is_empty() {
                    continue;
                }
                if lines.send(line.to_string()).is_err() {
                    return Ok(());
                }
            }
        }

        if sleep_or_shutdown(&mut shutdown, config.poll_interval).await {
            return Ok(());
        }
    }
}

/// Sleeps one poll interval; returns true when shutdown fired instead.
pub(crate) async fn sleep_or_shutdown(
    shutdown: &mut watch::Receiver<bool>,
    interval: Duration,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => false,
        _ = shutdown.changed() => true,
    }
}
