//! Session-directory watcher.
//!
//! Scans a sessions directory for `*.jsonl` files, tails each one in its own
//! task, and picks up files that appear after startup. A failing per-file
//! tailer is logged and dropped without affecting its siblings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::sync::{mpsc, watch};

use crate::tailer::{sleep_or_shutdown, tail_file, TailerConfig};
use crate::WatchError;

#[derive(Debug, Clone)]
/// Public struct `SessionWatcherConfig` describing one watched directory.
pub struct SessionWatcherConfig {
    pub sessions_dir: PathBuf,
    pub poll_interval: Duration,
}

/// Watches the sessions directory until shutdown, forwarding every complete
/// line from every active session file over `lines`.
pub async fn watch_session_dir(
    config: SessionWatcherConfig,
    shutdown: watch::Receiver<bool>,
    lines: mpsc::UnboundedSender<String>,
) -> Result<(), WatchError> {
    let mut known: HashSet<PathBuf> = HashSet::new();
    let mut first_scan = true;
    let mut scan_shutdown = shutdown.clone();

    loop {
        if *scan_shutdown.borrow() {
            return Ok(());
        }

        let mut entries =
            fs::read_dir(&config.sessions_dir)
                .await
                .map_err(|source| WatchError::Scan {
                    path: config.sessions_dir.clone(),
                    source,
                })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| WatchError::Scan {
                path: config.sessions_dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            if !is_session_file(&path) || known.contains(&path) {
                continue;
            }
            known.insert(path.clone());
            if !first_scan {
                tracing::info!(file = %path.display(), "new session file, tailing");
            }
            spawn_session_tailer(
                TailerConfig {
                    path,
                    poll_interval: config.poll_interval,
                    // Files already present at startup tail from the end;
                    // files appearing later are read whole so their first
                    // lines are not lost to poll timing.
                    read_from_start: !first_scan,
                },
                shutdown.clone(),
                lines.clone(),
            );
        }
        first_scan = false;

        if sleep_or_shutdown(&mut scan_shutdown, config.poll_interval).await {
            return Ok(());
        }
    }
}

fn spawn_session_tailer(
    config: TailerConfig,
    shutdown: watch::Receiver<bool>,
    lines: mpsc::UnboundedSender<String>,
) {
    let path = config.path.clone();
    tokio::spawn(async move {
        if let Err(error) = tail_file(config, shutdown, lines).await {
            tracing::warn!(file = %path.display(), %error, "session tailer terminated");
        }
    });
}

fn is_session_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.ends_with(".jsonl") && !name.contains(".deleted.")
}
