//! Tests for file tailing and session-directory discovery.

use std::io::Write;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use super::{tail_file, watch_session_dir, SessionWatcherConfig, TailerConfig};

const POLL: Duration = Duration::from_millis(10);
const RECV_DEADLINE: Duration = Duration::from_secs(2);

fn tail_setup() -> (
    watch::Sender<bool>,
    watch::Receiver<bool>,
    mpsc::UnboundedSender<String>,
    mpsc::UnboundedReceiver<String>,
) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    (shutdown_tx, shutdown_rx, lines_tx, lines_rx)
}

async fn recv_line(lines: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(RECV_DEADLINE, lines.recv())
        .await
        .expect("line within deadline")
        .expect("channel open")
}

#[tokio::test]
async fn forwards_appended_complete_lines_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gateway.err.log");
    std::fs::write(&path, "old line before tail\n").expect("seed file");

    let (shutdown_tx, shutdown_rx, lines_tx, mut lines_rx) = tail_setup();
    let config = TailerConfig {
        path: path.clone(),
        poll_interval: POLL,
        read_from_start: false,
    };
    let tailer = tokio::spawn(tail_file(config, shutdown_rx, lines_tx));

    // Give the tailer a moment to seek past the seeded content.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open for append");
    writeln!(file, "first").expect("append");
    writeln!(file, "second").expect("append");
    file.flush().expect("flush");

    assert_eq!(recv_line(&mut lines_rx).await, "first");
    assert_eq!(recv_line(&mut lines_rx).await, "second");

    shutdown_tx.send(true).expect("signal shutdown");
    timeout(RECV_DEADLINE, tailer)
        .await
        .expect("tailer exits")
        .expect("tailer task")
        .expect("tailer result");
}

#[tokio::test]
async fn withholds_partial_line_until_newline_arrives() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gateway.err.log");
    std::fs::write(&path, "").expect("seed file");

    let (shutdown_tx, shutdown_rx, lines_tx, mut lines_rx) = tail_setup();
    let config = TailerConfig {
        path: path.clone(),
        poll_interval: POLL,
        read_from_start: false,
    };
    let tailer = tokio::spawn(tail_file(config, shutdown_rx, lines_tx));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open for append");
    write!(file, "partial").expect("append");
    file.flush().expect("flush");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(lines_rx.try_recv().is_err(), "partial line must not leak");

    writeln!(file).expect("terminate line");
    file.flush().expect("flush");
    assert_eq!(recv_line(&mut lines_rx).await, "partial");

    shutdown_tx.send(true).expect("signal shutdown");
    let _ = timeout(RECV_DEADLINE, tailer).await.expect("tailer exits");
}

#[tokio::test]
async fn tails_file_that_appears_after_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("late.log");

    let (shutdown_tx, shutdown_rx, lines_tx, mut lines_rx) = tail_setup();
    let config = TailerConfig {
        path: path.clone(),
        poll_interval: POLL,
        read_from_start: true,
    };
    let tailer = tokio::spawn(tail_file(config, shutdown_rx, lines_tx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    std::fs::write(&path, "born late\n").expect("create file");

    assert_eq!(recv_line(&mut lines_rx).await, "born late");

    shutdown_tx.send(true).expect("signal shutdown");
    let _ = timeout(RECV_DEADLINE, tailer).await.expect("tailer exits");
}

#[tokio::test]
async fn follows_file_recreated_at_the_same_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gateway.err.log");
    std::fs::write(&path, "").expect("seed file");

    let (shutdown_tx, shutdown_rx, lines_tx, mut lines_rx) = tail_setup();
    let config = TailerConfig {
        path: path.clone(),
        poll_interval: POLL,
        read_from_start: false,
    };
    let tailer = tokio::spawn(tail_file(config, shutdown_rx, lines_tx));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open for append");
    writeln!(file, "before rotation, long enough to dwarf the new file")
        .expect("append");
    file.flush().expect("flush");
    drop(file);
    assert_eq!(
        recv_line(&mut lines_rx).await,
        "before rotation, long enough to dwarf the new file"
    );

    // Rotate: a fresh file replaces the path; the stale handle must not be
    // followed.
    std::fs::remove_file(&path).expect("remove rotated file");
    std::fs::write(&path, "after rotation\n").expect("recreate file");

    assert_eq!(recv_line(&mut lines_rx).await, "after rotation");

    shutdown_tx.send(true).expect("signal shutdown");
    let _ = timeout(RECV_DEADLINE, tailer).await.expect("tailer exits");
}

#[tokio::test]
async fn session_watcher_picks_up_new_files_and_skips_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("a.deleted.jsonl"), "{\"skip\":true}\n")
        .expect("seed deleted file");
    std::fs::write(dir.path().join("notes.txt"), "not jsonl\n").expect("seed text file");

    let (shutdown_tx, shutdown_rx, lines_tx, mut lines_rx) = tail_setup();
    let config = SessionWatcherConfig {
        sessions_dir: dir.path().to_path_buf(),
        poll_interval: POLL,
    };
    let watcher = tokio::spawn(watch_session_dir(config, shutdown_rx, lines_tx));

    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(dir.path().join("s1.jsonl"), "{\"type\":\"heartbeat\"}\n")
        .expect("create session file");

    assert_eq!(recv_line(&mut lines_rx).await, "{\"type\":\"heartbeat\"}");
    assert!(
        lines_rx.try_recv().is_err(),
        "deleted/non-jsonl files must not be tailed"
    );

    shutdown_tx.send(true).expect("signal shutdown");
    timeout(RECV_DEADLINE, watcher)
        .await
        .expect("watcher exits")
        .expect("watcher task")
        .expect("watcher result");
}

#[tokio::test]
async fn missing_sessions_dir_surfaces_scan_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent");

    let (_shutdown_tx, shutdown_rx, lines_tx, _lines_rx) = tail_setup();
    let config = SessionWatcherConfig {
        sessions_dir: missing,
        poll_interval: POLL,
    };
    let result = watch_session_dir(config, shutdown_rx, lines_tx).await;
    assert!(matches!(result, Err(super::WatchError::Scan { .. })));
}
