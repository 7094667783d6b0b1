//! claw-stream: tails agent runtime activity sources and relays normalized
//! events to a chat channel through a rate-limited delivery queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tokio::sync::{mpsc, watch};

use claw_events::{parse_log_line, parse_session_line};
use claw_gateway::{serve_gateway, GatewayState};
use claw_relay::{spawn_drain, ActivitySink, DiscordSink, StreamContext, WebhookSink};
use claw_watcher::{tail_file, watch_session_dir, SessionWatcherConfig, TailerConfig};

mod bootstrap_helpers;
mod cli_args;

use cli_args::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap_helpers::init_tracing();
    let args = CliArgs::parse();
    run(args).await
}

async fn run(args: CliArgs) -> Result<()> {
    let sink = build_sink(&args)?;
    let context = Arc::new(StreamContext::new(
        args.max_posts_per_minute,
        Duration::from_millis(args.post_delay_ms),
        !args.start_paused,
    ));
    let state = Arc::new(GatewayState {
        context: context.clone(),
        sink: sink.clone(),
        webhook_secret: args.webhook_secret.clone(),
    });
    let poll_interval = Duration::from_millis(args.poll_interval_ms);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    println!(
        "claw activity stream starting: port={} rate_limit={}/min post_delay_ms={}{}",
        args.port,
        args.max_posts_per_minute,
        args.post_delay_ms,
        if args.start_paused { " (paused)" } else { "" }
    );
    if let Some(path) = &args.log_path {
        println!("tailing gateway log: path={}", path.display());
    }
    if let Some(dir) = &args.sessions_dir {
        println!("watching session directory: path={}", dir.display());
    }

    let log_pipeline = {
        let context = context.clone();
        let sink = sink.clone();
        let shutdown = shutdown_rx.clone();
        let log_path = args.log_path.clone();
        async move {
            match log_path {
                Some(path) => {
                    run_log_pipeline(path, poll_interval, context, sink, shutdown).await
                }
                None => std::future::pending::<Result<()>>().await,
            }
        }
    };

    let session_pipeline = {
        let context = context.clone();
        let sink = sink.clone();
        let shutdown = shutdown_rx.clone();
        let sessions_dir = args.sessions_dir.clone();
        async move {
            match sessions_dir {
                Some(dir) => {
                    run_session_pipeline(dir, poll_interval, context, sink, shutdown).await
                }
                None => std::future::pending::<Result<()>>().await,
            }
        }
    };

    tokio::select! {
        result = serve_gateway(args.port, state) => result,
        // A dead log tailer in single-file mode is fatal; sibling session
        // tailers handle their own failures without reaching this select.
        result = log_pipeline => result.context("gateway log watcher failed"),
        result = session_pipeline => result.context("session watcher failed"),
        _ = tokio::signal::ctrl_c() => {
            let _ = shutdown_tx.send(true);
            println!("stopped tailing activity sources");
            Ok(())
        }
    }
}

fn build_sink(args: &CliArgs) -> Result<Arc<dyn ActivitySink>> {
    if let Some(url) = &args.discord_webhook_url {
        return Ok(Arc::new(DiscordSink::new(url.clone())?));
    }
    if let Some(url) = &args.webhook_url {
        return Ok(Arc::new(WebhookSink::new(
            url.clone(),
            args.webhook_secret.clone(),
        )?));
    }
    bail!("no delivery target configured: set --discord-webhook-url or --webhook-url");
}

async fn run_log_pipeline(
    path: PathBuf,
    poll_interval: Duration,
    context: Arc<StreamContext>,
    sink: Arc<dyn ActivitySink>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let config = TailerConfig {
        path: path.clone(),
        poll_interval,
        read_from_start: false,
    };
    let tailer = tokio::spawn(tail_file(config, shutdown, lines_tx));

    while let Some(line) = lines_rx.recv().await {
        if let Some(event) = parse_log_line(&line) {
            context.enqueue(event).await;
            spawn_drain(context.clone(), sink.clone());
        }
    }

    match tailer.await {
        Ok(result) => {
            result.with_context(|| format!("log tailer for {} failed", path.display()))
        }
        Err(error) => Err(anyhow!("log tailer task panicked: {error}")),
    }
}

async fn run_session_pipeline(
    sessions_dir: PathBuf,
    poll_interval: Duration,
    context: Arc<StreamContext>,
    sink: Arc<dyn ActivitySink>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let config = SessionWatcherConfig {
        sessions_dir: sessions_dir.clone(),
        poll_interval,
    };
    let watcher = tokio::spawn(watch_session_dir(config, shutdown, lines_tx));

    while let Some(line) = lines_rx.recv().await {
        match parse_session_line(&line) {
            Ok(Some(event)) => {
                context.enqueue(event).await;
                spawn_drain(context.clone(), sink.clone());
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, "skipping malformed session line"),
        }
    }

    match watcher.await {
        Ok(result) => result.with_context(|| {
            format!("session watcher for {} failed", sessions_dir.display())
        }),
        Err(error) => Err(anyhow!("session watcher task panicked: {error}")),
    }
}
