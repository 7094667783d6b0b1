use std::path::PathBuf;

use clap::{ArgAction, Parser};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "claw-stream",
    about = "Tails agent runtime logs and relays activity to a chat channel",
    version
)]
pub struct CliArgs {
    /// Outbound webhook endpoint for forwarding activity events.
    #[arg(long = "webhook-url", env = "CLAW_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Shared secret attached to outbound posts and verified on inbound ones.
    #[arg(long = "webhook-secret", env = "CLAW_WEBHOOK_SECRET")]
    pub webhook_secret: Option<String>,

    /// Discord-style webhook URL; takes precedence over --webhook-url.
    #[arg(long = "discord-webhook-url", env = "CLAW_DISCORD_WEBHOOK_URL")]
    pub discord_webhook_url: Option<String>,

    /// Free-text gateway log file to tail.
    #[arg(long = "log-path", env = "CLAW_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Directory of structured session .jsonl files to watch.
    #[arg(long = "sessions-dir", env = "CLAW_SESSIONS_DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// Inbound webhook/health listen port.
    #[arg(long = "port", env = "CLAW_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Delivery admissions per sliding 60-second window.
    #[arg(
        long = "max-posts-per-minute",
        env = "CLAW_MAX_POSTS_PER_MINUTE",
        default_value_t = 10,
        value_parser = parse_positive_usize
    )]
    pub max_posts_per_minute: usize,

    /// Delay between consecutive outbound posts.
    #[arg(
        long = "post-delay-ms",
        env = "CLAW_POST_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64
    )]
    pub post_delay_ms: u64,

    /// File/directory poll interval for the watchers.
    #[arg(
        long = "poll-interval-ms",
        env = "CLAW_POLL_INTERVAL_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64
    )]
    pub poll_interval_ms: u64,

    /// Start with streaming disabled; deliveries resume once the flag is
    /// toggled back on.
    #[arg(long = "start-paused", env = "CLAW_START_PAUSED", action = ArgAction::SetTrue)]
    pub start_paused: bool,
}
