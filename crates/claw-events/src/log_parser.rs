//! Free-text gateway log parsing.
//!
//! Applies an ordered rule list to each tailed line; the first matching rule
//! wins, so earlier rules shadow later ones for overlapping patterns. Most
//! lines match nothing and yield no event.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use claw_core::truncate_with_ellipsis;

use crate::{ActivityEvent, ActivityPayload, RAW_EXCERPT_CAP};

const SESSION_EXCERPT_CAP: usize = 100;

struct LogPatterns {
    timestamp: Regex,
    discord_message: Regex,
    tool_call: Regex,
    tool_failed: Regex,
    tool_name: Regex,
    agent_wait: Regex,
    session_memory: Regex,
    gateway_restart: Regex,
    slow_listener: Regex,
    lane_error: Regex,
    nested_agent: Regex,
}

fn patterns() -> &'static LogPatterns {
    static PATTERNS: OnceLock<LogPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LogPatterns {
        timestamp: Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z)")
            .expect("valid timestamp pattern"),
        discord_message: Regex::new(
            r"DiscordMessageListener took (\d+\.?\d*) seconds for event (\w+)",
        )
        .expect("valid discord message pattern"),
        tool_call: Regex::new(r"(?i)\[tools\] (\w+)(?: started| completed| failed)")
            .expect("valid tool call pattern"),
        tool_failed: Regex::new(r"(?i)\[tools\] exec failed:").expect("valid tool failed pattern"),
        tool_name: Regex::new(r#"tool "(\w+)""#).expect("valid tool name pattern"),
        agent_wait: Regex::new(r"(?i)agent\.wait (\d+)ms").expect("valid agent wait pattern"),
        session_memory: Regex::new(r"(?i)\[session-memory\] Hook triggered")
            .expect("valid session memory pattern"),
        gateway_restart: Regex::new(r"(?i)gateway tool: restart requested")
            .expect("valid gateway restart pattern"),
        slow_listener: Regex::new(
            r"Slow listener detected: (\w+) took (\d+\.?\d*)ms for event (\w+)",
        )
        .expect("valid slow listener pattern"),
        lane_error: Regex::new(r"(?i)lane task error:").expect("valid lane error pattern"),
        nested_agent: Regex::new(r"(?i)\[agent:nested\] session=")
            .expect("valid nested agent pattern"),
    })
}

/// Extracts a leading ISO-8601 prefix, defaulting to ingestion time.
fn extract_timestamp(line: &str) -> String {
    match patterns().timestamp.captures(line) {
        Some(caps) => caps[1].to_string(),
        None => claw_core::now_iso8601(),
    }
}

/// Parses one gateway log line into zero-or-one activity event.
pub fn parse_log_line(line: &str) -> Option<ActivityEvent> {
    let p = patterns();
    let timestamp = extract_timestamp(line);

    if let Some(caps) = p.discord_message.captures(line) {
        let duration: f64 = caps[1].parse().unwrap_or(0.0);
        let event = caps[2].to_string();
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Process {
                message: format!("Discord {event} event"),
                metadata: Some(json!({
                    "duration": format!("{duration:.2}s"),
                    "event": event,
                })),
            },
            timestamp,
        ));
    }

    // Successful tool lines share a pattern with failures; the substring
    // guard keeps failed executions for the dedicated rule below.
    if let Some(caps) = p.tool_call.captures(line) {
        if !line.contains("failed") {
            return Some(ActivityEvent::with_timestamp(
                ActivityPayload::ToolCall {
                    tool: caps[1].to_string(),
                    args: None,
                    result: Some(json!({"status": "completed"})),
                    tool_call_id: None,
                },
                timestamp,
            ));
        }
    }

    if p.tool_failed.is_match(line) {
        let tool = p
            .tool_name
            .captures(line)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Error {
                tool: Some(tool),
                error: "Tool execution failed".to_string(),
                metadata: Some(json!({"raw": truncate_with_ellipsis(line, RAW_EXCERPT_CAP)})),
            },
            timestamp,
        ));
    }

    if let Some(caps) = p.agent_wait.captures(line) {
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Process {
                message: "Agent wait time".to_string(),
                metadata: Some(json!({"waitTime": format!("{}ms", &caps[1])})),
            },
            timestamp,
        ));
    }

    if p.session_memory.is_match(line) {
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Info {
                message: "Session memory hook triggered".to_string(),
                metadata: None,
            },
            timestamp,
        ));
    }

    if p.gateway_restart.is_match(line) {
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Process {
                message: "Gateway restart requested".to_string(),
                metadata: None,
            },
            timestamp,
        ));
    }

    if let Some(caps) = p.slow_listener.captures(line) {
        let listener = caps[1].to_string();
        let duration: f64 = caps[2].parse().unwrap_or(0.0);
        let event = caps[3].to_string();
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Process {
                message: format!("Slow {listener}"),
                metadata: Some(json!({
                    "listener": listener,
                    "event": event,
                    "duration": format!("{duration:.0}ms"),
                })),
            },
            timestamp,
        ));
    }

    if p.lane_error.is_match(line) {
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Error {
                tool: None,
                error: "Lane task error".to_string(),
                metadata: Some(json!({"raw": truncate_with_ellipsis(line, RAW_EXCERPT_CAP)})),
            },
            timestamp,
        ));
    }

    if p.nested_agent.is_match(line) {
        return Some(ActivityEvent::with_timestamp(
            ActivityPayload::Process {
                message: "Nested agent session".to_string(),
                metadata: Some(
                    json!({"session": truncate_with_ellipsis(line, SESSION_EXCERPT_CAP)}),
                ),
            },
            timestamp,
        ));
    }

    None
}
