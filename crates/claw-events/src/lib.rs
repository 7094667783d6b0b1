//! Activity event model, parsers, and message rendering for Claw.
//!
//! Defines the canonical `ActivityEvent` flowing through the relay pipeline
//! plus the two ingestion parsers (free-text gateway logs and structured
//! session records) and the compact icon-coded renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod icons;
pub mod log_parser;
pub mod render;
pub mod session_parser;

pub use log_parser::parse_log_line;
pub use render::render_activity_message;
pub use session_parser::parse_session_line;

/// Caps applied to free text at parse time and again when rendering, so
/// webhook-ingested events share the same bounds as tailed ones. Rendering-only
/// caps (tool args, tool results, raw line excerpts) live in `render`.
pub const THINKING_CAP: usize = 300;
pub const TEXT_OUTPUT_CAP: usize = 300;
pub const USER_MESSAGE_CAP: usize = 200;
pub const RAW_EXCERPT_CAP: usize = 200;

#[derive(Debug, Error)]
/// Enumerates supported `ParseError` values.
pub enum ParseError {
    #[error("invalid record json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid activity event: {0}")]
    InvalidEvent(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Enumerates supported `ActivityPayload` values, one variant per event type.
///
/// Unknown `type` discriminators fail deserialization, so malformed inbound
/// payloads are rejected at the parser boundary instead of flowing opaquely
/// through the queue.
pub enum ActivityPayload {
    ToolCall {
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    ToolResult {
        tool: String,
        success: bool,
        result: Value,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },
    Info {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },
    Process {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },
    Thinking {
        reasoning: String,
    },
    TextOutput {
        message: String,
    },
    UserMessage {
        message: String,
    },
}

impl ActivityPayload {
    /// Stable lowercase label matching the wire discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Error { .. } => "error",
            Self::Info { .. } => "info",
            Self::Process { .. } => "process",
            Self::Thinking { .. } => "thinking",
            Self::TextOutput { .. } => "text_output",
            Self::UserMessage { .. } => "user_message",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One normalized activity record, immutable after creation and consumed by
/// the sink after exactly one delivery attempt.
pub struct ActivityEvent {
    #[serde(flatten)]
    pub payload: ActivityPayload,
    #[serde(default = "claw_core::now_iso8601")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ActivityEvent {
    /// Creates an event stamped with the current ingestion time.
    pub fn new(payload: ActivityPayload) -> Self {
        Self {
            payload,
            timestamp: claw_core::now_iso8601(),
            icon: None,
        }
    }

    pub fn with_timestamp(payload: ActivityPayload, timestamp: String) -> Self {
        Self {
            payload,
            timestamp,
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

/// Parses an inbound webhook body into an event, rejecting unknown event
/// types and non-ISO-8601 timestamps.
pub fn parse_webhook_event(body: &str) -> Result<ActivityEvent, ParseError> {
    let event: ActivityEvent = serde_json::from_str(body)?;
    if chrono::DateTime::parse_from_rfc3339(&event.timestamp).is_err() {
        return Err(ParseError::InvalidEvent(format!(
            "timestamp '{}' is not ISO-8601",
            event.timestamp
        )));
    }
    Ok(event)
}
