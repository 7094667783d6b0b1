//! Compact icon-coded message rendering.
//!
//! One formatting strategy keyed by event type replaces the near-duplicate
//! formatter variants the relay grew out of; sinks that need a different
//! presentation wrap this output rather than reformatting fields.

use chrono::{DateTime, Local};
use serde_json::Value;

use claw_core::truncate_with_ellipsis;

use crate::icons::ICON_GENERIC;
use crate::{ActivityEvent, ActivityPayload, TEXT_OUTPUT_CAP, THINKING_CAP, USER_MESSAGE_CAP};

const ARGS_RENDER_CAP: usize = 150;
const RESULT_OK_RENDER_CAP: usize = 150;
const RESULT_FAILED_RENDER_CAP: usize = 200;
const ERROR_RAW_RENDER_CAP: usize = 150;

/// Stringifies a JSON value the way the wire shows it: strings stay bare,
/// everything else renders as compact JSON.
pub(crate) fn value_to_compact_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Renders one event as a single chat message.
pub fn render_activity_message(event: &ActivityEvent) -> String {
    let icon = event.icon.as_deref().unwrap_or(ICON_GENERIC);
    let mut message = icon.to_string();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&event.timestamp) {
        let stamp = parsed.with_timezone(&Local).format("%H:%M:%S");
        message.push_str(&format!(" `[{stamp}]`"));
    }

    match &event.payload {
        ActivityPayload::Thinking { reasoning } => {
            // Tailed sources truncate at parse time, but webhook-ingested
            // events arrive uncapped; the render caps bound both paths.
            message.push_str(&format!(
                " **THINKING**\n{}",
                truncate_with_ellipsis(reasoning, THINKING_CAP)
            ));
        }
        ActivityPayload::ToolCall { tool, args, .. } => {
            message.push_str(&format!(" `{tool}`"));
            if let Some(args) = args {
                let rendered = value_to_compact_string(args);
                message.push_str(&format!(
                    " → {}",
                    truncate_with_ellipsis(&rendered, ARGS_RENDER_CAP)
                ));
            }
        }
        ActivityPayload::ToolResult {
            tool,
            success,
            result,
        } => {
            message.push_str(&format!(" `{tool}`"));
            let rendered = value_to_compact_string(result);
            if *success {
                message.push_str(&format!(
                    "\n✓ {}",
                    truncate_with_ellipsis(&rendered, RESULT_OK_RENDER_CAP)
                ));
            } else {
                message.push_str(&format!(
                    "\n❌ {}",
                    truncate_with_ellipsis(&rendered, RESULT_FAILED_RENDER_CAP)
                ));
            }
        }
        ActivityPayload::TextOutput { message: text } => {
            message.push_str(&format!(
                " {}",
                truncate_with_ellipsis(text, TEXT_OUTPUT_CAP)
            ));
        }
        ActivityPayload::UserMessage { message: text } => {
            message.push_str(&format!(
                " {}",
                truncate_with_ellipsis(text, USER_MESSAGE_CAP)
            ));
        }
        ActivityPayload::Info {
            message: text,
            metadata,
        } => {
            message.push_str(&format!(" {text}"));
            if let Some(metadata) = metadata {
                message.push_str(&format!(
                    "\n{}",
                    serde_json::to_string(metadata).unwrap_or_default()
                ));
            }
        }
        ActivityPayload::Process {
            message: text,
            metadata,
        } => {
            message.push_str(&format!(" {text}"));
            if let Some(metadata) = metadata {
                message.push_str(&format!(
                    " ({})",
                    serde_json::to_string(metadata).unwrap_or_default()
                ));
            }
        }
        ActivityPayload::Error {
            error, metadata, ..
        } => {
            message.push_str(&format!(" **ERROR**: {error}"));
            if let Some(raw) = metadata
                .as_ref()
                .and_then(|m| m.get("raw"))
                .and_then(Value::as_str)
            {
                message.push_str(&format!(
                    "\n`{}`",
                    truncate_with_ellipsis(raw, ERROR_RAW_RENDER_CAP)
                ));
            }
        }
    }

    message
}
