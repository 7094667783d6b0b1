//! Structured session record parsing.
//!
//! Session files are append-only JSONL; each line is one record. Invalid
//! JSON is a recoverable `ParseError` (the caller logs and skips the line),
//! while recognized record shapes map to at most one activity event.

use serde::Deserialize;
use serde_json::{json, Value};

use claw_core::truncate_with_ellipsis;

use crate::icons::{
    tool_icon, ICON_MODEL_CHANGE, ICON_RESULT_FAILED, ICON_RESULT_OK, ICON_SESSION, ICON_SNAPSHOT,
    ICON_TEXT_OUTPUT, ICON_THINKING, ICON_USER_MESSAGE,
};
use crate::render::value_to_compact_string;
use crate::{ActivityEvent, ActivityPayload, ParseError, TEXT_OUTPUT_CAP, THINKING_CAP, USER_MESSAGE_CAP};

#[derive(Debug, Deserialize)]
struct SessionRecord {
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    message: Option<RecordMessage>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, rename = "customType")]
    custom_type: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<Value>,
}

/// Parses one session JSONL line into zero-or-one activity event.
pub fn parse_session_line(line: &str) -> Result<Option<ActivityEvent>, ParseError> {
    let record: SessionRecord = serde_json::from_str(line)?;
    let timestamp = record
        .timestamp
        .clone()
        .unwrap_or_else(claw_core::now_iso8601);

    let event = match record.record_type.as_str() {
        "message" => record
            .message
            .and_then(|message| parse_message_record(message, timestamp)),
        "custom" => parse_custom_record(&record, timestamp),
        "session" => Some(
            ActivityEvent::with_timestamp(
                ActivityPayload::Info {
                    message: "Session updated".to_string(),
                    metadata: None,
                },
                timestamp,
            )
            .with_icon(ICON_SESSION),
        ),
        "model_change" => Some(
            ActivityEvent::with_timestamp(
                ActivityPayload::Info {
                    message: format!(
                        "Model changed to {}",
                        record.model.as_deref().unwrap_or("unknown")
                    ),
                    metadata: None,
                },
                timestamp,
            )
            .with_icon(ICON_MODEL_CHANGE),
        ),
        _ => None,
    };
    Ok(event)
}

fn parse_message_record(message: RecordMessage, timestamp: String) -> Option<ActivityEvent> {
    let role = message.role.as_deref().unwrap_or("");
    match role {
        "assistant" => parse_assistant_message(message.content.as_ref()?, timestamp),
        "tool" => parse_tool_message(message.content.as_ref()?, timestamp),
        "user" => {
            let text = first_text_block(message.content.as_ref()?)?;
            Some(
                ActivityEvent::with_timestamp(
                    ActivityPayload::UserMessage {
                        message: truncate_with_ellipsis(text, USER_MESSAGE_CAP),
                    },
                    timestamp,
                )
                .with_icon(ICON_USER_MESSAGE),
            )
        }
        _ => None,
    }
}

fn parse_assistant_message(content: &Value, timestamp: String) -> Option<ActivityEvent> {
    let blocks = content.as_array()?;

    if let Some(reasoning) = blocks.iter().find_map(|block| {
        (block.get("type")?.as_str()? == "thinking")
            .then(|| block.get("thinking")?.as_str())
            .flatten()
            .filter(|text| !text.is_empty())
    }) {
        return Some(
            ActivityEvent::with_timestamp(
                ActivityPayload::Thinking {
                    reasoning: truncate_with_ellipsis(reasoning, THINKING_CAP),
                },
                timestamp,
            )
            .with_icon(ICON_THINKING),
        );
    }

    // A record can carry several tool_use blocks; only the first is emitted.
    // Known limitation carried over from the session schema consumer.
    if let Some(block) = blocks.iter().find(|block| {
        block.get("type").and_then(Value::as_str) == Some("tool_use")
            && block.get("name").and_then(Value::as_str).is_some()
            && block.get("id").and_then(Value::as_str).is_some()
    }) {
        let tool = block
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let icon = tool_icon(&tool);
        return Some(
            ActivityEvent::with_timestamp(
                ActivityPayload::ToolCall {
                    args: block.get("input").cloned(),
                    result: None,
                    tool_call_id: block
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    tool,
                },
                timestamp,
            )
            .with_icon(icon),
        );
    }

    let text = first_text_block(content)?;
    Some(
        ActivityEvent::with_timestamp(
            ActivityPayload::TextOutput {
                message: truncate_with_ellipsis(text, TEXT_OUTPUT_CAP),
            },
            timestamp,
        )
        .with_icon(ICON_TEXT_OUTPUT),
    )
}

fn parse_tool_message(content: &Value, timestamp: String) -> Option<ActivityEvent> {
    // Success is inferred from the stringified result text. Best-effort: the
    // session schema carries no authoritative status field for tool output.
    let stringified = value_to_compact_string(content);
    let success = !stringified.to_lowercase().contains("error");
    let icon = if success {
        ICON_RESULT_OK
    } else {
        ICON_RESULT_FAILED
    };
    Some(
        ActivityEvent::with_timestamp(
            ActivityPayload::ToolResult {
                tool: "tool_result".to_string(),
                success,
                result: content.clone(),
            },
            timestamp,
        )
        .with_icon(icon),
    )
}

fn parse_custom_record(record: &SessionRecord, timestamp: String) -> Option<ActivityEvent> {
    if record.custom_type.as_deref() != Some("model-snapshot") {
        return None;
    }
    let data = record.data.as_ref();
    let metadata = json!({
        "model": data.and_then(|d| d.get("model")).cloned().unwrap_or(Value::Null),
        "tokens": data
            .and_then(|d| d.get("usage"))
            .and_then(|usage| usage.get("totalTokens"))
            .cloned()
            .unwrap_or(Value::Null),
    });
    Some(
        ActivityEvent::with_timestamp(
            ActivityPayload::Info {
                message: "Model usage snapshot".to_string(),
                metadata: Some(metadata),
            },
            timestamp,
        )
        .with_icon(ICON_SNAPSHOT),
    )
}

fn first_text_block(content: &Value) -> Option<&str> {
    content.as_array()?.iter().find_map(|block| {
        (block.get("type")?.as_str()? == "text")
            .then(|| block.get("text")?.as_str())
            .flatten()
            .filter(|text| !text.is_empty())
    })
}
