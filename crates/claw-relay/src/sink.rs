//! HTTP sink adapters.
//!
//! A sink serializes one event to its wire form and performs a single POST.
//! Sinks never retry; retry policy (none) is owned by the drain loop.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use claw_events::{render_activity_message, ActivityEvent};

const SINK_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
/// Enumerates supported `DeliveryError` values.
pub enum DeliveryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sink returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Acknowledgement for one delivered event.
pub struct DeliveryAck {
    pub message_id: Option<String>,
}

#[async_trait]
/// Trait contract for `ActivitySink` behavior.
pub trait ActivitySink: Send + Sync {
    async fn deliver(&self, event: &ActivityEvent) -> Result<DeliveryAck, DeliveryError>;
}

fn build_http_client() -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static("claw-activity-stream"),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_millis(SINK_REQUEST_TIMEOUT_MS))
        .build()
        .context("failed to create sink http client")
}

/// Posts the event's JSON wire form to a configured endpoint, optionally
/// attaching the shared-secret header.
pub struct WebhookSink {
    http: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookSink {
    pub fn new(url: String, secret: Option<String>) -> Result<Self> {
        Ok(Self {
            http: build_http_client()?,
            url,
            secret,
        })
    }
}

#[async_trait]
impl ActivitySink for WebhookSink {
    async fn deliver(&self, event: &ActivityEvent) -> Result<DeliveryAck, DeliveryError> {
        let mut request = self.http.post(&self.url).json(event);
        if let Some(secret) = self.secret.as_deref() {
            request = request.header("X-Webhook-Secret", secret);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(DeliveryAck {
            message_id: extract_message_id(&body, "messageId"),
        })
    }
}

/// Posts the rendered compact message to a Discord-style webhook URL.
pub struct DiscordSink {
    http: reqwest::Client,
    url: String,
}

impl DiscordSink {
    pub fn new(url: String) -> Result<Self> {
        Ok(Self {
            http: build_http_client()?,
            url,
        })
    }
}

#[async_trait]
impl ActivitySink for DiscordSink {
    async fn deliver(&self, event: &ActivityEvent) -> Result<DeliveryAck, DeliveryError> {
        let content = render_activity_message(event);
        let response = self
            .http
            .post(&self.url)
            .json(&json!({"content": content}))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(DeliveryAck {
            message_id: extract_message_id(&body, "id"),
        })
    }
}

fn extract_message_id(body: &str, key: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get(key)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
