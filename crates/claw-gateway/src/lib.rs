//! Inbound webhook and health server for Claw.
//!
//! Accepts activity events over HTTP (with optional shared-secret
//! verification), feeds the delivery queue, and exposes queue/rate-limiter
//! occupancy on the health endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use claw_events::parse_webhook_event;
use claw_relay::{spawn_drain, ActivitySink, StreamContext};

/// Public struct `GatewayState` shared by all inbound handlers.
pub struct GatewayState {
    pub context: Arc<StreamContext>,
    pub sink: Arc<dyn ActivitySink>,
    pub webhook_secret: Option<String>,
}

/// Builds the activity router: webhook ingestion plus health.
pub fn build_activity_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/webhook/activity", post(handle_webhook_activity))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Binds the configured port and serves until ctrl-c.
pub async fn serve_gateway(port: u16, state: Arc<GatewayState>) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve webhook bound address")?;
    println!("activity webhook server listening: addr={local_addr}");

    let app = build_activity_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("activity webhook server exited unexpectedly")?;
    Ok(())
}

fn secret_matches(state: &GatewayState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.webhook_secret.as_deref() else {
        return true;
    };
    let observed = headers
        .get("x-webhook-secret")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    observed == expected.trim()
}

async fn handle_webhook(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    ingest_activity(&state, &headers, &body, json!({"ok": true})).await
}

async fn handle_webhook_activity(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    ingest_activity(&state, &headers, &body, json!({"status": "ok"})).await
}

async fn ingest_activity(
    state: &Arc<GatewayState>,
    headers: &HeaderMap,
    body: &str,
    accepted_body: serde_json::Value,
) -> (StatusCode, Json<serde_json::Value>) {
    if !secret_matches(state, headers) {
        tracing::warn!("webhook secret verification failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized"})),
        );
    }

    let event = match parse_webhook_event(body) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(%error, "rejecting malformed activity payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": error.to_string()})),
            );
        }
    };

    if !state.context.stream_enabled() {
        return (
            StatusCode::OK,
            Json(json!({"status": "ok", "message": "Stream disabled"})),
        );
    }

    let depth = state.context.enqueue(event).await;
    tracing::debug!(queue_depth = depth, "queued inbound activity");
    spawn_drain(state.context.clone(), state.sink.clone());
    (StatusCode::OK, Json(accepted_body))
}

async fn handle_health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let context = &state.context;
    Json(json!({
        "status": "ok",
        "queue": context.queue_depth().await,
        "rate_limit": {
            "posts": context.rate_occupancy().await,
            "max_per_minute": context.rate_limit().await,
        },
        "uptime_seconds": context.uptime_seconds(),
        "stream_enabled": context.stream_enabled(),
    }))
}
