//! End-to-end pipeline coverage: tailed lines through parsing, queueing,
//! rate limiting, and HTTP delivery.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use claw_events::{parse_log_line, parse_session_line};
use claw_gateway::{build_activity_router, GatewayState};
use claw_relay::{spawn_drain, ActivitySink, StreamContext, WebhookSink};
use claw_watcher::{tail_file, TailerConfig};

const RECV_DEADLINE: Duration = Duration::from_secs(2);

fn pipeline_context() -> Arc<StreamContext> {
    Arc::new(StreamContext::new(1_000, Duration::from_millis(1), true))
}

async fn wait_for_hits(mock: &httpmock::Mock<'_>, expected: usize) {
    for _ in 0..500 {
        if mock.hits_async().await >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {expected} webhook hits");
}

#[tokio::test]
async fn tailed_tool_line_reaches_webhook_with_golden_shape() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/webhook/activity").json_body(json!({
                "type": "tool_call",
                "tool": "web_search",
                "result": {"status": "completed"},
                "timestamp": "2024-01-01T00:00:00.000Z",
            }));
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("gateway.err.log");
    std::fs::write(&log_path, "").expect("seed log");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let tailer = tokio::spawn(tail_file(
        TailerConfig {
            path: log_path.clone(),
            poll_interval: Duration::from_millis(10),
            read_from_start: false,
        },
        shutdown_rx,
        lines_tx,
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;

    std::fs::write(
        &log_path,
        "2024-01-01T00:00:00.000Z [tools] web_search started\n",
    )
    .expect("append tool line");

    let line = timeout(RECV_DEADLINE, lines_rx.recv())
        .await
        .expect("line within deadline")
        .expect("channel open");
    let event = parse_log_line(&line).expect("tool line parses");

    let context = pipeline_context();
    let sink: Arc<dyn ActivitySink> = Arc::new(
        WebhookSink::new(server.url("/webhook/activity"), None).expect("build sink"),
    );
    context.enqueue(event).await;
    spawn_drain(context.clone(), sink);

    wait_for_hits(&mock, 1).await;
    assert_eq!(context.queue_depth().await, 0);

    shutdown_tx.send(true).expect("signal shutdown");
    let _ = timeout(RECV_DEADLINE, tailer).await.expect("tailer exits");
}

#[tokio::test]
async fn session_records_flow_through_in_enqueue_order() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/webhook/activity");
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;

    let records = [
        r#"{"type":"message","message":{"role":"user","content":[{"type":"text","text":"hello"}]},"timestamp":"2024-01-01T00:00:00.000Z"}"#,
        r#"{"type":"heartbeat","timestamp":"2024-01-01T00:00:01.000Z"}"#,
        r#"{"type":"message","message":{"role":"tool","content":"done"},"timestamp":"2024-01-01T00:00:02.000Z"}"#,
        "{broken json",
    ];

    let context = pipeline_context();
    let sink: Arc<dyn ActivitySink> = Arc::new(
        WebhookSink::new(server.url("/webhook/activity"), None).expect("build sink"),
    );

    let mut parsed = 0usize;
    for record in records {
        match parse_session_line(record) {
            Ok(Some(event)) => {
                parsed += 1;
                context.enqueue(event).await;
                spawn_drain(context.clone(), sink.clone());
            }
            Ok(None) => {}
            Err(_) => {}
        }
    }
    assert_eq!(parsed, 2, "only user message and tool result should parse");

    wait_for_hits(&mock, 2).await;
    assert_eq!(context.queue_depth().await, 0);
}

#[tokio::test]
async fn inbound_webhook_relays_to_outbound_sink() {
    let server = MockServer::start_async().await;
    let outbound = server
        .mock_async(|when, then| {
            when.method(POST).path("/forward").json_body(json!({
                "type": "info",
                "message": "relayed",
                "timestamp": "2024-01-01T00:00:00.000Z",
            }));
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;

    let context = pipeline_context();
    let sink: Arc<dyn ActivitySink> = Arc::new(
        WebhookSink::new(server.url("/forward"), Some("s3cret".to_string()))
            .expect("build sink"),
    );
    let state = Arc::new(GatewayState {
        context: context.clone(),
        sink,
        webhook_secret: Some("s3cret".to_string()),
    });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("resolve listener addr");
    let app = build_activity_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let client = reqwest::Client::new();

    // Wrong secret: rejected before the queue, outbound never called.
    let response = client
        .post(format!("http://{addr}/webhook"))
        .header("X-Webhook-Secret", "wrong")
        .json(&json!({"type": "info", "message": "relayed", "timestamp": "2024-01-01T00:00:00.000Z"}))
        .send()
        .await
        .expect("post webhook");
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(context.queue_depth().await, 0);
    assert_eq!(outbound.hits_async().await, 0);

    // Correct secret: accepted and relayed downstream.
    let response = client
        .post(format!("http://{addr}/webhook"))
        .header("X-Webhook-Secret", "s3cret")
        .json(&json!({"type": "info", "message": "relayed", "timestamp": "2024-01-01T00:00:00.000Z"}))
        .send()
        .await
        .expect("post webhook");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("response json");
    assert_eq!(body, json!({"ok": true}));

    wait_for_hits(&outbound, 1).await;

    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("get health")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], "ok");
    assert_eq!(health["rate_limit"]["max_per_minute"], 1_000);
}
