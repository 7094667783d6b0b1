//! Delivery queue and drain loop.
//!
//! Producers enqueue from any task; at most one drain instance is active at
//! a time and it exits once the queue empties. Delivery is at-most-once:
//! a failed post is logged and the event dropped, never requeued.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use claw_core::current_unix_timestamp_ms;
use claw_events::ActivityEvent;

use crate::rate_limiter::RateLimiter;
use crate::sink::ActivitySink;

/// Fixed backoff while the rate limiter denies admission.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(1);

/// Process-wide mutable state shared by producers, the drain loop, and the
/// gateway. Queue and limiter sit behind tokio mutexes because the runtime
/// is multi-threaded.
pub struct StreamContext {
    queue: Mutex<VecDeque<ActivityEvent>>,
    limiter: Mutex<RateLimiter>,
    draining: AtomicBool,
    stream_enabled: AtomicBool,
    started_at_unix_ms: u64,
    post_delay: Duration,
}

impl StreamContext {
    pub fn new(max_posts_per_minute: usize, post_delay: Duration, stream_enabled: bool) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            limiter: Mutex::new(RateLimiter::new(max_posts_per_minute)),
            draining: AtomicBool::new(false),
            stream_enabled: AtomicBool::new(stream_enabled),
            started_at_unix_ms: current_unix_timestamp_ms(),
            post_delay,
        }
    }

    /// Appends to the queue tail; non-blocking for any number of producers.
    /// Returns the queue depth after the append.
    pub async fn enqueue(&self, event: ActivityEvent) -> usize {
        let mut queue = self.queue.lock().await;
        queue.push_back(event);
        queue.len()
    }

    pub async fn queue_depth(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn rate_occupancy(&self) -> usize {
        self.limiter.lock().await.occupancy(current_unix_timestamp_ms())
    }

    pub async fn rate_limit(&self) -> usize {
        self.limiter.lock().await.limit()
    }

    pub fn stream_enabled(&self) -> bool {
        self.stream_enabled.load(Ordering::SeqCst)
    }

    pub fn set_stream_enabled(&self, enabled: bool) {
        self.stream_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn uptime_seconds(&self) -> u64 {
        current_unix_timestamp_ms().saturating_sub(self.started_at_unix_ms) / 1_000
    }

    async fn admit_now(&self) -> bool {
        self.limiter.lock().await.admit(current_unix_timestamp_ms())
    }
}

/// Starts the drain loop unless one is already running.
pub fn spawn_drain(context: Arc<StreamContext>, sink: Arc<dyn ActivitySink>) {
    if context.draining.swap(true, Ordering::SeqCst) {
        return;
    }
    tokio::spawn(async move {
        loop {
            drain_until_empty(&context, sink.as_ref()).await;
            context.draining.store(false, Ordering::SeqCst);
            // A producer may have enqueued between the final empty check and
            // the guard release; reclaim the guard and continue if so.
            if context.queue_depth().await == 0
                || context.draining.swap(true, Ordering::SeqCst)
            {
                break;
            }
        }
    });
}

async fn drain_until_empty(context: &StreamContext, sink: &dyn ActivitySink) {
    loop {
        if context.queue_depth().await == 0 {
            return;
        }

        if !context.admit_now().await {
            tracing::debug!("rate limit reached, waiting");
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
            continue;
        }

        let Some(event) = context.queue.lock().await.pop_front() else {
            return;
        };

        if !context.stream_enabled() {
            tracing::debug!(event_type = event.kind(), "stream disabled, dropping event");
        } else {
            match sink.deliver(&event).await {
                Ok(ack) => {
                    tracing::info!(
                        event_type = event.kind(),
                        message_id = ack.message_id.as_deref().unwrap_or(""),
                        "delivered activity"
                    );
                }
                Err(error) => {
                    tracing::error!(
                        event_type = event.kind(),
                        %error,
                        "delivery failed, dropping event"
                    );
                }
            }
        }

        // Smooths outbound traffic between consecutive posts.
        tokio::time::sleep(context.post_delay).await;
    }
}
