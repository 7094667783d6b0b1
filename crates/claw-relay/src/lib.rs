//! Rate-limited activity delivery for Claw.
//!
//! Provides the process-wide stream context (FIFO delivery queue, sliding
//! 60-second rate limiter, streaming-enabled flag), the single-instance
//! drain loop, and the HTTP sink adapters events are handed to.

pub mod delivery;
pub mod rate_limiter;
pub mod sink;

pub use delivery::{spawn_drain, StreamContext};
pub use rate_limiter::RateLimiter;
pub use sink::{ActivitySink, DeliveryAck, DeliveryError, DiscordSink, WebhookSink};
