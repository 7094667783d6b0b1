//! Foundational low-level utilities shared across Claw crates.
//!
//! Provides time helpers and the universal text-truncation rule used by event
//! parsing and message rendering.

pub mod text_utils;
pub mod time_utils;

pub use text_utils::truncate_with_ellipsis;
pub use time_utils::{current_unix_timestamp_ms, now_iso8601};
