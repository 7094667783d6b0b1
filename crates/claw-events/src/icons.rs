//! Static icon configuration for rendered activity messages.

pub const ICON_THINKING: &str = "💭";
pub const ICON_TEXT_OUTPUT: &str = "💬";
pub const ICON_USER_MESSAGE: &str = "📨";
pub const ICON_RESULT_OK: &str = "✓";
pub const ICON_RESULT_FAILED: &str = "❌";
pub const ICON_SESSION: &str = "📡";
pub const ICON_MODEL_CHANGE: &str = "🔄";
pub const ICON_SNAPSHOT: &str = "📊";

/// Fallback for events without a specific icon.
pub const ICON_GENERIC: &str = "📡";

const GENERIC_TOOL_ICON: &str = "🔧";

/// Maps a tool name to its display icon, falling back to the generic wrench.
pub fn tool_icon(tool: &str) -> &'static str {
    match tool {
        // File operations
        "read" => "📂",
        "write" => "💾",
        "edit" => "✏️",

        // Web tools
        "web_search" => "🔎",
        "web_fetch" => "🌐",
        "browser" => "🖥️",

        // Memory
        "memory_search" | "memory_get" => "🧠",

        // Sessions
        "sessions_list" | "sessions_spawn" | "sessions_send" | "sessions_history" => "📡",

        // Messaging
        "message" | "send" | "react" | "delete" => "💬",

        // Other
        "exec" => "⚡",
        "cron" => "🔧",
        "tts" => "🔊",

        _ => GENERIC_TOOL_ICON,
    }
}
