//! Error types for the bridge

/// Errors raised while talking to KWin or its log stream
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Missing qdbus/qdbus6 or gdbus, and no D-Bus session bus is reachable")]
    ToolUnavailable,

    #[error("KWin call '{call}' failed: {details}")]
    IpcCallFailed { call: String, details: String },

    #[error("journalctl error while reading '{service}' unit.{}", format_details(.details))]
    LogReadFailed { service: String, details: String },

    #[error("Failed to write script file: {0}")]
    ScriptFile(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn format_details(details: &str) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(" Details: {details}")
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
