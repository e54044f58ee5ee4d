//! KWin script programs injected by the relay
//!
//! The JavaScript bodies live next to this file; parameters are passed by
//! prepending a `const PARAMS = {...};` line, so no value is ever spliced
//! into the script text itself.

use serde::Serialize;

const SNAPSHOT_SCRIPT: &str = include_str!("scripts/snapshot.js");
const ACTION_SCRIPT: &str = include_str!("scripts/action.js");

/// A single scripted mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptAction {
    Activate,
    Minimize,
    Maximize,
    Restore,
    Fullscreen,
    FullscreenExit,
    Close,
    PinToggle,
    ClearAttention,
    MoveDesktop(String),
    MoveMonitor(String),
    SwitchDesktop(String),
}

impl ScriptAction {
    /// Action name understood by the action script
    pub fn name(&self) -> &'static str {
        match self {
            ScriptAction::Activate => "activate",
            ScriptAction::Minimize => "minimize",
            ScriptAction::Maximize => "maximize",
            ScriptAction::Restore => "restore",
            ScriptAction::Fullscreen => "fullscreen",
            ScriptAction::FullscreenExit => "fullscreen-exit",
            ScriptAction::Close => "close",
            ScriptAction::PinToggle => "pin-toggle",
            ScriptAction::ClearAttention => "clear-attention",
            ScriptAction::MoveDesktop(_) => "move-desktop",
            ScriptAction::MoveMonitor(_) => "move-monitor",
            ScriptAction::SwitchDesktop(_) => "switch-desktop",
        }
    }

    /// `kwin <action> [window] [arg]`, as reported back to clients
    pub fn trace(&self, window_id: Option<&str>) -> String {
        let mut parts = vec!["kwin", self.name()];
        parts.extend(window_id);
        match self {
            ScriptAction::MoveDesktop(arg) | ScriptAction::MoveMonitor(arg) | ScriptAction::SwitchDesktop(arg) => {
                parts.push(arg)
            }
            _ => {}
        }
        parts.join(" ")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotParams {
    target_pid: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionParams<'a> {
    target_pid: i64,
    window_id: &'a str,
    action: &'static str,
    target_desktop: &'a str,
    target_monitor: &'a str,
}

fn with_params<P: Serialize>(params: &P, body: &str) -> serde_json::Result<String> {
    Ok(format!("const PARAMS = {};\n{}", serde_json::to_string(params)?, body))
}

/// Script printing one meta line and one line per window
pub fn snapshot_program(pid: Option<i64>) -> serde_json::Result<String> {
    with_params(
        &SnapshotParams {
            target_pid: pid.unwrap_or(-1),
        },
        SNAPSHOT_SCRIPT,
    )
}

/// Script applying `action` to the window named by `window_id`
///
/// With no window id the action applies to every window matching `pid`;
/// `SwitchDesktop` ignores both.
pub fn action_program(
    action: &ScriptAction,
    window_id: Option<&str>,
    pid: Option<i64>,
) -> serde_json::Result<String> {
    let (desktop, monitor) = match action {
        ScriptAction::MoveDesktop(d) | ScriptAction::SwitchDesktop(d) => (d.as_str(), ""),
        ScriptAction::MoveMonitor(m) => ("", m.as_str()),
        _ => ("", ""),
    };
    with_params(
        &ActionParams {
            target_pid: pid.unwrap_or(-1),
            window_id: window_id.unwrap_or(""),
            action: action.name(),
            target_desktop: desktop,
            target_monitor: monitor,
        },
        ACTION_SCRIPT,
    )
}
