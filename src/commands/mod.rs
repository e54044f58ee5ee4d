//! Client commands: wire decoding, validation and execution

pub mod dispatcher;
pub mod protocol;

use crate::relay::ScriptAction;
use protocol::CommandRequest;

pub use dispatcher::{Dispatcher, Reply};
pub use protocol::{AckPayload, ServerMessage, parse_command_message};

/// Every command name clients may send
pub const COMMAND_NAMES: [&str; 12] = [
    "CloseEvent",
    "MinimizeEvent",
    "MaximizeEvent",
    "RestoreEvent",
    "FullscreenEvent",
    "FullscreenExitEvent",
    "PinToggleEvent",
    "LaunchApp",
    "KeyEvent",
    "ActivateWindow",
    "SwitchDesktop",
    "MoveWindow",
];

/// Window commands that map to a fixed action list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Close,
    Minimize,
    Maximize,
    Restore,
    Fullscreen,
    FullscreenExit,
    PinToggle,
}

impl WindowEvent {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "CloseEvent" => WindowEvent::Close,
            "MinimizeEvent" => WindowEvent::Minimize,
            "MaximizeEvent" => WindowEvent::Maximize,
            "RestoreEvent" => WindowEvent::Restore,
            "FullscreenEvent" => WindowEvent::Fullscreen,
            "FullscreenExitEvent" => WindowEvent::FullscreenExit,
            "PinToggleEvent" => WindowEvent::PinToggle,
            _ => return None,
        })
    }

    /// Scripted actions, in execution order
    pub fn actions(self) -> Vec<ScriptAction> {
        match self {
            WindowEvent::Close => vec![ScriptAction::Close],
            WindowEvent::Minimize => vec![ScriptAction::Activate, ScriptAction::Minimize],
            WindowEvent::Maximize => vec![ScriptAction::Activate, ScriptAction::Maximize],
            WindowEvent::Restore => vec![ScriptAction::Restore],
            WindowEvent::Fullscreen => vec![ScriptAction::Activate, ScriptAction::Fullscreen],
            WindowEvent::FullscreenExit => {
                vec![ScriptAction::Activate, ScriptAction::FullscreenExit]
            }
            WindowEvent::PinToggle => vec![ScriptAction::PinToggle],
        }
    }
}

/// A validated command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Window {
        event: WindowEvent,
        window_id: String,
    },
    LaunchApp {
        exec: String,
    },
    KeyEvent {
        key: String,
        window_id: Option<String>,
    },
    ActivateWindow {
        window_id: String,
    },
    SwitchDesktop {
        desktop_index: String,
    },
    MoveWindow {
        window_id: String,
        target_desktop: String,
        target_monitor: Option<String>,
    },
}

/// Why a request was not turned into a command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("unknown command: {0:?}")]
    Unknown(Option<String>),

    #[error("{name} is missing {field}")]
    Incomplete { name: String, field: &'static str },
}

impl Command {
    /// Validate a decoded request
    pub fn from_request(req: &CommandRequest) -> Result<Self, Rejection> {
        let Some(name) = req.name.as_deref() else {
            return Err(Rejection::Unknown(None));
        };
        let require = |value: &Option<String>, field: &'static str| {
            value.clone().ok_or_else(|| Rejection::Incomplete {
                name: name.to_string(),
                field,
            })
        };

        if let Some(event) = WindowEvent::from_name(name) {
            return Ok(Command::Window {
                event,
                window_id: require(&req.window_id, "windowId")?,
            });
        }

        match name {
            "LaunchApp" => Ok(Command::LaunchApp {
                exec: require(&req.exec, "exec")?,
            }),
            "KeyEvent" => Ok(Command::KeyEvent {
                key: require(&req.key, "key")?,
                window_id: req.window_id.clone(),
            }),
            "ActivateWindow" => Ok(Command::ActivateWindow {
                window_id: require(&req.window_id, "windowId")?,
            }),
            "SwitchDesktop" => Ok(Command::SwitchDesktop {
                desktop_index: require(&req.desktop_index, "desktopIndex")?,
            }),
            "MoveWindow" => Ok(Command::MoveWindow {
                window_id: require(&req.window_id, "windowId")?,
                target_desktop: require(&req.target_desktop, "targetDesktop")?,
                target_monitor: req.target_monitor.clone(),
            }),
            other => Err(Rejection::Unknown(Some(other.to_string()))),
        }
    }

    /// Protocol name, echoed in the acknowledgment
    pub fn name(&self) -> &'static str {
        match self {
            Command::Window { event, .. } => match event {
                WindowEvent::Close => "CloseEvent",
                WindowEvent::Minimize => "MinimizeEvent",
                WindowEvent::Maximize => "MaximizeEvent",
                WindowEvent::Restore => "RestoreEvent",
                WindowEvent::Fullscreen => "FullscreenEvent",
                WindowEvent::FullscreenExit => "FullscreenExitEvent",
                WindowEvent::PinToggle => "PinToggleEvent",
            },
            Command::LaunchApp { .. } => "LaunchApp",
            Command::KeyEvent { .. } => "KeyEvent",
            Command::ActivateWindow { .. } => "ActivateWindow",
            Command::SwitchDesktop { .. } => "SwitchDesktop",
            Command::MoveWindow { .. } => "MoveWindow",
        }
    }

    pub fn window_id(&self) -> Option<&str> {
        match self {
            Command::Window { window_id, .. }
            | Command::ActivateWindow { window_id }
            | Command::MoveWindow { window_id, .. } => Some(window_id),
            Command::KeyEvent { window_id, .. } => window_id.as_deref(),
            Command::LaunchApp { .. } | Command::SwitchDesktop { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CommandRequest {
        CommandRequest {
            name: Some(name.to_string()),
            window_id: Some("w1".into()),
            desktop_index: Some("2".into()),
            target_monitor: Some("1".into()),
            target_desktop: Some("2".into()),
            exec: Some("firefox".into()),
            key: Some("Return".into()),
        }
    }

    #[test]
    fn every_known_name_validates_and_round_trips_its_name() {
        for name in COMMAND_NAMES {
            let command = Command::from_request(&request(name)).unwrap();
            assert_eq!(command.name(), name);
        }
    }

    #[test]
    fn unknown_and_incomplete_requests_are_rejected() {
        assert_eq!(
            Command::from_request(&request("Dance")),
            Err(Rejection::Unknown(Some("Dance".into())))
        );
        assert_eq!(
            Command::from_request(&CommandRequest::default()),
            Err(Rejection::Unknown(None))
        );

        let mut req = request("MoveWindow");
        req.target_desktop = None;
        assert_eq!(
            Command::from_request(&req),
            Err(Rejection::Incomplete {
                name: "MoveWindow".into(),
                field: "targetDesktop"
            })
        );

        let mut req = request("CloseEvent");
        req.window_id = None;
        assert!(Command::from_request(&req).is_err());
    }

    #[test]
    fn key_event_window_is_optional() {
        let mut req = request("KeyEvent");
        req.window_id = None;
        let command = Command::from_request(&req).unwrap();
        assert_eq!(command.window_id(), None);
    }

    #[test]
    fn window_event_action_tables() {
        use ScriptAction::*;
        assert_eq!(WindowEvent::Close.actions(), vec![Close]);
        assert_eq!(WindowEvent::Minimize.actions(), vec![Activate, Minimize]);
        assert_eq!(WindowEvent::Maximize.actions(), vec![Activate, Maximize]);
        assert_eq!(WindowEvent::Restore.actions(), vec![Restore]);
        assert_eq!(WindowEvent::Fullscreen.actions(), vec![Activate, Fullscreen]);
        assert_eq!(WindowEvent::FullscreenExit.actions(), vec![Activate, FullscreenExit]);
        assert_eq!(WindowEvent::PinToggle.actions(), vec![PinToggle]);
    }
}
