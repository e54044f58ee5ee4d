use std::sync::Arc;
use std::time::Duration;

use crate::backend::screens::{parse_support_information, screen_at};
use crate::core::WindowRecord;
use crate::core::ident::find_window;
use crate::error::Result;
use crate::input::InputDriver;
use crate::relay::{Relay, ScriptAction};
use crate::snapshot::StateProvider;

use super::protocol::{AckPayload, CommandRequest};
use super::{Command, Rejection};

const TRACE_SEPARATOR: &str = " ; ";

/// Settle time between activating a window and typing into it
const KEY_SETTLE: Duration = Duration::from_millis(100);

/// Settle time between activating a window and moving it to another screen
const MOVE_SETTLE: Duration = Duration::from_millis(200);

/// Outcome of a command that should be acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub ack: AckPayload,
    /// Send a fresh state frame after the ack
    pub push_state: bool,
}

/// Executes client commands against KWin
pub struct Dispatcher {
    provider: Arc<StateProvider>,
    input: Arc<dyn InputDriver>,
}

impl Dispatcher {
    pub fn new(provider: Arc<StateProvider>, input: Arc<dyn InputDriver>) -> Self {
        Self { provider, input }
    }

    pub fn provider(&self) -> &StateProvider {
        &self.provider
    }

    fn relay(&self) -> &Relay {
        self.provider.relay()
    }

    /// Validate and run a decoded request
    ///
    /// Unknown or incomplete requests yield `Ok(None)`.
    pub async fn handle(&self, request: &CommandRequest) -> Result<Option<Reply>> {
        match Command::from_request(request) {
            Ok(command) => self.dispatch(&command).await,
            Err(Rejection::Unknown(name)) => {
                tracing::debug!("Ignoring unknown command {:?}", name);
                Ok(None)
            }
            Err(rejection) => {
                tracing::debug!("Ignoring command: {}", rejection);
                Ok(None)
            }
        }
    }

    /// Run a command to completion
    ///
    /// A failed scripted step aborts the command with its error. A failed
    /// launch yields `Ok(None)`.
    pub async fn dispatch(&self, command: &Command) -> Result<Option<Reply>> {
        tracing::debug!("Dispatching {:?}", command);

        let mut desktop_index = None;
        let (text, push_state) = match command {
            Command::Window { event, window_id } => {
                let mut trace = Vec::new();
                for action in event.actions() {
                    self.step(&mut trace, action, Some(window_id.as_str())).await?;
                }
                (trace.join(TRACE_SEPARATOR), true)
            }
            Command::SwitchDesktop { desktop_index: index } => {
                desktop_index = Some(index.clone());
                let mut trace = Vec::new();
                self.step(&mut trace, ScriptAction::SwitchDesktop(index.clone()), None)
                    .await?;
                (trace.join(TRACE_SEPARATOR), true)
            }
            Command::LaunchApp { exec } => match self.input.launch(exec) {
                Ok(started) => (format!("exec {started}"), true),
                Err(e) => {
                    tracing::warn!("Launching '{}' failed: {}", exec, e);
                    return Ok(None);
                }
            },
            Command::KeyEvent { key, window_id } => self.key_event(key, window_id.as_deref()).await?,
            Command::ActivateWindow { window_id } => (self.activate_window(window_id).await?, true),
            Command::MoveWindow {
                window_id,
                target_desktop,
                target_monitor,
            } => (
                self.move_window(window_id, target_desktop, target_monitor.as_deref())
                    .await?,
                true,
            ),
        };

        Ok(Some(Reply {
            ack: AckPayload {
                name: command.name().to_string(),
                window_id: command.window_id().map(String::from),
                desktop_index,
                command: text,
            },
            push_state,
        }))
    }

    /// Run one scripted action and record it
    async fn step(&self, trace: &mut Vec<String>, action: ScriptAction, window_id: Option<&str>) -> Result<()> {
        self.relay().run_action(&action, window_id).await?;
        trace.push(action.trace(window_id));
        Ok(())
    }

    /// Invoke a KWin shortcut, recording it only when it worked
    async fn shortcut(&self, trace: &mut Vec<String>, name: &str) -> bool {
        let ok = self.relay().transport().invoke_shortcut(name).await;
        if ok {
            trace.push(format!("kwin shortcut {name}"));
        } else {
            tracing::debug!("Shortcut '{}' failed", name);
        }
        ok
    }

    async fn key_event(&self, key: &str, window_id: Option<&str>) -> Result<(String, bool)> {
        if let Some(id) = window_id {
            self.relay().run_action(&ScriptAction::Activate, Some(id)).await?;
            self.relay().pause(KEY_SETTLE).await;
        }
        match self.input.send_key(key).await {
            Ok(()) => Ok((format!("key {key}"), true)),
            Err(e) => {
                tracing::warn!("Key '{}' failed: {}", key, e);
                Ok((format!("error: key {key} failed"), false))
            }
        }
    }

    /// Bring a window forward, switching to its screen first
    ///
    /// Activation is repeated at the end because KWin's focus-stealing
    /// prevention may ignore the first one.
    async fn activate_window(&self, window_id: &str) -> Result<String> {
        let mut trace = Vec::new();
        self.step(&mut trace, ScriptAction::Activate, Some(window_id)).await?;

        let harvest = self.provider.harvest().await?;
        if let Some(index) = self.screen_of(&harvest.windows, window_id).await {
            // KWin 5 numbers screens from 0, some KWin 6 builds from 1
            if !self.shortcut(&mut trace, &format!("Switch to Screen {index}")).await {
                self.shortcut(&mut trace, &format!("Switch to Screen {}", index + 1))
                    .await;
            }
        }

        self.shortcut(&mut trace, "Activate Window Demanding Attention").await;
        self.step(&mut trace, ScriptAction::ClearAttention, Some(window_id)).await?;
        self.shortcut(&mut trace, "Window Raise").await;
        self.step(&mut trace, ScriptAction::Activate, Some(window_id)).await?;

        Ok(trace.join(TRACE_SEPARATOR))
    }

    /// KWin screen index under the window's centre
    async fn screen_of(&self, windows: &[WindowRecord], window_id: &str) -> Option<u32> {
        let geometry = find_window(windows, window_id)?.frame_geometry.as_ref()?;
        let (cx, cy) = geometry.center();
        let info = self.relay().transport().support_information().await?;
        screen_at(&parse_support_information(&info), cx, cy)
    }

    /// Move a window to another monitor, outside of any client session
    pub async fn move_to_monitor(&self, window_id: &str, monitor: &str) -> Result<String> {
        let mut trace = Vec::new();
        self.send_to_monitor(&mut trace, window_id, monitor).await?;
        Ok(trace.join(TRACE_SEPARATOR))
    }

    /// Activate, then try the `Window to Screen` shortcuts before the scripted move
    ///
    /// Numeric monitors are tried as both 0- and 1-based screen indexes.
    async fn send_to_monitor(&self, trace: &mut Vec<String>, window_id: &str, monitor: &str) -> Result<()> {
        self.step(trace, ScriptAction::Activate, Some(window_id)).await?;
        self.relay().pause(MOVE_SETTLE).await;

        if let Ok(n) = monitor.trim().parse::<u32>() {
            let candidates: Vec<u32> = n.checked_sub(1).into_iter().chain([n]).collect();
            for index in candidates {
                if self.shortcut(trace, &format!("Window to Screen {index}")).await {
                    return Ok(());
                }
            }
        }
        self.step(trace, ScriptAction::MoveMonitor(monitor.to_string()), Some(window_id))
            .await
    }

    async fn move_window(&self, window_id: &str, target_desktop: &str, target_monitor: Option<&str>) -> Result<String> {
        let mut trace = Vec::new();
        let before = self.provider.acquire().await?;

        let target_number = target_monitor.and_then(|m| m.trim().parse::<u32>().ok());
        let should_pin = target_number.is_some_and(|n| before.monitor_all_pinned(n));
        let window_pinned = before.window_pinned(window_id);

        if let Some(monitor) = target_monitor {
            let differs = match (before.window_monitor(window_id), target_number) {
                (Some(current), Some(target)) => current != target,
                _ => true,
            };
            if differs {
                self.send_to_monitor(&mut trace, window_id, monitor).await?;
            }
        }

        self.step(&mut trace, ScriptAction::MoveDesktop(target_desktop.to_string()), Some(window_id))
            .await?;
        if should_pin && window_pinned == Some(false) {
            self.step(&mut trace, ScriptAction::PinToggle, Some(window_id)).await?;
        }
        self.step(&mut trace, ScriptAction::Activate, Some(window_id)).await?;

        // KWin may drop fullscreen when a window changes desktop or output
        let after = self.provider.acquire().await?;
        if after.window_fullscreen(window_id) {
            self.step(&mut trace, ScriptAction::Fullscreen, Some(window_id)).await?;
        }

        Ok(trace.join(TRACE_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::AppCatalog;
    use crate::commands::COMMAND_NAMES;
    use crate::relay::{RetryPolicy, journal};
    use crate::snapshot::BuildOptions;
    use crate::testing::{MockInput, MockLogSource, MockTransport, RecordingSleeper, snapshot_lines};
    use serde_json::json;

    struct Fixture {
        dispatcher: Dispatcher,
        transport: Arc<MockTransport>,
        input: Arc<MockInput>,
        sleeper: Arc<RecordingSleeper>,
    }

    fn fixture(lines: Vec<String>) -> Fixture {
        let transport = Arc::new(MockTransport::default());
        let logs = Arc::new(MockLogSource::default());
        logs.set_lines("plasma-kwin_wayland.service", lines);
        let sleeper = Arc::new(RecordingSleeper::default());
        let relay = Relay::new(transport.clone(), logs).with_retry(RetryPolicy::default(), sleeper.clone());
        let services = journal::SERVICE_CANDIDATES.iter().map(|s| s.to_string()).collect();
        let provider = StateProvider::new(Arc::new(relay), services, BuildOptions::default(), AppCatalog::empty());
        let input = Arc::new(MockInput::default());
        Fixture {
            dispatcher: Dispatcher::new(Arc::new(provider), input.clone()),
            transport,
            input,
            sleeper,
        }
    }

    /// Two side-by-side monitors; W1 on monitor 1, W2 pinned on monitor 2
    fn two_monitor_lines(w1_fullscreen: bool) -> Vec<String> {
        snapshot_lines(
            json!({
                "__type": "meta",
                "outputs": [
                    {"name": "DP-1", "geometry": {"x": 0, "y": 0, "width": 1920, "height": 1080}},
                    {"name": "DP-2", "geometry": {"x": 1920, "y": 0, "width": 1920, "height": 1080}}
                ],
                "desktops": [{"name": "1"}, {"name": "2"}],
                "activeDesktopName": "1"
            }),
            vec![
                json!({
                    "pid": 10, "windowId": "{W1}", "desktops": ["1"], "output": {"name": "DP-1"},
                    "frameGeometry": {"x": 100, "y": 100, "width": 800, "height": 600},
                    "fullScreen": w1_fullscreen
                }),
                json!({"pid": 20, "windowId": "{W2}", "onAllDesktops": true, "desktops": ["ALL"], "output": {"name": "DP-2"}}),
            ],
        )
    }

    fn request(name: &str) -> CommandRequest {
        CommandRequest {
            name: Some(name.to_string()),
            window_id: Some("{W1}".into()),
            desktop_index: Some("2".into()),
            target_monitor: Some("2".into()),
            target_desktop: Some("2".into()),
            exec: Some("konsole %u".into()),
            key: Some("Return".into()),
        }
    }

    fn actions(events: &[String]) -> Vec<&str> {
        events.iter().filter_map(|e| e.strip_prefix("action:")).collect()
    }

    #[tokio::test]
    async fn every_known_command_is_acknowledged_with_a_trace() {
        let f = fixture(two_monitor_lines(false));
        for name in COMMAND_NAMES {
            let reply = f.dispatcher.handle(&request(name)).await.unwrap();
            let reply = reply.unwrap_or_else(|| panic!("{name} was not acknowledged"));
            assert_eq!(reply.ack.name, name);
            assert!(!reply.ack.command.is_empty(), "{name} has an empty trace");
        }
    }

    #[tokio::test]
    async fn unknown_or_incomplete_commands_get_no_ack() {
        let f = fixture(vec![]);
        assert!(f.dispatcher.handle(&request("Dance")).await.unwrap().is_none());

        let mut req = request("CloseEvent");
        req.window_id = None;
        assert!(f.dispatcher.handle(&req).await.unwrap().is_none());
        assert!(f.transport.events().is_empty());
    }

    #[tokio::test]
    async fn window_events_run_their_action_tables() {
        let f = fixture(vec![]);
        let reply = f.dispatcher.handle(&request("MinimizeEvent")).await.unwrap().unwrap();

        assert_eq!(f.transport.actions(), vec!["activate", "minimize"]);
        assert_eq!(reply.ack.command, "kwin activate {W1} ; kwin minimize {W1}");
        assert_eq!(reply.ack.window_id.as_deref(), Some("{W1}"));
        assert!(reply.push_state);
    }

    #[tokio::test]
    async fn switch_desktop_ack_carries_desktop_index() {
        let f = fixture(vec![]);
        let reply = f.dispatcher.handle(&request("SwitchDesktop")).await.unwrap().unwrap();
        assert_eq!(reply.ack.desktop_index.as_deref(), Some("2"));
        assert_eq!(reply.ack.window_id, None);
        assert_eq!(reply.ack.command, "kwin switch-desktop 2");
    }

    #[tokio::test]
    async fn failed_step_aborts_the_command() {
        let f = fixture(vec![]);
        f.transport.fail_scripts();
        assert!(f.dispatcher.handle(&request("CloseEvent")).await.is_err());
    }

    #[tokio::test]
    async fn launch_acknowledges_only_started_commands() {
        let f = fixture(vec![]);
        let reply = f.dispatcher.handle(&request("LaunchApp")).await.unwrap().unwrap();
        assert_eq!(reply.ack.command, "exec konsole");
        assert_eq!(reply.ack.window_id, None);
        assert_eq!(f.input.launches(), vec!["konsole"]);

        let mut req = request("LaunchApp");
        req.exec = Some("%F".into());
        assert!(f.dispatcher.handle(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn key_event_activates_then_settles() {
        let f = fixture(vec![]);
        let reply = f.dispatcher.handle(&request("KeyEvent")).await.unwrap().unwrap();

        assert_eq!(reply.ack.command, "key Return");
        assert!(reply.push_state);
        assert_eq!(f.transport.actions(), vec!["activate"]);
        assert_eq!(f.sleeper.sleeps(), vec![KEY_SETTLE]);
        assert_eq!(f.input.keys(), vec!["Return"]);
    }

    #[tokio::test]
    async fn key_failure_is_reported_in_the_ack() {
        let f = fixture(vec![]);
        f.input.fail_keys();
        let mut req = request("KeyEvent");
        req.window_id = None;

        let reply = f.dispatcher.handle(&req).await.unwrap().unwrap();
        assert_eq!(reply.ack.command, "error: key Return failed");
        assert!(!reply.push_state);
        assert!(f.transport.actions().is_empty());
    }

    #[tokio::test]
    async fn activate_window_switches_to_its_screen() {
        let f = fixture(two_monitor_lines(false));
        f.transport.set_support_information(
            "Screen 0:\nName: DP-1\nGeometry: 0,0,1920x1080\nScreen 1:\nName: DP-2\nGeometry: 1920,0,1920x1080\n",
        );
        f.transport.allow_shortcut("Switch to Screen 1");
        f.transport.allow_shortcut("Window Raise");

        let reply = f.dispatcher.handle(&request("ActivateWindow")).await.unwrap().unwrap();

        assert_eq!(
            f.transport.events(),
            vec![
                "action:activate",
                "snapshot",
                "shortcut-failed:Switch to Screen 0",
                "shortcut:Switch to Screen 1",
                "shortcut-failed:Activate Window Demanding Attention",
                "action:clear-attention",
                "shortcut:Window Raise",
                "action:activate",
            ]
        );
        assert_eq!(
            reply.ack.command,
            "kwin activate {W1} ; kwin shortcut Switch to Screen 1 ; kwin clear-attention {W1} ; kwin shortcut Window Raise ; kwin activate {W1}"
        );
    }

    #[tokio::test]
    async fn move_window_across_monitors_onto_pinned_monitor() {
        let f = fixture(two_monitor_lines(false));
        let reply = f.dispatcher.handle(&request("MoveWindow")).await.unwrap().unwrap();

        let events = f.transport.events();
        assert_eq!(
            actions(&events),
            vec!["activate", "move-monitor", "move-desktop", "pin-toggle", "activate"]
        );
        assert!(events.contains(&"shortcut-failed:Window to Screen 1".to_string()));
        assert!(events.contains(&"shortcut-failed:Window to Screen 2".to_string()));
        assert_eq!(f.sleeper.sleeps(), vec![MOVE_SETTLE]);
        assert_eq!(
            reply.ack.command,
            "kwin activate {W1} ; kwin move-monitor {W1} 2 ; kwin move-desktop {W1} 2 ; kwin pin-toggle {W1} ; kwin activate {W1}"
        );
    }

    #[tokio::test]
    async fn move_window_prefers_screen_shortcut() {
        let f = fixture(two_monitor_lines(false));
        f.transport.allow_shortcut("Window to Screen 1");
        let reply = f.dispatcher.handle(&request("MoveWindow")).await.unwrap().unwrap();

        assert_eq!(
            actions(&f.transport.events()),
            vec!["activate", "move-desktop", "pin-toggle", "activate"]
        );
        assert!(reply.ack.command.contains("kwin shortcut Window to Screen 1"));
        assert!(!reply.ack.command.contains("move-monitor"));
    }

    #[tokio::test]
    async fn move_window_on_same_monitor_only_changes_desktop() {
        let f = fixture(two_monitor_lines(false));
        let mut req = request("MoveWindow");
        req.target_monitor = Some("1".into());
        let reply = f.dispatcher.handle(&req).await.unwrap().unwrap();

        assert_eq!(f.transport.actions(), vec!["move-desktop", "activate"]);
        assert_eq!(reply.ack.command, "kwin move-desktop {W1} 2 ; kwin activate {W1}");
        assert!(f.sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn move_to_monitor_falls_back_for_named_outputs() {
        let f = fixture(vec![]);
        let trace = f.dispatcher.move_to_monitor("{W1}", "HDMI-A-1").await.unwrap();
        assert_eq!(trace, "kwin activate {W1} ; kwin move-monitor {W1} HDMI-A-1");
        assert_eq!(f.transport.events(), vec!["action:activate", "action:move-monitor"]);
    }

    #[tokio::test]
    async fn move_window_reasserts_fullscreen() {
        let f = fixture(two_monitor_lines(true));
        let mut req = request("MoveWindow");
        req.target_monitor = None;
        let reply = f.dispatcher.handle(&req).await.unwrap().unwrap();

        assert_eq!(f.transport.actions(), vec!["move-desktop", "activate", "fullscreen"]);
        assert_eq!(
            reply.ack.command,
            "kwin move-desktop {W1} 2 ; kwin activate {W1} ; kwin fullscreen {W1}"
        );
    }
}
