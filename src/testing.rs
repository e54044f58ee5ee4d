//! Test doubles for the KWin transport, the journal, input and the clock

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::apps::sanitize_exec_command;
use crate::backend::ScriptTransport;
use crate::error::{BridgeError, Result};
use crate::input::InputDriver;
use crate::relay::{LogSource, Sleeper};

/// One recorded script run
#[derive(Debug, Clone)]
pub struct ScriptRun {
    pub path: PathBuf,
    pub plugin_id: String,
    pub program: String,
}

impl ScriptRun {
    /// The `PARAMS` object the script was started with
    pub fn params(&self) -> serde_json::Value {
        self.program
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("const PARAMS = "))
            .and_then(|l| l.strip_suffix(';'))
            .and_then(|l| serde_json::from_str(l).ok())
            .unwrap_or(serde_json::Value::Null)
    }

    /// Action name for action scripts, `None` for snapshot scripts
    pub fn action(&self) -> Option<String> {
        self.params()
            .get("action")
            .and_then(|a| a.as_str())
            .map(String::from)
    }
}

/// Records script runs and shortcut invocations
#[derive(Default)]
pub struct MockTransport {
    runs: Mutex<Vec<ScriptRun>>,
    events: Mutex<Vec<String>>,
    working_shortcuts: Mutex<HashSet<String>>,
    support_info: Mutex<Option<String>>,
    fail_scripts: Mutex<bool>,
}

impl MockTransport {
    /// Make `name` succeed when invoked; all other shortcuts fail
    pub fn allow_shortcut(&self, name: &str) {
        self.working_shortcuts.lock().unwrap().insert(name.to_string());
    }

    pub fn set_support_information(&self, text: &str) {
        *self.support_info.lock().unwrap() = Some(text.to_string());
    }

    pub fn fail_scripts(&self) {
        *self.fail_scripts.lock().unwrap() = true;
    }

    pub fn runs(&self) -> Vec<ScriptRun> {
        self.runs.lock().unwrap().clone()
    }

    /// `action:<name>`, `snapshot` and `shortcut:<name>` entries in call order
    ///
    /// Failed shortcut invocations are recorded as `shortcut-failed:<name>`.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Only the scripted action names, in order
    pub fn actions(&self) -> Vec<String> {
        self.runs().iter().filter_map(ScriptRun::action).collect()
    }
}

#[async_trait]
impl ScriptTransport for MockTransport {
    async fn run_script(&self, script_path: &Path, plugin_id: &str) -> Result<()> {
        if *self.fail_scripts.lock().unwrap() {
            return Err(BridgeError::IpcCallFailed {
                call: "org.kde.kwin.Scripting.start".to_string(),
                details: "mock failure".to_string(),
            });
        }
        let program = std::fs::read_to_string(script_path)?;
        let run = ScriptRun {
            path: script_path.to_path_buf(),
            plugin_id: plugin_id.to_string(),
            program,
        };
        let event = match run.action() {
            Some(action) => format!("action:{action}"),
            None => "snapshot".to_string(),
        };
        self.events.lock().unwrap().push(event);
        self.runs.lock().unwrap().push(run);
        Ok(())
    }

    async fn invoke_shortcut(&self, name: &str) -> bool {
        let ok = self.working_shortcuts.lock().unwrap().contains(name);
        let event = if ok {
            format!("shortcut:{name}")
        } else {
            format!("shortcut-failed:{name}")
        };
        self.events.lock().unwrap().push(event);
        ok
    }

    async fn support_information(&self) -> Option<String> {
        self.support_info.lock().unwrap().clone()
    }
}

/// Journal stand-in with per-service queued answers
#[derive(Default)]
pub struct MockLogSource {
    queued: Mutex<HashMap<String, VecDeque<Vec<String>>>>,
    fallback: Mutex<HashMap<String, Vec<String>>>,
    failures: Mutex<HashMap<String, String>>,
    reads: Mutex<Vec<String>>,
}

impl MockLogSource {
    /// Answer the next read of `service` with `lines`
    pub fn push_lines(&self, service: &str, lines: Vec<String>) {
        self.queued
            .lock()
            .unwrap()
            .entry(service.to_string())
            .or_default()
            .push_back(lines);
    }

    /// Answer every read of `service` without a queued answer with `lines`
    pub fn set_lines(&self, service: &str, lines: Vec<String>) {
        self.fallback.lock().unwrap().insert(service.to_string(), lines);
    }

    /// Make every read of `service` fail
    pub fn fail(&self, service: &str, details: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(service.to_string(), details.to_string());
    }

    /// Services read so far, one entry per read
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn read_since(&self, service: &str, _since: &str) -> Result<Vec<String>> {
        self.reads.lock().unwrap().push(service.to_string());
        if let Some(details) = self.failures.lock().unwrap().get(service) {
            return Err(BridgeError::LogReadFailed {
                service: service.to_string(),
                details: details.clone(),
            });
        }
        if let Some(lines) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(service)
            .and_then(VecDeque::pop_front)
        {
            return Ok(lines);
        }
        Ok(self
            .fallback
            .lock()
            .unwrap()
            .get(service)
            .cloned()
            .unwrap_or_default())
    }
}

/// Sleeper that returns immediately and remembers what it was asked
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Records keys and launches instead of touching the desktop
#[derive(Default)]
pub struct MockInput {
    keys: Mutex<Vec<String>>,
    launches: Mutex<Vec<String>>,
    fail_keys: Mutex<bool>,
}

impl MockInput {
    pub fn fail_keys(&self) {
        *self.fail_keys.lock().unwrap() = true;
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl InputDriver for MockInput {
    async fn send_key(&self, key: &str) -> anyhow::Result<()> {
        if *self.fail_keys.lock().unwrap() {
            anyhow::bail!("no key tool");
        }
        self.keys.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn launch(&self, exec: &str) -> anyhow::Result<String> {
        let Some(command) = sanitize_exec_command(Some(exec)) else {
            anyhow::bail!("nothing to launch in '{}'", exec);
        };
        self.launches.lock().unwrap().push(command.clone());
        Ok(command)
    }
}

/// Journal lines for a snapshot: one meta line followed by the windows
pub fn snapshot_lines(meta: serde_json::Value, windows: Vec<serde_json::Value>) -> Vec<String> {
    std::iter::once(meta)
        .chain(windows)
        .map(|v| v.to_string())
        .collect()
}
