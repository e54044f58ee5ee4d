//! Key synthesis and app launching
//!
//! Keys go through wtype on Wayland or xdotool on X11, whichever is
//! installed first. Apps are started detached from their split `Exec`
//! argv, never through a shell.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;

use crate::apps::sanitize_exec_command;

/// Keyboard and process side effects the dispatcher needs
#[async_trait]
pub trait InputDriver: Send + Sync {
    /// Press `key` in the focused window
    async fn send_key(&self, key: &str) -> anyhow::Result<()>;

    /// Start an app detached; returns the command line that was started
    fn launch(&self, exec: &str) -> anyhow::Result<String>;
}

/// Drives the real wtype/xdotool and spawns apps
pub struct SystemInput;

#[async_trait]
impl InputDriver for SystemInput {
    async fn send_key(&self, key: &str) -> anyhow::Result<()> {
        send_keypress(key).await
    }

    fn launch(&self, exec: &str) -> anyhow::Result<String> {
        launch_exec_command(exec)
    }
}

/// Installed key-synthesis tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTool {
    Wtype(PathBuf),
    Xdotool(PathBuf),
}

impl KeyTool {
    pub fn detect() -> Option<Self> {
        if let Ok(path) = which::which("wtype") {
            return Some(KeyTool::Wtype(path));
        }
        which::which("xdotool").ok().map(KeyTool::Xdotool)
    }

    fn path(&self) -> &Path {
        match self {
            KeyTool::Wtype(path) | KeyTool::Xdotool(path) => path,
        }
    }

    /// Arguments for pressing `key`, e.g. `"ctrl+shift+t"`, `"Return"` or `"a"`
    pub fn key_args(&self, key: &str) -> Option<Vec<String>> {
        match self {
            KeyTool::Wtype(_) => {
                if key.contains('+') {
                    let parts: Vec<&str> = key.split('+').filter(|p| !p.is_empty()).collect();
                    let (base, modifiers) = parts.split_last()?;
                    let mut args = Vec::new();
                    for modifier in modifiers {
                        args.extend(["-M".to_string(), modifier.to_string()]);
                    }
                    args.extend(["-k".to_string(), base.to_string()]);
                    for modifier in modifiers.iter().rev() {
                        args.extend(["-m".to_string(), modifier.to_string()]);
                    }
                    Some(args)
                } else if key.chars().count() == 1 {
                    Some(vec![key.to_string()])
                } else {
                    Some(vec!["-k".to_string(), key.to_string()])
                }
            }
            KeyTool::Xdotool(_) => Some(vec![
                "key".to_string(),
                "--clearmodifiers".to_string(),
                key.to_string(),
            ]),
        }
    }
}

/// Press a key (or `+`-joined combination) in the focused window
pub async fn send_keypress(key: &str) -> anyhow::Result<()> {
    if key.is_empty() {
        anyhow::bail!("empty key");
    }
    let Some(tool) = KeyTool::detect() else {
        anyhow::bail!("neither wtype nor xdotool is installed");
    };
    let Some(args) = tool.key_args(key) else {
        anyhow::bail!("cannot parse key combination '{}'", key);
    };

    tracing::debug!("Executing {} with args: {:?}", tool.path().display(), args);

    let output = AsyncCommand::new(tool.path()).args(&args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{} failed: {}", tool.path().display(), stderr.trim());
    }

    Ok(())
}

/// Start an application from a desktop-entry `Exec` value without waiting
///
/// Returns the command line actually started.
pub fn launch_exec_command(exec: &str) -> anyhow::Result<String> {
    let Some(command) = sanitize_exec_command(Some(exec)) else {
        anyhow::bail!("nothing to launch in '{}'", exec);
    };
    let argv = exec_argv(&command)?;

    AsyncCommand::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    tracing::info!("Launched '{}'", command);
    Ok(command)
}

/// Split a sanitized command line into argv with shell quoting rules
///
/// Shell operators stay plain arguments. The result is never empty.
pub fn exec_argv(command: &str) -> anyhow::Result<Vec<String>> {
    match shlex::split(command) {
        Some(argv) if !argv.is_empty() => Ok(argv),
        Some(_) => anyhow::bail!("nothing to launch in '{}'", command),
        None => anyhow::bail!("unbalanced quoting in '{}'", command),
    }
}
