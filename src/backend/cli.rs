//! KWin calls through the qdbus/qdbus6 or gdbus command-line tools

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;

use super::{
    KGLOBALACCEL_INTERFACE, KGLOBALACCEL_PATH, KGLOBALACCEL_SERVICE, KWIN_INTERFACE, KWIN_PATH,
    KWIN_SERVICE, SCRIPTING_INTERFACE, SCRIPTING_PATH, ScriptTransport,
};
use crate::error::{BridgeError, Result};

/// An installed D-Bus command-line client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbusTool {
    Qdbus(PathBuf),
    Gdbus(PathBuf),
}

impl DbusTool {
    /// First available tool, qdbus flavours before gdbus
    pub fn detect() -> Option<Self> {
        for name in ["qdbus", "qdbus6"] {
            if let Ok(path) = which::which(name) {
                return Some(DbusTool::Qdbus(path));
            }
        }
        which::which("gdbus").ok().map(DbusTool::Gdbus)
    }

    pub fn path(&self) -> &Path {
        match self {
            DbusTool::Qdbus(path) | DbusTool::Gdbus(path) => path,
        }
    }

    /// Arguments for calling `interface.method` on `service` at `object`
    pub fn call_args(
        &self,
        service: &str,
        object: &str,
        interface: &str,
        method: &str,
        args: &[&str],
    ) -> Vec<String> {
        let mut out: Vec<String> = match self {
            DbusTool::Qdbus(_) => vec![
                service.to_string(),
                object.to_string(),
                format!("{interface}.{method}"),
            ],
            DbusTool::Gdbus(_) => vec![
                "call".to_string(),
                "--session".to_string(),
                "--dest".to_string(),
                service.to_string(),
                "--object-path".to_string(),
                object.to_string(),
                "--method".to_string(),
                format!("{interface}.{method}"),
            ],
        };
        out.extend(args.iter().map(|a| a.to_string()));
        out
    }
}

/// KWin transport that shells out to a D-Bus CLI tool
pub struct CliTransport {
    tool: DbusTool,
}

impl CliTransport {
    pub fn new(tool: DbusTool) -> Self {
        Self { tool }
    }

    async fn call(
        &self,
        service: &str,
        object: &str,
        interface: &str,
        method: &str,
        args: &[&str],
    ) -> Result<String> {
        let argv = self.tool.call_args(service, object, interface, method, args);
        tracing::debug!("Executing {} with args: {:?}", self.tool.path().display(), argv);

        let call = format!("{interface}.{method}");
        let output = AsyncCommand::new(self.tool.path())
            .args(&argv)
            .output()
            .await
            .map_err(|e| BridgeError::IpcCallFailed {
                call: call.clone(),
                details: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let details = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(BridgeError::IpcCallFailed {
                call,
                details: details.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ScriptTransport for CliTransport {
    async fn run_script(&self, script_path: &Path, plugin_id: &str) -> Result<()> {
        let path = script_path.to_string_lossy();
        self.call(
            KWIN_SERVICE,
            SCRIPTING_PATH,
            SCRIPTING_INTERFACE,
            "loadScript",
            &[path.as_ref(), plugin_id],
        )
        .await?;
        self.call(KWIN_SERVICE, SCRIPTING_PATH, SCRIPTING_INTERFACE, "start", &[])
            .await?;
        self.call(
            KWIN_SERVICE,
            SCRIPTING_PATH,
            SCRIPTING_INTERFACE,
            "unloadScript",
            &[plugin_id],
        )
        .await?;
        Ok(())
    }

    async fn invoke_shortcut(&self, name: &str) -> bool {
        let result = self
            .call(
                KGLOBALACCEL_SERVICE,
                KGLOBALACCEL_PATH,
                KGLOBALACCEL_INTERFACE,
                "invokeShortcut",
                &[name],
            )
            .await;
        if let Err(e) = &result {
            tracing::debug!("Shortcut '{}' failed: {}", name, e);
        }
        result.is_ok()
    }

    async fn support_information(&self) -> Option<String> {
        self.call(KWIN_SERVICE, KWIN_PATH, KWIN_INTERFACE, "supportInformation", &[])
            .await
            .ok()
    }
}
