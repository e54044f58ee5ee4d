//! KWin IPC transport abstraction
//!
//! The bridge only needs three things from the compositor: run a script,
//! invoke a global shortcut, and read the support-information dump. Both
//! bindings (native zbus and the qdbus/gdbus command-line tools) implement
//! [`ScriptTransport`], so callers never see which one is in use.

mod cli;
mod kwin;
pub mod screens;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::error::{BridgeError, Result};

pub use cli::{CliTransport, DbusTool};
pub use kwin::ZbusTransport;

pub(crate) const KWIN_SERVICE: &str = "org.kde.KWin";
pub(crate) const SCRIPTING_PATH: &str = "/Scripting";
pub(crate) const SCRIPTING_INTERFACE: &str = "org.kde.kwin.Scripting";
pub(crate) const KWIN_PATH: &str = "/KWin";
pub(crate) const KWIN_INTERFACE: &str = "org.kde.KWin";
pub(crate) const KGLOBALACCEL_SERVICE: &str = "org.kde.kglobalaccel";
pub(crate) const KGLOBALACCEL_PATH: &str = "/component/kwin";
pub(crate) const KGLOBALACCEL_INTERFACE: &str = "org.kde.kglobalaccel.Component";

/// Trait for KWin transport bindings
#[async_trait]
pub trait ScriptTransport: Send + Sync {
    /// Load the script at `script_path` under `plugin_id`, start it, unload it
    ///
    /// A failed load or start is returned before unloading is attempted.
    async fn run_script(&self, script_path: &Path, plugin_id: &str) -> Result<()>;

    /// Invoke a KWin global shortcut by name; `false` if the call failed
    async fn invoke_shortcut(&self, name: &str) -> bool;

    /// KWin's `supportInformation` text, if it could be read
    async fn support_information(&self) -> Option<String>;
}

/// Pick a transport for the current session
///
/// The command-line tools are preferred when installed; otherwise a native
/// session-bus connection is used.
pub async fn create_transport() -> Result<Arc<dyn ScriptTransport>> {
    if let Some(tool) = DbusTool::detect() {
        tracing::info!("Using {} for KWin calls", tool.path().display());
        return Ok(Arc::new(CliTransport::new(tool)));
    }

    match ZbusTransport::new().await {
        Ok(transport) => {
            tracing::info!("Using native D-Bus session connection for KWin calls");
            Ok(Arc::new(transport))
        }
        Err(e) => {
            tracing::debug!("D-Bus session connection failed: {}", e);
            Err(BridgeError::ToolUnavailable)
        }
    }
}
