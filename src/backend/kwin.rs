//! Native D-Bus binding for KWin scripting
//!
//! Talks to KWin over the session bus with zbus. KWin requires scripts to be
//! loaded from a file path, so the caller writes the program first and hands
//! us the path.

use async_trait::async_trait;
use std::path::Path;
use zbus::Connection;

use super::{
    KGLOBALACCEL_INTERFACE, KGLOBALACCEL_PATH, KGLOBALACCEL_SERVICE, KWIN_INTERFACE, KWIN_PATH,
    KWIN_SERVICE, SCRIPTING_INTERFACE, SCRIPTING_PATH, ScriptTransport,
};
use crate::error::{BridgeError, Result};

/// KWin transport over a zbus session connection
pub struct ZbusTransport {
    dbus: Connection,
}

impl ZbusTransport {
    /// Connect to the session bus
    pub async fn new() -> zbus::Result<Self> {
        let dbus = Connection::session().await?;
        Ok(Self { dbus })
    }

    async fn scripting_call<B>(&self, method: &str, body: &B) -> Result<zbus::Message>
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        self.dbus
            .call_method(
                Some(KWIN_SERVICE),
                SCRIPTING_PATH,
                Some(SCRIPTING_INTERFACE),
                method,
                body,
            )
            .await
            .map_err(|e| ipc_error(method, e))
    }
}

fn ipc_error(method: &str, e: impl std::fmt::Display) -> BridgeError {
    BridgeError::IpcCallFailed {
        call: format!("{SCRIPTING_INTERFACE}.{method}"),
        details: e.to_string(),
    }
}

#[async_trait]
impl ScriptTransport for ZbusTransport {
    async fn run_script(&self, script_path: &Path, plugin_id: &str) -> Result<()> {
        let path = script_path.to_string_lossy();

        let reply = self.scripting_call("loadScript", &(path.as_ref(), plugin_id)).await?;
        let script_id: i32 = reply
            .body()
            .deserialize()
            .map_err(|e| ipc_error("loadScript", e))?;
        tracing::debug!("Loaded KWin script {} as id {}", plugin_id, script_id);

        self.scripting_call("start", &()).await?;
        self.scripting_call("unloadScript", &(plugin_id,)).await?;

        Ok(())
    }

    async fn invoke_shortcut(&self, name: &str) -> bool {
        let result = self
            .dbus
            .call_method(
                Some(KGLOBALACCEL_SERVICE),
                KGLOBALACCEL_PATH,
                Some(KGLOBALACCEL_INTERFACE),
                "invokeShortcut",
                &(name,),
            )
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Shortcut '{}' failed: {}", name, e);
                false
            }
        }
    }

    async fn support_information(&self) -> Option<String> {
        let reply = self
            .dbus
            .call_method(
                Some(KWIN_SERVICE),
                KWIN_PATH,
                Some(KWIN_INTERFACE),
                "supportInformation",
                &(),
            )
            .await
            .ok()?;
        reply.body().deserialize::<String>().ok()
    }
}
