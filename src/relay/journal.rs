//! KWin's script output, read back from the user journal
//!
//! `print()` in a KWin script ends up in the compositor unit's journal,
//! usually prefixed with `js: `.

use async_trait::async_trait;
use tokio::process::Command as AsyncCommand;

use crate::error::{BridgeError, Result};

/// Prefix KWin puts in front of script output
const JS_PREFIX: &str = "js: ";

/// Compositor units, most likely first
pub const SERVICE_CANDIDATES: [&str; 4] = [
    "plasma-kwin_wayland.service",
    "plasma-kwin_x11.service",
    "kwin_wayland.service",
    "kwin_x11.service",
];

/// Per-service append-only log
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Lines emitted by `service` at or after `since`, decoration stripped
    async fn read_since(&self, service: &str, since: &str) -> Result<Vec<String>>;
}

/// `journalctl --user` reader
pub struct JournalSource;

#[async_trait]
impl LogSource for JournalSource {
    async fn read_since(&self, service: &str, since: &str) -> Result<Vec<String>> {
        let output = AsyncCommand::new("journalctl")
            .args(["--user", "-u", service, "--since", since, "-o", "cat", "--no-pager"])
            .output()
            .await
            .map_err(|e| BridgeError::LogReadFailed {
                service: service.to_string(),
                details: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let details = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(BridgeError::LogReadFailed {
                service: service.to_string(),
                details: details.trim().to_string(),
            });
        }

        Ok(strip_decoration(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Split journal output into lines, dropping the `js: ` prefix where present
pub fn strip_decoration(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.strip_prefix(JS_PREFIX).unwrap_or(line).to_string())
        .collect()
}

/// Journal `--since` value for the current moment
pub fn since_now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Candidate units to read, in priority order
///
/// An explicit service (anything but `auto`) is used alone. Otherwise the
/// unit `systemctl --user is-active` reports as running goes first.
pub async fn resolve_services(preferred: Option<&str>) -> Vec<String> {
    if let Some(service) = preferred.filter(|s| !s.is_empty() && *s != "auto") {
        return vec![service.to_string()];
    }
    let active = detect_active_service().await;
    order_candidates(active.as_deref())
}

/// Move `active` to the front of the default candidate list
pub fn order_candidates(active: Option<&str>) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::with_capacity(SERVICE_CANDIDATES.len());
    if let Some(active) = active.filter(|a| SERVICE_CANDIDATES.contains(a)) {
        ordered.push(active.to_string());
    }
    for candidate in SERVICE_CANDIDATES {
        if !ordered.iter().any(|s| s == candidate) {
            ordered.push(candidate.to_string());
        }
    }
    ordered
}

async fn detect_active_service() -> Option<String> {
    let systemctl = which::which("systemctl").ok()?;
    for service in SERVICE_CANDIDATES {
        let output = AsyncCommand::new(&systemctl)
            .args(["--user", "is-active", service])
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "active" => {
                tracing::debug!("Detected active KWin unit {}", service);
                return Some(service.to_string());
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("systemctl probe for {} failed: {}", service, e),
        }
    }
    None
}
