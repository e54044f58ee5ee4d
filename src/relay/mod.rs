//! Injection/log relay
//!
//! KWin has no request/response API for window state. Instead the relay
//! writes a script to a temp file, has KWin load, start and unload it, and
//! then harvests whatever the script printed from the journal.

pub mod journal;
pub mod retry;
pub mod scripts;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::backend::ScriptTransport;
use crate::error::{BridgeError, Result};

pub use journal::{JournalSource, LogSource};
pub use retry::{Attempted, RetryPolicy, Sleeper, TokioSleeper};
pub use scripts::ScriptAction;

static CALL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique KWin plugin id for one script run
///
/// The per-call counter keeps concurrent runs of the same purpose from
/// colliding on the id.
pub fn correlation_id(purpose: &str) -> String {
    let n = CALL_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("kwin_bridge_{}_{}_{}", purpose, std::process::id(), n)
}

/// Drives KWin scripts and collects their output
pub struct Relay {
    transport: Arc<dyn ScriptTransport>,
    logs: Arc<dyn LogSource>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Relay {
    pub fn new(transport: Arc<dyn ScriptTransport>, logs: Arc<dyn LogSource>) -> Self {
        Self {
            transport,
            logs,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the retry policy and the sleeper used for all delays
    pub fn with_retry(mut self, retry: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        self.retry = retry;
        self.sleeper = sleeper;
        self
    }

    pub fn transport(&self) -> &dyn ScriptTransport {
        self.transport.as_ref()
    }

    /// Wait through the relay's sleeper
    pub async fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration).await;
    }

    /// Load, start and unload `program` in KWin
    pub async fn execute(&self, program: &str, purpose: &str) -> Result<()> {
        // Removed when `file` drops
        let file = tempfile::Builder::new()
            .prefix("kwin_bridge_")
            .suffix(".js")
            .tempfile()?;
        tokio::fs::write(file.path(), program).await?;

        let plugin_id = correlation_id(purpose);
        tracing::debug!("Running KWin script {} from {}", plugin_id, file.path().display());
        self.transport.run_script(file.path(), &plugin_id).await
    }

    /// Run one scripted mutation
    pub async fn run_action(&self, action: &ScriptAction, window_id: Option<&str>) -> Result<()> {
        let program = scripts::action_program(action, window_id, None)?;
        self.execute(&program, "action").await
    }

    /// Harvest script output from the first candidate service that has any
    ///
    /// Each candidate is retried under the relay's policy. If no candidate
    /// produced lines, the last read error is returned when there was one,
    /// otherwise `(first candidate, [])`.
    pub async fn collect_lines(&self, services: &[String], since: &str) -> Result<(String, Vec<String>)> {
        let mut last_error: Option<BridgeError> = None;

        for service in services {
            let outcome: Attempted<Vec<String>, BridgeError> = self
                .retry
                .run(self.sleeper.as_ref(), |attempt| async move {
                    let lines = self.logs.read_since(service, since).await?;
                    if lines.is_empty() {
                        tracing::debug!("No lines from {} (attempt {})", service, attempt + 1);
                        Ok::<_, BridgeError>(None)
                    } else {
                        Ok(Some(lines))
                    }
                })
                .await;

            match outcome {
                Attempted::Done(lines) => return Ok((service.clone(), lines)),
                Attempted::Exhausted { last_error: Some(e) } => {
                    tracing::debug!("Reading {} failed: {}", service, e);
                    last_error = Some(e);
                }
                Attempted::Exhausted { last_error: None } => {}
            }
        }

        if let Some(e) = last_error {
            return Err(e);
        }
        let first = services.first().cloned().unwrap_or_default();
        Ok((first, Vec::new()))
    }
}
