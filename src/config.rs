//! Runtime settings for the bridge

use std::time::Duration;

use crate::relay::RetryPolicy;
use crate::snapshot::BuildOptions;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_RESERVED_BOTTOM: u32 = 48;

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    /// Time between state polls of one WebSocket session
    pub interval: Duration,
    pub debug: bool,
    /// Journal unit to read; `None` or `auto` probes the known KWin units
    pub service: Option<String>,
    /// Only report windows of this process
    pub pid: Option<i64>,
    pub reserved_bottom: u32,
    pub retry: RetryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            debug: false,
            service: None,
            pid: None,
            reserved_bottom: DEFAULT_RESERVED_BOTTOM,
            retry: RetryPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Set the poll interval from seconds, rejecting zero, negative and non-finite values
    pub fn with_interval_secs(mut self, secs: f64) -> anyhow::Result<Self> {
        if !(secs.is_finite() && secs > 0.0) {
            anyhow::bail!("poll interval must be a positive number of seconds, got {}", secs);
        }
        self.interval = Duration::try_from_secs_f64(secs)?;
        Ok(self)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            reserved_bottom: self.reserved_bottom,
        }
    }

    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
