//! Window-state snapshots
//!
//! A [`StateProvider`] runs the snapshot script through the relay, parses the
//! harvested lines and builds an immutable [`Snapshot`]. Nothing is cached
//! between acquisitions.

pub mod builder;
pub mod parser;

use serde::Serialize;
use std::sync::Arc;

use crate::apps::AppCatalog;
use crate::core::ident::canonicalize;
use crate::core::{MetaRecord, WindowRecord};
use crate::error::Result;
use crate::relay::{Relay, journal, scripts};

pub use builder::{BuildOptions, Desktop, Monitor, WindowView};

/// Monitors → desktops → windows, as served to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Journal unit the data was read from
    pub service: String,
    /// Acquisition time, unix seconds rounded to two decimals
    pub timestamp: f64,
    pub monitors: Vec<Monitor>,
}

#[derive(Serialize)]
struct ChangeKey<'a> {
    service: &'a str,
    monitors: &'a [Monitor],
}

impl Snapshot {
    /// Build from parsed records; pure apart from the given timestamp
    pub fn build(
        service: impl Into<String>,
        timestamp: f64,
        meta: Option<&MetaRecord>,
        windows: &[WindowRecord],
        options: &BuildOptions,
    ) -> Self {
        Self {
            service: service.into(),
            timestamp,
            monitors: builder::build_monitors(meta, windows, options),
        }
    }

    /// Serialization of everything but the timestamp
    ///
    /// Two snapshots of unchanged state have equal keys.
    pub fn change_key(&self) -> serde_json::Result<String> {
        serde_json::to_string(&ChangeKey {
            service: &self.service,
            monitors: &self.monitors,
        })
    }

    fn locate(&self, window_id: &str) -> Option<(&Monitor, &WindowView)> {
        let target = canonicalize(Some(window_id));
        if target.is_empty() {
            return None;
        }
        self.monitors.iter().find_map(|m| {
            m.desktops
                .iter()
                .flat_map(|d| d.windows.iter())
                .find(|w| canonicalize(w.id.as_deref()) == target)
                .map(|w| (m, w))
        })
    }

    pub fn find_window(&self, window_id: &str) -> Option<&WindowView> {
        self.locate(window_id).map(|(_, w)| w)
    }

    /// Id of the monitor showing the window
    pub fn window_monitor(&self, window_id: &str) -> Option<u32> {
        self.locate(window_id).map(|(m, _)| m.monitor_id)
    }

    pub fn window_pinned(&self, window_id: &str) -> Option<bool> {
        self.find_window(window_id).map(|w| w.on_all_desktops)
    }

    pub fn window_fullscreen(&self, window_id: &str) -> bool {
        self.find_window(window_id).is_some_and(|w| w.full_screen)
    }

    /// Whether every window on the monitor is pinned (false if it has none)
    pub fn monitor_all_pinned(&self, monitor_id: u32) -> bool {
        let Some(monitor) = self.monitors.iter().find(|m| m.monitor_id == monitor_id) else {
            return false;
        };
        let mut windows = monitor.desktops.iter().flat_map(|d| d.windows.iter()).peekable();
        windows.peek().is_some() && windows.all(|w| w.on_all_desktops)
    }
}

/// Raw output of one snapshot-script run
#[derive(Debug, Clone)]
pub struct Harvest {
    pub service: String,
    pub meta: Option<MetaRecord>,
    pub windows: Vec<WindowRecord>,
}

/// Acquires snapshots through the relay
pub struct StateProvider {
    relay: Arc<Relay>,
    services: Vec<String>,
    pid: Option<i64>,
    options: BuildOptions,
    apps: AppCatalog,
}

impl StateProvider {
    pub fn new(relay: Arc<Relay>, services: Vec<String>, options: BuildOptions, apps: AppCatalog) -> Self {
        Self {
            relay,
            services,
            pid: None,
            options,
            apps,
        }
    }

    /// Only report windows of this process
    pub fn with_pid(mut self, pid: Option<i64>) -> Self {
        self.pid = pid;
        self
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Run the snapshot script and parse what it printed
    pub async fn harvest(&self) -> Result<Harvest> {
        let since = journal::since_now();
        let program = scripts::snapshot_program(self.pid)?;
        self.relay.execute(&program, "sample").await?;

        let (service, lines) = self.relay.collect_lines(&self.services, &since).await?;
        let (meta, windows) = parser::parse_lines(&lines);
        let windows = self.apps.enrich_async(windows).await?;
        tracing::debug!(
            "Harvested {} lines ({} windows) from {}",
            lines.len(),
            windows.len(),
            service
        );

        Ok(Harvest { service, meta, windows })
    }

    /// Fresh snapshot of the current state
    pub async fn acquire(&self) -> Result<Snapshot> {
        let harvest = self.harvest().await?;
        Ok(Snapshot::build(
            harvest.service,
            now_timestamp(),
            harvest.meta.as_ref(),
            &harvest.windows,
            &self.options,
        ))
    }
}

fn now_timestamp() -> f64 {
    let millis = chrono::Utc::now().timestamp_millis();
    (millis as f64 / 10.0).round() / 100.0
}
