//! Build the monitors → desktops → windows tree from flat records
//!
//! Everything here is a pure function of its inputs: the same records
//! always serialize to the same bytes.

use serde::Serialize;
use std::collections::HashSet;

use crate::core::ident::canonicalize;
use crate::core::records::{ALL_DESKTOPS, MetaRecord, OutputInfo, WindowRecord};

/// Knobs that shape the built tree without coming from KWin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Bottom margin clients keep free on every monitor (panel height)
    pub reserved_bottom: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { reserved_bottom: 48 }
    }
}

/// Display projection of a window record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowView {
    pub id: Option<String>,
    pub title: Option<String>,
    pub pid: Option<i64>,
    pub caption: Option<String>,
    pub on_all_desktops: bool,
    pub minimized: bool,
    pub maximized: bool,
    #[serde(rename = "fullScreen")]
    pub full_screen: bool,
    #[serde(rename = "appExec")]
    pub app_exec: Option<String>,
    pub active: bool,
}

impl From<&WindowRecord> for WindowView {
    fn from(w: &WindowRecord) -> Self {
        Self {
            id: w.window_id.clone(),
            title: w.app_name.clone(),
            pid: w.pid,
            caption: w.caption.clone(),
            on_all_desktops: w.on_all_desktops,
            minimized: w.minimized,
            maximized: w.maximized,
            full_screen: w.full_screen,
            app_exec: w.app_exec.clone(),
            active: w.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Desktop {
    pub desktop_name: String,
    pub desktop_is_active: bool,
    pub windows: Vec<WindowView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Monitor {
    pub monitor_id: u32,
    pub monitor_name: Option<String>,
    pub monitor_x: Option<i64>,
    pub monitor_y: Option<i64>,
    pub monitor_width: Option<i64>,
    pub monitor_height: Option<i64>,
    pub reserved_bottom: u32,
    /// Every window on this monitor is pinned (and there is at least one)
    pub on_all_desktops: bool,
    pub desktops: Vec<Desktop>,
}

/// Outputs from the meta record, or derived from the windows' outputs
pub fn resolve_outputs(meta: Option<&MetaRecord>, windows: &[WindowRecord]) -> Vec<OutputInfo> {
    if let Some(meta) = meta.filter(|m| !m.outputs.is_empty()) {
        return meta.outputs.clone();
    }

    let mut seen = HashSet::new();
    let mut outputs = Vec::new();
    for w in windows {
        let Some(output) = &w.output else { continue };
        let Some(name) = output.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        if seen.insert(name.to_string()) {
            outputs.push(output.clone());
        }
    }
    outputs
}

/// Desktop names from the meta record, or the windows' memberships
pub fn resolve_desktop_names(meta: Option<&MetaRecord>, windows: &[WindowRecord]) -> Vec<String> {
    let from_meta: Vec<String> = meta
        .map(|m| m.desktops.iter().filter_map(|d| d.name.clone()).collect())
        .unwrap_or_default();
    if !from_meta.is_empty() {
        return from_meta;
    }

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for w in windows {
        for name in &w.desktops {
            if name == ALL_DESKTOPS {
                continue;
            }
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Stable sort by (y, x); missing coordinates count as 0
pub fn sort_outputs(mut outputs: Vec<OutputInfo>) -> Vec<OutputInfo> {
    outputs.sort_by_key(|o| {
        let g = o.geometry.unwrap_or_default();
        (g.y.unwrap_or(0), g.x.unwrap_or(0))
    });
    outputs
}

/// Windows of one desktop: pinned or member, unique by handle, ordered
pub fn build_desktop(name: &str, monitor_windows: &[&WindowRecord], active_name: Option<&str>) -> Desktop {
    let mut seen = HashSet::new();
    let mut windows: Vec<&WindowRecord> = Vec::new();
    for &w in monitor_windows {
        if !w.is_on_desktop(name) {
            continue;
        }
        let key = canonicalize(w.window_id.as_deref());
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        windows.push(w);
    }

    windows.sort_by(|a, b| {
        let key = |w: &WindowRecord| (w.pid.is_none(), w.pid.unwrap_or(0));
        key(*a)
            .cmp(&key(*b))
            .then_with(|| a.window_id.cmp(&b.window_id))
    });

    Desktop {
        desktop_name: name.to_string(),
        desktop_is_active: active_name == Some(name),
        windows: windows.into_iter().map(WindowView::from).collect(),
    }
}

/// One monitor with a desktop entry per name in `desktop_names`
pub fn build_monitor(
    monitor_id: u32,
    output: &OutputInfo,
    windows: &[WindowRecord],
    desktop_names: &[String],
    active_name: Option<&str>,
    options: &BuildOptions,
) -> Monitor {
    let hosted: Vec<&WindowRecord> = windows
        .iter()
        .filter(|w| w.output_name() == output.name.as_deref())
        .collect();
    let all_pinned = !hosted.is_empty() && hosted.iter().all(|w| w.on_all_desktops);
    let geometry = output.geometry.unwrap_or_default();

    Monitor {
        monitor_id,
        monitor_name: output.display_name(),
        monitor_x: geometry.x,
        monitor_y: geometry.y,
        monitor_width: geometry.width,
        monitor_height: geometry.height,
        reserved_bottom: options.reserved_bottom,
        on_all_desktops: all_pinned,
        desktops: desktop_names
            .iter()
            .map(|name| build_desktop(name, &hosted, active_name))
            .collect(),
    }
}

/// All monitors, ids assigned 1..N in (y, x) order
pub fn build_monitors(meta: Option<&MetaRecord>, windows: &[WindowRecord], options: &BuildOptions) -> Vec<Monitor> {
    let outputs = sort_outputs(resolve_outputs(meta, windows));
    let desktop_names = resolve_desktop_names(meta, windows);
    let active_name = meta.and_then(|m| m.active_desktop_name.as_deref());

    outputs
        .iter()
        .zip(1u32..)
        .map(|(output, id)| build_monitor(id, output, windows, &desktop_names, active_name, options))
        .collect()
}
