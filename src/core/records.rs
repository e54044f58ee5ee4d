//! Window and meta records as printed by the KWin snapshot script
//!
//! One JSON object per window, plus one meta object describing outputs and
//! virtual desktops. Every field is optional on the wire: older KWin versions
//! expose fewer properties, and the script prints `null` for what it cannot
//! read.

use serde::{Deserialize, Deserializer};

/// Desktop-membership sentinel the script prints for windows on all desktops
pub const ALL_DESKTOPS: &str = "ALL";

/// Value of the `__type` field that marks the meta record
pub const META_MARKER: &str = "meta";

/// Geometry of a window or output, as reported by KWin
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Rect {
    #[serde(default, deserialize_with = "lenient_int")]
    pub x: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub y: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub width: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub height: Option<i64>,
}

impl Rect {
    /// Centre point; missing fields count as zero
    pub fn center(&self) -> (f64, f64) {
        let x = self.x.unwrap_or(0) as f64;
        let y = self.y.unwrap_or(0) as f64;
        let w = self.width.unwrap_or(0) as f64;
        let h = self.height.unwrap_or(0) as f64;
        (x + w / 2.0, y + h / 2.0)
    }
}

/// An output (monitor) description
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub geometry: Option<Rect>,
}

impl OutputInfo {
    /// Human-readable name: `"model [name]"` when both are known
    pub fn display_name(&self) -> Option<String> {
        match (&self.model, &self.name) {
            (Some(model), Some(name)) => Some(format!("{model} [{name}]")),
            (Some(model), None) => Some(model.clone()),
            (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DesktopEntry {
    #[serde(default)]
    pub name: Option<String>,
}

/// Outputs, desktops and the current desktop, printed once per run
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: Vec<OutputInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub desktops: Vec<DesktopEntry>,
    #[serde(default)]
    pub active_desktop_name: Option<String>,
}

/// One managed window
///
/// `window_id` and `internal_id` are independent handles; clients may refer
/// to a window by either of them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    #[serde(default, deserialize_with = "lenient_int")]
    pub pid: Option<i64>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub resource_class: Option<String>,
    #[serde(default)]
    pub desktop_file_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub window_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub internal_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub on_all_desktops: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub desktops: Vec<String>,
    #[serde(default)]
    pub frame_geometry: Option<Rect>,
    #[serde(default)]
    pub output: Option<OutputInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub minimized: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub maximized: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_screen: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,

    /// Display name from the application's desktop entry
    #[serde(skip)]
    pub app_name: Option<String>,
    /// Sanitized launch command from the application's desktop entry
    #[serde(skip)]
    pub app_exec: Option<String>,
}

impl WindowRecord {
    /// Name of the output this window sits on
    pub fn output_name(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.name.as_deref())
    }

    /// Whether the window lists `desktop` among its desktops or is pinned
    pub fn is_on_desktop(&self, desktop: &str) -> bool {
        self.on_all_desktops || self.desktops.iter().any(|d| d == desktop)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integers, floats (rounded) and numeric strings
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts strings and numbers, normalizing both to a string
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
